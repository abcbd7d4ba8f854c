//! Incremental Synchronization Module
//!
//! This module provides the engine that keeps persisted time-series records of
//! many entities up to date with an external source. It is composed of several
//! submodules, each responsible for a specific aspect of the sync process:
//!
//! - `orchestrator`: The entry point. Loads the entity population and runs it over a worker pool.
//! - `entity_loop`: Drives one entity through repeated fetch cycles until it finishes or fails.
//! - `window`: The closed set of policies computing what to fetch next.
//! - `reconciler`: Derives record ids, removes duplicates and persists batches.
//! - `completion`: Decides when an entity is done for the run.
//! - `progress_tracker`: Shared progress counters and the final run summary.
//! - `events`: Event types and handlers used to refresh progress displays.
//!
//! Per-entity errors stay inside the entity loop; only configuration, catalog,
//! calendar and worker failures abort a run.

/// Decides when an entity is finished
pub mod completion;
/// Run configuration
pub mod config;
/// Per-entity fetch loop
pub mod entity_loop;
/// Event system for progress display refresh
pub mod events;
/// Typed payload field mapping
pub mod field_map;
/// Main coordinator for a sync run
pub mod orchestrator;
/// Shared progress and run summary
pub mod progress_tracker;
/// Record identity, dedup and persistence
pub mod reconciler;
/// Per-entity in-memory state
pub mod state;
mod types;
/// Fetch-window policies
pub mod window;

pub use config::{DuplicateResolution, PolicyKind, SyncConfig};
pub use orchestrator::*;
pub use progress_tracker::{ProgressShare, RunSummary};
pub use types::*;
