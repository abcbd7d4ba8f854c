//! Data source integration module
//!
//! This module provides the source seam the sync engine fetches records through,
//! an HTTP reference implementation, and the registry that binds sources to
//! `(schema, provider)` pairs.

/// Source trait and HTTP JSON client
mod client;
/// Explicit source registry
mod registry;
/// Type definitions for source data structures
mod types;

pub use client::{HttpSourceClient, SourceClient};
pub use registry::{SourceFactory, SourceRegistry};
pub use types::*;
