//! Incremental time-series synchronization engine.
//!
//! Keeps the persisted records of a population of tracked entities in step
//! with an external data source, writing only new or changed records and
//! resuming from what is already stored.

pub mod calendar;
pub mod model;
pub mod source;
pub mod store;
pub mod sync;
pub mod utils;
