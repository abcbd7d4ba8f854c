//!
//! Utility module for the sync engine.
//!
//! Re-exports timestamp helpers and the clock abstraction used throughout the codebase.
/// Injectable source of the current time
pub mod clock;
/// Timestamp parsing and formatting helpers
pub mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use time::{Timestamp, parse_timestamp_str, parse_timestamp_value, to_time_str};
