//! Trading calendar and interval arithmetic for fixed-cycle synchronization.

mod level;
mod trading;

pub use level::IntervalLevel;
pub use trading::{TradingCalendar, evaluate_size_from_timestamp};
