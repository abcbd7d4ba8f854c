use chrono::{Duration, Utc};
use std::sync::Mutex;

use super::time::Timestamp;

/// Source of "now" for window and completion decisions.
pub trait Clock: Send + Sync {
	fn now(&self) -> Timestamp;
}

/// Wall clock shifted into the market's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
	utc_offset_minutes: i32,
}

impl SystemClock {
	pub fn new(utc_offset_minutes: i32) -> Self {
		Self { utc_offset_minutes }
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Timestamp {
		Utc::now().naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes))
	}
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
	now: Mutex<Timestamp>,
}

impl FixedClock {
	pub fn new(now: Timestamp) -> Self {
		Self {
			now: Mutex::new(now),
		}
	}

	pub fn set(&self, now: Timestamp) {
		*self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
	}

	pub fn advance(&self, by: Duration) {
		let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
		*guard += by;
	}
}

impl Clock for FixedClock {
	fn now(&self) -> Timestamp {
		*self.now.lock().unwrap_or_else(|e| e.into_inner())
	}
}
