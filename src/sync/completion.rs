use chrono::{Duration, NaiveTime};

use crate::sync::config::SyncConfig;
use crate::utils::Timestamp;

/// Decides whether an entity is done for this run.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
	real_time: bool,
	close: Option<NaiveTime>,
	grace: Duration,
}

impl CompletionDetector {
	pub fn new(real_time: bool, close: Option<(u32, u32)>, grace_minutes: i64) -> Self {
		Self {
			real_time,
			close: close.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
			grace: Duration::minutes(grace_minutes),
		}
	}

	pub fn from_config(config: &SyncConfig) -> Self {
		Self::new(config.real_time, config.close_time(), config.close_grace_minutes)
	}

	/// Nothing new came back, and either the run is not real-time or the
	/// session closed (plus grace) today.
	pub fn is_finished(&self, fetched_empty: bool, all_duplicate: bool, now: &Timestamp) -> bool {
		if !(fetched_empty || all_duplicate) {
			return false;
		}
		if !self.real_time {
			return true;
		}

		match self.close {
			Some(close) => *now >= now.date().and_time(close) + self.grace,
			None => false,
		}
	}
}
