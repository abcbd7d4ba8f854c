use super::WindowInput;
use crate::model::FetchWindow;
use crate::sync::config::SyncConfig;
use crate::utils::Timestamp;
use crate::utils::time::day_start;

/// Catch-up policy: fetch everything since the last persisted record.
#[derive(Debug, Clone)]
pub struct GenericPolicy {
	start: Option<Timestamp>,
	end: Option<Timestamp>,
	default_window_size: usize,
}

impl GenericPolicy {
	pub fn new(start: Option<Timestamp>, end: Option<Timestamp>, default_window_size: usize) -> Self {
		Self {
			start,
			end,
			default_window_size,
		}
	}

	pub fn from_config(config: &SyncConfig) -> Self {
		Self::new(config.start_timestamp, config.end_timestamp, config.default_window_size)
	}

	pub(super) fn evaluate(&self, input: &WindowInput<'_>) -> FetchWindow {
		let latest = input
			.anchor
			.map(|r| r.timestamp)
			.or(input.entity.listing_timestamp);

		let Some(mut latest) = latest else {
			return FetchWindow::range(self.start, self.end, self.default_window_size);
		};

		if let Some(start) = self.start {
			latest = latest.max(start);
		}

		let size = match self.end {
			Some(end) if latest >= end => 0,
			Some(_) => self.default_window_size,
			None => (day_start(&input.now) - latest).num_days().max(0) as usize,
		};

		FetchWindow::range(Some(latest), self.end, size)
	}
}
