use itertools::Itertools;

use super::WindowInput;
use crate::model::FetchWindow;
use crate::sync::config::SyncConfig;
use crate::utils::Timestamp;

/// Policy for irregular records (reports, dividends) whose timestamps are known up front.
#[derive(Debug, Clone)]
pub struct ExplicitTimestampPolicy {
	start: Option<Timestamp>,
	end: Option<Timestamp>,
}

impl ExplicitTimestampPolicy {
	pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
		Self { start, end }
	}

	pub fn from_config(config: &SyncConfig) -> Self {
		Self::new(config.start_timestamp, config.end_timestamp)
	}

	/// Clamp discovered timestamps to the configured range, sorted and unique.
	pub fn prepare_candidates(&self, discovered: Vec<Timestamp>) -> Vec<Timestamp> {
		discovered
			.into_iter()
			.filter(|t| self.start.is_none_or(|start| *t >= start))
			.filter(|t| self.end.is_none_or(|end| *t <= end))
			.sorted()
			.dedup()
			.collect()
	}

	pub(super) fn evaluate(&self, input: &WindowInput<'_>) -> FetchWindow {
		let candidates = input.candidates.unwrap_or(&[]);
		let remaining: Vec<Timestamp> = match input.anchor {
			Some(anchor) => candidates
				.iter()
				.copied()
				.filter(|t| *t >= anchor.timestamp)
				.collect(),
			None => candidates.to_vec(),
		};

		FetchWindow::explicit(remaining)
	}
}
