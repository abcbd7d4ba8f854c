use crate::utils::Timestamp;

/// Per-entity bookkeeping kept in memory for the duration of one loop.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
	/// Candidate event timestamps, fetched at most once.
	pub candidates: Option<Vec<Timestamp>>,
	/// Most recent persisted timestamp seen by the loop.
	pub last_persisted: Option<Timestamp>,
	pub cycles: usize,
	pub records_written: usize,
}

impl SyncState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_cycle(&mut self, written: usize, latest: Option<Timestamp>) {
		self.cycles += 1;
		self.records_written += written;
		if let Some(latest) = latest {
			self.last_persisted = Some(self.last_persisted.map_or(latest, |seen| seen.max(latest)));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::parse_timestamp_str;

	#[test]
	fn test_record_cycle_keeps_latest_timestamp() {
		let mut state = SyncState::new();
		state.record_cycle(2, parse_timestamp_str("2020-01-03"));
		state.record_cycle(0, None);
		state.record_cycle(1, parse_timestamp_str("2020-01-02"));

		assert_eq!(state.cycles, 3);
		assert_eq!(state.records_written, 3);
		assert_eq!(state.last_persisted, parse_timestamp_str("2020-01-03"));
	}
}
