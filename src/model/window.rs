use crate::utils::Timestamp;

/// Span of data requested from the source on one cycle.
///
/// `size == 0` means there is nothing to fetch. When `explicit_timestamps` is
/// set it fully determines the request and supersedes `start`/`end`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchWindow {
	pub start: Option<Timestamp>,
	pub end: Option<Timestamp>,
	pub size: usize,
	pub explicit_timestamps: Option<Vec<Timestamp>>,
}

impl FetchWindow {
	/// A window that fetches nothing, anchored at `start` for logging.
	pub fn empty(start: Option<Timestamp>) -> Self {
		Self {
			start,
			end: None,
			size: 0,
			explicit_timestamps: None,
		}
	}

	pub fn range(start: Option<Timestamp>, end: Option<Timestamp>, size: usize) -> Self {
		Self {
			start,
			end,
			size,
			explicit_timestamps: None,
		}
	}

	/// A record-set driven window over the given sorted timestamps.
	pub fn explicit(timestamps: Vec<Timestamp>) -> Self {
		if timestamps.is_empty() {
			return Self::empty(None);
		}

		Self {
			start: timestamps.first().copied(),
			end: timestamps.last().copied(),
			size: timestamps.len(),
			explicit_timestamps: Some(timestamps),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.size == 0
	}
}
