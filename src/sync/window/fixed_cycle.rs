//! Trading-calendar aware policy for fixed-interval records (bars).
//!
//! Bars are counted in trading sessions rather than wall-clock time, so the
//! window size is derived from the region's trading-day sequence. The most
//! recent persisted bar may still be forming; [`resolve_anchor`] detects that
//! and tells the loop to drop it before the next fetch.

use tracing::warn;

use super::WindowInput;
use crate::calendar::{IntervalLevel, TradingCalendar, evaluate_size_from_timestamp};
use crate::model::{FetchWindow, Record};
use crate::sync::config::SyncConfig;
use crate::utils::time::{count_mins_before_close_time, is_same_date};

/// Verdict on the most recent persisted records of an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorResolution {
	/// Record the window is computed from.
	pub anchor: Option<Record>,
	/// Record to delete before fetching, because it shares its interval with the anchor.
	pub provisional: Option<Record>,
}

/// Decide the anchor from up to two records ordered most recent first.
pub fn resolve_anchor(latest: &[Record], level: IntervalLevel) -> AnchorResolution {
	match latest {
		[] => AnchorResolution::default(),
		[only] => AnchorResolution {
			anchor: Some(only.clone()),
			provisional: None,
		},
		[newest, previous, ..] => {
			if level.is_in_same_interval(&newest.timestamp, &previous.timestamp) {
				AnchorResolution {
					anchor: Some(previous.clone()),
					provisional: Some(newest.clone()),
				}
			} else {
				AnchorResolution {
					anchor: Some(newest.clone()),
					provisional: None,
				}
			}
		}
	}
}

#[derive(Debug, Clone)]
pub struct FixedCyclePolicy {
	level: IntervalLevel,
	one_day_trading_minutes: u32,
	close_hour: u32,
	close_minute: u32,
	default_window_size: usize,
}

impl FixedCyclePolicy {
	pub fn new(level: IntervalLevel, one_day_trading_minutes: u32, close: (u32, u32), default_window_size: usize) -> Self {
		Self {
			level,
			one_day_trading_minutes,
			close_hour: close.0,
			close_minute: close.1,
			default_window_size,
		}
	}

	pub fn from_config(config: &SyncConfig) -> Self {
		Self::new(
			config.granularity_level,
			config.one_day_trading_minutes,
			config.close_time().unwrap_or((0, 0)),
			config.default_window_size,
		)
	}

	pub fn level(&self) -> IntervalLevel {
		self.level
	}

	/// Index into the calendar of the last trading day that counts as elapsed.
	fn trade_index(&self, input: &WindowInput<'_>, calendar: &TradingCalendar) -> usize {
		let mut index = 0;

		// today's session is still open, so it does not count yet
		if count_mins_before_close_time(&input.now, self.close_hour, self.close_minute) > 0
			&& calendar.latest().is_some_and(|d| is_same_date(&d, &input.now))
		{
			index = 1;
		}

		if let Some(delisted_at) = input.entity.delisted_at {
			if delisted_at <= input.now {
				match calendar.index_at_or_before(delisted_at.date()) {
					Some(rebased) => index = rebased,
					None => warn!(
						"No trading day at or before delisting date {} of {}, keeping index {}",
						delisted_at.date(),
						input.entity.id,
						index
					),
				}
			}
		}

		index
	}

	pub(super) fn evaluate(&self, input: &WindowInput<'_>) -> FetchWindow {
		let start = input
			.anchor
			.map(|r| r.timestamp)
			.or(input.entity.listing_timestamp);

		let Some(start) = start else {
			return FetchWindow::range(None, None, self.default_window_size);
		};

		let empty = TradingCalendar::default();
		let calendar = input.calendar.unwrap_or(&empty);
		let index = self.trade_index(input, calendar);

		let size = evaluate_size_from_timestamp(
			&start,
			&input.now,
			self.level,
			self.one_day_trading_minutes,
			calendar.days_from(index),
		);

		FetchWindow::range(Some(start), None, size)
	}
}
