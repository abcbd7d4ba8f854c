use chrono::{Datelike, NaiveDate};
use itertools::Itertools;

use super::IntervalLevel;
use crate::utils::Timestamp;

/// Ordered trading-day sequence for one region, most recent day first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCalendar {
	days: Vec<NaiveDate>,
}

impl TradingCalendar {
	/// Build a calendar from arbitrary trading-day timestamps.
	///
	/// The input order is not trusted: days are normalized to dates, deduplicated
	/// and sorted descending.
	pub fn from_timestamps(timestamps: impl IntoIterator<Item = Timestamp>) -> Self {
		let days = timestamps
			.into_iter()
			.map(|t| t.date())
			.sorted_by(|a, b| b.cmp(a))
			.dedup()
			.collect();
		Self { days }
	}

	pub fn is_empty(&self) -> bool {
		self.days.is_empty()
	}

	pub fn len(&self) -> usize {
		self.days.len()
	}

	pub fn get(&self, index: usize) -> Option<NaiveDate> {
		self.days.get(index).copied()
	}

	pub fn latest(&self) -> Option<NaiveDate> {
		self.get(0)
	}

	/// Exact position of `date` in the sequence.
	pub fn position(&self, date: NaiveDate) -> Option<usize> {
		self.days.iter().position(|d| *d == date)
	}

	/// Position of the nearest trading day at or before `date`.
	pub fn index_at_or_before(&self, date: NaiveDate) -> Option<usize> {
		self.days.iter().position(|d| *d <= date)
	}

	/// Trading days from `index` onwards (older days), empty past the end.
	pub fn days_from(&self, index: usize) -> &[NaiveDate] {
		self.days.get(index..).unwrap_or(&[])
	}
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
	(numerator + denominator - 1) / denominator
}

/// Number of level-sized intervals between `start` and `now`.
///
/// Elapsed time is measured on `trade_days` (descending, as returned by
/// [`TradingCalendar::days_from`]) so that only trading sessions count. An empty
/// slice falls back to wall-clock days.
pub fn evaluate_size_from_timestamp(
	start: &Timestamp,
	now: &Timestamp,
	level: IntervalLevel,
	one_day_trading_minutes: u32,
	trade_days: &[NaiveDate],
) -> usize {
	let start_day = start.date();
	let today = now.date();

	let elapsed: Vec<NaiveDate> = if trade_days.is_empty() {
		start_day
			.iter_days()
			.skip(1)
			.take_while(|d| *d <= today)
			.collect()
	} else {
		trade_days
			.iter()
			.copied()
			.filter(|d| *d > start_day && *d <= today)
			.collect()
	};

	let size = match level {
		IntervalLevel::Day1 => elapsed.len() as i64 + 1,
		IntervalLevel::Week1 => elapsed.iter().map(|d| d.iso_week()).unique().count() as i64 + 1,
		IntervalLevel::Month1 => {
			elapsed
				.iter()
				.map(|d| (d.year(), d.month()))
				.unique()
				.count() as i64
				+ 1
		}
		_ => {
			let level_secs = level.to_seconds();
			let one_day_secs = i64::from(one_day_trading_minutes) * 60;
			let days = elapsed.len() as i64;
			if days > 0 {
				ceil_div((days + 1) * one_day_secs, level_secs) + 1
			} else {
				let secs = (*now - *start).num_seconds().max(0);
				(ceil_div(secs, level_secs) + 1).min(one_day_secs / level_secs + 1)
			}
		}
	};

	size.max(0) as usize
}
