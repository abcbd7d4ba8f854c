use chrono::{Datelike, Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::Timestamp;

/// Fixed time-bucket size for periodic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalLevel {
	#[serde(rename = "1m")]
	Minute1,
	#[serde(rename = "5m")]
	Minute5,
	#[serde(rename = "15m")]
	Minute15,
	#[serde(rename = "30m")]
	Minute30,
	#[serde(rename = "1h")]
	Hour1,
	#[serde(rename = "4h")]
	Hour4,
	#[serde(rename = "1d")]
	Day1,
	#[serde(rename = "1wk")]
	Week1,
	#[serde(rename = "1mon")]
	Month1,
}

impl Default for IntervalLevel {
	fn default() -> Self {
		IntervalLevel::Day1
	}
}

impl IntervalLevel {
	/// Nominal length of one interval in seconds.
	pub fn to_seconds(self) -> i64 {
		match self {
			IntervalLevel::Minute1 => 60,
			IntervalLevel::Minute5 => 5 * 60,
			IntervalLevel::Minute15 => 15 * 60,
			IntervalLevel::Minute30 => 30 * 60,
			IntervalLevel::Hour1 => 60 * 60,
			IntervalLevel::Hour4 => 4 * 60 * 60,
			IntervalLevel::Day1 => 24 * 60 * 60,
			IntervalLevel::Week1 => 7 * 24 * 60 * 60,
			IntervalLevel::Month1 => 30 * 24 * 60 * 60,
		}
	}

	/// Whether one interval is shorter than a trading day.
	pub fn is_intraday(self) -> bool {
		self.to_seconds() < IntervalLevel::Day1.to_seconds()
	}

	/// Start of the intraday bucket containing `timestamp`.
	fn floor_intraday(self, timestamp: &Timestamp) -> Timestamp {
		let step = self.to_seconds();
		let secs = i64::from(timestamp.num_seconds_from_midnight());
		timestamp.date().and_time(NaiveTime::MIN) + Duration::seconds(secs - secs % step)
	}

	/// Whether both timestamps fall into the same bucket of this level.
	pub fn is_in_same_interval(self, t1: &Timestamp, t2: &Timestamp) -> bool {
		match self {
			IntervalLevel::Week1 => t1.iso_week() == t2.iso_week(),
			IntervalLevel::Month1 => t1.year() == t2.year() && t1.month() == t2.month(),
			IntervalLevel::Day1 => t1.date() == t2.date(),
			_ => self.floor_intraday(t1) == self.floor_intraday(t2),
		}
	}
}

impl fmt::Display for IntervalLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			IntervalLevel::Minute1 => "1m",
			IntervalLevel::Minute5 => "5m",
			IntervalLevel::Minute15 => "15m",
			IntervalLevel::Minute30 => "30m",
			IntervalLevel::Hour1 => "1h",
			IntervalLevel::Hour4 => "4h",
			IntervalLevel::Day1 => "1d",
			IntervalLevel::Week1 => "1wk",
			IntervalLevel::Month1 => "1mon",
		};
		f.write_str(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::parse_timestamp_str;

	fn ts(s: &str) -> Timestamp {
		parse_timestamp_str(s).unwrap()
	}

	#[test]
	fn test_same_interval_daily() {
		let level = IntervalLevel::Day1;
		assert!(level.is_in_same_interval(&ts("2024-03-01 09:30:00"), &ts("2024-03-01 15:00:00")));
		assert!(!level.is_in_same_interval(&ts("2024-03-01"), &ts("2024-03-04")));
	}

	#[test]
	fn test_same_interval_intraday() {
		let level = IntervalLevel::Minute30;
		assert!(level.is_in_same_interval(&ts("2024-03-01 10:00:00"), &ts("2024-03-01 10:29:59")));
		assert!(!level.is_in_same_interval(&ts("2024-03-01 10:29:00"), &ts("2024-03-01 10:30:00")));
	}

	#[test]
	fn test_same_interval_week_and_month() {
		// 2024-03-04 is a Monday
		assert!(IntervalLevel::Week1.is_in_same_interval(&ts("2024-03-04"), &ts("2024-03-08")));
		assert!(!IntervalLevel::Week1.is_in_same_interval(&ts("2024-03-08"), &ts("2024-03-11")));
		assert!(IntervalLevel::Month1.is_in_same_interval(&ts("2024-03-01"), &ts("2024-03-29")));
		assert!(!IntervalLevel::Month1.is_in_same_interval(&ts("2023-03-01"), &ts("2024-03-01")));
	}

	#[test]
	fn test_level_serde_names() {
		let level: IntervalLevel = serde_json::from_str("\"15m\"").unwrap();
		assert_eq!(level, IntervalLevel::Minute15);
		assert_eq!(level.to_string(), "15m");
		assert!(level.is_intraday());
		assert!(!IntervalLevel::Week1.is_intraday());
	}
}
