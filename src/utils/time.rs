use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

/// Instant type used across the engine: a naive date-time in the market's local time.
pub type Timestamp = NaiveDateTime;

/// Day-granularity format used for record ids by default.
pub const TIME_FORMAT_DAY: &str = "%Y-%m-%d";
/// Second-granularity format used in logs.
pub const TIME_FORMAT_SECOND: &str = "%Y-%m-%d %H:%M:%S";

const DATE_TIME_FORMATS: &[&str] = &[
	"%Y-%m-%d %H:%M:%S",
	"%Y-%m-%dT%H:%M:%S",
	"%Y-%m-%d %H:%M:%S%.f",
	"%Y-%m-%dT%H:%M:%S%.f",
	"%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Epoch values above this are interpreted as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub fn to_time_str(timestamp: &Timestamp, fmt: &str) -> String {
	timestamp.format(fmt).to_string()
}

/// Format an optional timestamp for log lines.
pub fn format_optional(timestamp: Option<&Timestamp>) -> String {
	timestamp
		.map(|t| to_time_str(t, TIME_FORMAT_SECOND))
		.unwrap_or_else(|| "-".to_string())
}

/// Midnight of the timestamp's calendar day.
pub fn day_start(timestamp: &Timestamp) -> Timestamp {
	timestamp.date().and_time(NaiveTime::MIN)
}

pub fn is_same_date(a: &NaiveDate, b: &Timestamp) -> bool {
	*a == b.date()
}

/// Minutes left until today's close, rounded up, zero once the close has passed.
pub fn count_mins_before_close_time(now: &Timestamp, close_hour: u32, close_minute: u32) -> i64 {
	let close = match NaiveTime::from_hms_opt(close_hour, close_minute, 0) {
		Some(close) => now.date().and_time(close),
		None => return 0,
	};
	if *now < close {
		let secs = (close - *now).num_seconds().max(1);
		(secs + 59) / 60
	} else {
		0
	}
}

/// Parse a timestamp string in any of the accepted layouts.
pub fn parse_timestamp_str(raw: &str) -> Option<Timestamp> {
	let raw = raw.trim();
	if raw.is_empty() {
		return None;
	}

	if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
		return Some(dt.naive_local());
	}

	for fmt in DATE_TIME_FORMATS {
		if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
			return Some(ts);
		}
	}

	DATE_FORMATS.iter().find_map(|fmt| {
		NaiveDate::parse_from_str(raw, fmt)
			.ok()
			.map(|d| d.and_time(NaiveTime::MIN))
	})
}

/// Parse a JSON value holding a timestamp: a date/date-time string or an epoch number.
pub fn parse_timestamp_value(value: &Value) -> Option<Timestamp> {
	match value {
		Value::String(s) => parse_timestamp_str(s),
		Value::Number(n) => {
			let epoch = n.as_i64()?;
			let dt = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
				DateTime::from_timestamp_millis(epoch)?
			} else {
				DateTime::from_timestamp(epoch, 0)?
			};
			Some(dt.naive_utc())
		}
		_ => None,
	}
}
