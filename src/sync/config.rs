//! Run configuration for the sync engine.
//!
//! `SyncConfig` is read from a camelCase JSON document. Every field has a
//! default so a minimal file only names the schema and the entities to cover.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::calendar::IntervalLevel;
use crate::model::{DataSchema, EntityQuery};
use crate::sync::SyncError;
use crate::utils::{Timestamp, parse_timestamp_str};

/// What to do when two fetched records of one batch derive the same id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateResolution {
	/// Keep both, suffixing the later one with a random token.
	#[default]
	Add,
	/// Drop the whole batch.
	Ignore,
}

/// Which window policy drives the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyKind {
	#[default]
	Generic,
	FixedCycle,
	ExplicitTimestamps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	#[serde(default)]
	pub force_update: bool,
	#[serde(default = "default_sleep_seconds")]
	pub sleep_seconds: u64,
	#[serde(default = "default_window_size")]
	pub default_window_size: usize,
	#[serde(default)]
	pub real_time: bool,
	#[serde(default)]
	pub duplicate_resolution: DuplicateResolution,
	#[serde(default, deserialize_with = "deserialize_optional_timestamp")]
	pub start_timestamp: Option<Timestamp>,
	#[serde(default, deserialize_with = "deserialize_optional_timestamp")]
	pub end_timestamp: Option<Timestamp>,
	/// Market close, local time. `None` means no close is configured.
	#[serde(default)]
	pub close_hour: Option<u32>,
	#[serde(default)]
	pub close_minute: Option<u32>,
	#[serde(default)]
	pub granularity_level: IntervalLevel,
	#[serde(default = "default_one_day_trading_minutes")]
	pub one_day_trading_minutes: u32,
	#[serde(default = "default_worker_count")]
	pub worker_count: usize,
	#[serde(default)]
	pub policy: PolicyKind,
	/// Minutes after close before a real-time entity may finish.
	#[serde(default = "default_close_grace_minutes")]
	pub close_grace_minutes: i64,
	/// Calendar region used by the fixed-cycle policy.
	#[serde(default = "default_region")]
	pub region: String,
	#[serde(default)]
	pub utc_offset_minutes: i32,
	#[serde(default)]
	pub stagger_start: bool,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub keep_progress_visible: bool,
	#[serde(default)]
	pub schema: DataSchema,
	#[serde(default)]
	pub entities: EntityQuery,
}

fn default_batch_size() -> usize {
	10
}

fn default_sleep_seconds() -> u64 {
	5
}

fn default_window_size() -> usize {
	2000
}

fn default_one_day_trading_minutes() -> u32 {
	24 * 60
}

fn default_worker_count() -> usize {
	1
}

fn default_close_grace_minutes() -> i64 {
	5
}

fn default_region() -> String {
	"cn".to_string()
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: Option<String> = Option::deserialize(deserializer)?;
	match raw {
		None => Ok(None),
		Some(s) if s.trim().is_empty() => Ok(None),
		Some(s) => parse_timestamp_str(&s)
			.map(Some)
			.ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
	}
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			batch_size: default_batch_size(),
			force_update: false,
			sleep_seconds: default_sleep_seconds(),
			default_window_size: default_window_size(),
			real_time: false,
			duplicate_resolution: DuplicateResolution::default(),
			start_timestamp: None,
			end_timestamp: None,
			close_hour: None,
			close_minute: None,
			granularity_level: IntervalLevel::default(),
			one_day_trading_minutes: default_one_day_trading_minutes(),
			worker_count: default_worker_count(),
			policy: PolicyKind::default(),
			close_grace_minutes: default_close_grace_minutes(),
			region: default_region(),
			utc_offset_minutes: 0,
			stagger_start: false,
			label: None,
			keep_progress_visible: false,
			schema: DataSchema::default(),
			entities: EntityQuery::default(),
		}
	}
}

impl SyncConfig {
	/// Load and validate a configuration file.
	pub async fn load(path: &Path) -> Result<Self, SyncError> {
		let content = tokio::fs::read_to_string(path)
			.await
			.map_err(|e| SyncError::Configuration(format!("Failed to read {}: {}", path.display(), e)))?;
		Self::from_json(&content)
	}

	pub fn from_json(content: &str) -> Result<Self, SyncError> {
		let config: SyncConfig = serde_json::from_str(content)
			.map_err(|e| SyncError::Configuration(format!("Invalid configuration: {}", e)))?;
		config.validate()?;
		debug!("Loaded configuration: {:?}", config);
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), SyncError> {
		if self.batch_size == 0 {
			return Err(SyncError::Configuration("batchSize must be positive".to_string()));
		}
		if self.worker_count == 0 {
			return Err(SyncError::Configuration("workerCount must be positive".to_string()));
		}
		if self.default_window_size == 0 {
			return Err(SyncError::Configuration("defaultWindowSize must be positive".to_string()));
		}
		if self.one_day_trading_minutes == 0 || self.one_day_trading_minutes > 24 * 60 {
			return Err(SyncError::Configuration(format!(
				"oneDayTradingMinutes out of range: {}",
				self.one_day_trading_minutes
			)));
		}
		if self.close_hour.is_some_and(|h| h > 23) || self.close_minute.is_some_and(|m| m > 59) {
			return Err(SyncError::Configuration("closeHour/closeMinute out of range".to_string()));
		}
		if self.close_grace_minutes < 0 {
			return Err(SyncError::Configuration("closeGraceMinutes must not be negative".to_string()));
		}
		if let (Some(start), Some(end)) = (self.start_timestamp, self.end_timestamp) {
			if start > end {
				return Err(SyncError::Configuration(format!(
					"startTimestamp {} is after endTimestamp {}",
					start, end
				)));
			}
		}
		if self.schema.name.trim().is_empty() {
			return Err(SyncError::Configuration("schema name must not be empty".to_string()));
		}
		Ok(())
	}

	/// `(hour, minute)` of the market close, if one is configured.
	pub fn close_time(&self) -> Option<(u32, u32)> {
		match (self.close_hour, self.close_minute) {
			(None, None) => None,
			(h, m) => Some((h.unwrap_or(0), m.unwrap_or(0))),
		}
	}

	pub fn sleep_duration(&self) -> Duration {
		Duration::from_secs(self.sleep_seconds)
	}

	/// Progress label, defaulting to the schema name.
	pub fn label(&self) -> String {
		self.label.clone().unwrap_or_else(|| self.schema.name.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_from_minimal_json() {
		let config = SyncConfig::from_json(r#"{"schema": {"name": "kdata_1d", "provider": "em"}}"#).unwrap();
		assert_eq!(config.batch_size, 10);
		assert_eq!(config.sleep_seconds, 5);
		assert_eq!(config.default_window_size, 2000);
		assert_eq!(config.close_grace_minutes, 5);
		assert_eq!(config.duplicate_resolution, DuplicateResolution::Add);
		assert_eq!(config.policy, PolicyKind::Generic);
		assert_eq!(config.close_time(), None);
		assert_eq!(config.label(), "kdata_1d");
	}

	#[test]
	fn test_full_json() {
		let config = SyncConfig::from_json(
			r#"{
				"batchSize": 50,
				"forceUpdate": true,
				"realTime": true,
				"duplicateResolution": "ignore",
				"startTimestamp": "2020-01-01",
				"endTimestamp": "2021-01-01 00:00:00",
				"closeHour": 15,
				"granularityLevel": "30m",
				"oneDayTradingMinutes": 240,
				"workerCount": 4,
				"policy": "fixedCycle",
				"entities": {"entityType": "stock", "exchanges": ["sh"]}
			}"#,
		)
		.unwrap();

		assert!(config.force_update);
		assert_eq!(config.duplicate_resolution, DuplicateResolution::Ignore);
		assert_eq!(config.policy, PolicyKind::FixedCycle);
		assert_eq!(config.granularity_level, IntervalLevel::Minute30);
		assert_eq!(config.close_time(), Some((15, 0)));
		assert_eq!(config.start_timestamp, parse_timestamp_str("2020-01-01"));
		assert_eq!(config.entities.entity_type.as_deref(), Some("stock"));
	}

	#[test]
	fn test_validation_errors() {
		assert!(matches!(
			SyncConfig::from_json(r#"{"batchSize": 0}"#),
			Err(SyncError::Configuration(_))
		));
		assert!(matches!(
			SyncConfig::from_json(r#"{"startTimestamp": "2021-01-01", "endTimestamp": "2020-01-01"}"#),
			Err(SyncError::Configuration(_))
		));
		assert!(matches!(
			SyncConfig::from_json(r#"{"closeHour": 24}"#),
			Err(SyncError::Configuration(_))
		));
		assert!(matches!(
			SyncConfig::from_json(r#"{"startTimestamp": "yesterday"}"#),
			Err(SyncError::Configuration(_))
		));
	}
}
