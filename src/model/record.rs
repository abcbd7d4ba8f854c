use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Entity;
use crate::utils::time::{TIME_FORMAT_DAY, Timestamp, to_time_str};

/// Raw payload as returned by a source, before reconciliation.
pub type RawRecord = Map<String, Value>;

/// One persisted time-series observation for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
	/// Derived identity, `entity_id + "_" + formatted timestamp`.
	pub id: String,
	pub entity_id: String,
	pub code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Primary ordering key.
	pub timestamp: Timestamp,
	/// Schema-specific fields.
	#[serde(default)]
	pub payload: Map<String, Value>,
}

impl Record {
	/// Build an empty record for `entity` at `timestamp` under the given id.
	pub fn new(id: impl Into<String>, entity: &Entity, timestamp: Timestamp, with_name: bool) -> Self {
		Self {
			id: id.into(),
			entity_id: entity.id.clone(),
			code: entity.code.clone(),
			name: if with_name { entity.name.clone() } else { None },
			timestamp,
			payload: Map::new(),
		}
	}

	pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
		self.payload.insert(key.into(), value);
		self
	}
}

/// Describes the target table records are persisted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSchema {
	/// Schema (table) name.
	pub name: String,
	/// Provider the records come from.
	#[serde(default = "default_provider")]
	pub provider: String,
	/// Whether the target schema has a `name` column.
	#[serde(default)]
	pub supports_name: bool,
	/// Payload field carrying the record's timestamp.
	#[serde(default = "default_time_field")]
	pub time_field: String,
	/// `strftime` layout used when deriving record ids.
	#[serde(default = "default_id_time_format")]
	pub id_time_format: String,
}

fn default_provider() -> String {
	"default".to_string()
}

fn default_time_field() -> String {
	"timestamp".to_string()
}

fn default_id_time_format() -> String {
	TIME_FORMAT_DAY.to_string()
}

impl DataSchema {
	pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			provider: provider.into(),
			supports_name: false,
			time_field: default_time_field(),
			id_time_format: default_id_time_format(),
		}
	}

	pub fn with_name_column(mut self) -> Self {
		self.supports_name = true;
		self
	}

	pub fn with_id_time_format(mut self, fmt: impl Into<String>) -> Self {
		self.id_time_format = fmt.into();
		self
	}

	pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
		self.time_field = field.into();
		self
	}

	/// Derive the record id for `entity_id` at `timestamp`.
	pub fn record_id(&self, entity_id: &str, timestamp: &Timestamp) -> String {
		format!("{}_{}", entity_id, to_time_str(timestamp, &self.id_time_format))
	}
}

impl Default for DataSchema {
	fn default() -> Self {
		Self::new("records", default_provider())
	}
}
