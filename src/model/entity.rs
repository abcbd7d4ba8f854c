use serde::{Deserialize, Serialize};

use crate::utils::Timestamp;

/// A tracked subject (for example a listed security) whose records are synchronized.
///
/// Loaded once per run by the entity catalog and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
	/// Stable identifier, e.g. `stock_sz_000001`.
	pub id: String,
	/// Exchange code of the subject.
	pub code: String,
	/// Display name, when the catalog carries one.
	#[serde(default)]
	pub name: Option<String>,
	/// Kind of subject, used for catalog filtering.
	#[serde(default)]
	pub entity_type: String,
	/// Exchange the subject trades on.
	#[serde(default)]
	pub exchange: String,
	/// Listing time. `None` means the subject is not (yet) tracked as listed.
	#[serde(default, rename = "timestamp")]
	pub listing_timestamp: Option<Timestamp>,
	/// Delisting / end date, if the subject stopped trading.
	#[serde(default)]
	pub delisted_at: Option<Timestamp>,
}

impl Entity {
	pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			code: code.into(),
			name: None,
			entity_type: String::new(),
			exchange: String::new(),
			listing_timestamp: None,
			delisted_at: None,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_type(mut self, entity_type: impl Into<String>, exchange: impl Into<String>) -> Self {
		self.entity_type = entity_type.into();
		self.exchange = exchange.into();
		self
	}

	pub fn listed_at(mut self, timestamp: Timestamp) -> Self {
		self.listing_timestamp = Some(timestamp);
		self
	}

	pub fn delisted(mut self, timestamp: Timestamp) -> Self {
		self.delisted_at = Some(timestamp);
		self
	}

	/// Whether the subject only starts trading at or after `now`.
	pub fn is_listed_after(&self, now: &Timestamp) -> bool {
		self.listing_timestamp.is_some_and(|listed| listed >= *now)
	}
}

/// Filter describing which entities a run covers.
///
/// When `entity_ids` is set it takes precedence over every other filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityQuery {
	#[serde(default)]
	pub entity_type: Option<String>,
	#[serde(default)]
	pub exchanges: Vec<String>,
	#[serde(default)]
	pub entity_ids: Option<Vec<String>>,
	#[serde(default)]
	pub codes: Option<Vec<String>>,
}

impl EntityQuery {
	pub fn matches(&self, entity: &Entity) -> bool {
		if let Some(ids) = &self.entity_ids {
			return ids.iter().any(|id| *id == entity.id);
		}

		if let Some(entity_type) = &self.entity_type {
			if *entity_type != entity.entity_type {
				return false;
			}
		}

		if !self.exchanges.is_empty() && !self.exchanges.contains(&entity.exchange) {
			return false;
		}

		match &self.codes {
			Some(codes) => codes.contains(&entity.code),
			None => true,
		}
	}
}
