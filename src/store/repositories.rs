use crate::model::{DataSchema, Entity, EntityQuery, Record};
use crate::utils::Timestamp;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Error types for store, catalog and calendar operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	SerdeError(#[from] serde_json::Error),

	#[error("Store error: {0}")]
	Backend(String),
}

/// Sort order for [`DataStore::latest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
	Ascending,
	Descending,
}

/// Repository for persisted records
#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
	/// First `limit` records of an entity ordered by timestamp.
	async fn latest(
		&self,
		schema: &DataSchema,
		entity_id: &str,
		order: Order,
		limit: usize,
	) -> Result<Vec<Record>, StoreError>;

	/// Look up a record by its derived id.
	async fn get(&self, schema: &DataSchema, entity_id: &str, id: &str) -> Result<Option<Record>, StoreError>;

	/// Insert or replace a batch; commits or fails as a unit.
	async fn upsert_batch(&self, schema: &DataSchema, entity_id: &str, records: &[Record]) -> Result<(), StoreError>;

	/// Remove one record.
	async fn delete_one(&self, schema: &DataSchema, record: &Record) -> Result<(), StoreError>;

	/// Release the session held by the caller.
	async fn release(&self) -> Result<(), StoreError> {
		Ok(())
	}
}

/// Repository for the tracked entity population
#[async_trait::async_trait]
pub trait EntityCatalog: Send + Sync {
	async fn load(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError>;
}

/// Repository for trading-calendar data
#[async_trait::async_trait]
pub trait CalendarService: Send + Sync {
	/// Trading days of `region`, most recent first.
	async fn trading_days(&self, region: &str) -> Result<Vec<Timestamp>, StoreError>;
}

pub(crate) fn sort_records(records: &mut [Record], order: Order) {
	match order {
		Order::Ascending => records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
		Order::Descending => records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
	}
}

/// File-based implementation of DataStore
///
/// One JSON file per `(schema, entity)`, holding the entity's records sorted
/// by timestamp. Writes go to a temporary file that is renamed over the
/// original so a batch lands as a unit.
pub struct FileDataStore {
	data_dir: PathBuf,
}

impl FileDataStore {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_entity_filename(&self, schema: &DataSchema, entity_id: &str) -> PathBuf {
		let safe_id: String = entity_id
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
			.collect();
		self.data_dir
			.join(&schema.name)
			.join(format!("{}.json", safe_id))
	}

	async fn read_records(&self, path: &Path) -> Result<Vec<Record>, StoreError> {
		match tokio::fs::read_to_string(path).await {
			Ok(content) => Ok(serde_json::from_str(&content)?),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
			Err(e) => Err(StoreError::IoError(e)),
		}
	}

	async fn write_records(&self, path: &Path, records: &mut Vec<Record>) -> Result<(), StoreError> {
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		sort_records(records, Order::Ascending);
		let content = serde_json::to_string_pretty(records)?;

		let tmp = path.with_extension("json.tmp");
		tokio::fs::write(&tmp, content).await?;
		tokio::fs::rename(&tmp, path).await?;
		Ok(())
	}
}

#[async_trait::async_trait]
impl DataStore for FileDataStore {
	async fn latest(
		&self,
		schema: &DataSchema,
		entity_id: &str,
		order: Order,
		limit: usize,
	) -> Result<Vec<Record>, StoreError> {
		let path = self.get_entity_filename(schema, entity_id);
		let mut records = self.read_records(&path).await?;
		sort_records(&mut records, order);
		records.truncate(limit);
		Ok(records)
	}

	async fn get(&self, schema: &DataSchema, entity_id: &str, id: &str) -> Result<Option<Record>, StoreError> {
		let path = self.get_entity_filename(schema, entity_id);
		let records = self.read_records(&path).await?;
		Ok(records.into_iter().find(|r| r.id == id))
	}

	async fn upsert_batch(&self, schema: &DataSchema, entity_id: &str, records: &[Record]) -> Result<(), StoreError> {
		if records.is_empty() {
			return Ok(());
		}

		let path = self.get_entity_filename(schema, entity_id);
		let mut existing = self.read_records(&path).await?;

		for record in records {
			match existing.iter_mut().find(|r| r.id == record.id) {
				Some(slot) => *slot = record.clone(),
				None => existing.push(record.clone()),
			}
		}

		self.write_records(&path, &mut existing).await?;
		debug!("Saved {} records to {:?}", records.len(), path);
		Ok(())
	}

	async fn delete_one(&self, schema: &DataSchema, record: &Record) -> Result<(), StoreError> {
		let path = self.get_entity_filename(schema, &record.entity_id);
		let mut existing = self.read_records(&path).await?;
		let before = existing.len();
		existing.retain(|r| r.id != record.id);

		if existing.len() != before {
			self.write_records(&path, &mut existing).await?;
			info!("Removed record {} from {:?}", record.id, path);
		}
		Ok(())
	}
}
