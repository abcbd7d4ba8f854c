//! In-memory implementations of the store, catalog and calendar seams.
//!
//! Used by tests and by dry runs of the binary. The data store keeps call
//! counters so tests can assert how many writes and deletes a cycle issued.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::repositories::{CalendarService, DataStore, EntityCatalog, Order, StoreError, sort_records};
use crate::model::{DataSchema, Entity, EntityQuery, Record};
use crate::utils::{Timestamp, parse_timestamp_str};

type Partition = BTreeMap<String, Record>;

#[derive(Default)]
pub struct InMemoryDataStore {
	partitions: RwLock<HashMap<(String, String), Partition>>,
	failing_entities: RwLock<Vec<String>>,
	upsert_calls: AtomicUsize,
	records_written: AtomicUsize,
	delete_calls: AtomicUsize,
	release_calls: AtomicUsize,
}

impl InMemoryDataStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn key(schema: &DataSchema, entity_id: &str) -> (String, String) {
		(schema.name.clone(), entity_id.to_string())
	}

	/// Seed a record without counting it as a write.
	pub fn insert(&self, schema: &DataSchema, record: Record) {
		let mut partitions = self.partitions.write().unwrap_or_else(|e| e.into_inner());
		partitions
			.entry(Self::key(schema, &record.entity_id))
			.or_default()
			.insert(record.id.clone(), record);
	}

	/// All records of an entity, oldest first.
	pub fn records(&self, schema: &DataSchema, entity_id: &str) -> Vec<Record> {
		let partitions = self.partitions.read().unwrap_or_else(|e| e.into_inner());
		let mut records: Vec<Record> = partitions
			.get(&Self::key(schema, entity_id))
			.map(|p| p.values().cloned().collect())
			.unwrap_or_default();
		sort_records(&mut records, Order::Ascending);
		records
	}

	/// Make every write for `entity_id` fail.
	pub fn fail_writes_for(&self, entity_id: impl Into<String>) {
		self.failing_entities
			.write()
			.unwrap_or_else(|e| e.into_inner())
			.push(entity_id.into());
	}

	pub fn upsert_calls(&self) -> usize {
		self.upsert_calls.load(Ordering::SeqCst)
	}

	pub fn records_written(&self) -> usize {
		self.records_written.load(Ordering::SeqCst)
	}

	pub fn delete_calls(&self) -> usize {
		self.delete_calls.load(Ordering::SeqCst)
	}

	pub fn release_calls(&self) -> usize {
		self.release_calls.load(Ordering::SeqCst)
	}
}

#[async_trait::async_trait]
impl DataStore for InMemoryDataStore {
	async fn latest(
		&self,
		schema: &DataSchema,
		entity_id: &str,
		order: Order,
		limit: usize,
	) -> Result<Vec<Record>, StoreError> {
		let mut records = self.records(schema, entity_id);
		sort_records(&mut records, order);
		records.truncate(limit);
		Ok(records)
	}

	async fn get(&self, schema: &DataSchema, entity_id: &str, id: &str) -> Result<Option<Record>, StoreError> {
		let partitions = self.partitions.read().unwrap_or_else(|e| e.into_inner());
		Ok(partitions
			.get(&Self::key(schema, entity_id))
			.and_then(|p| p.get(id))
			.cloned())
	}

	async fn upsert_batch(&self, schema: &DataSchema, entity_id: &str, records: &[Record]) -> Result<(), StoreError> {
		let failing = self
			.failing_entities
			.read()
			.unwrap_or_else(|e| e.into_inner())
			.iter()
			.any(|id| id == entity_id);
		if failing {
			return Err(StoreError::Backend(format!("write rejected for {}", entity_id)));
		}

		self.upsert_calls.fetch_add(1, Ordering::SeqCst);
		self.records_written.fetch_add(records.len(), Ordering::SeqCst);

		let mut partitions = self.partitions.write().unwrap_or_else(|e| e.into_inner());
		let partition = partitions.entry(Self::key(schema, entity_id)).or_default();
		for record in records {
			partition.insert(record.id.clone(), record.clone());
		}
		Ok(())
	}

	async fn delete_one(&self, schema: &DataSchema, record: &Record) -> Result<(), StoreError> {
		self.delete_calls.fetch_add(1, Ordering::SeqCst);
		let mut partitions = self.partitions.write().unwrap_or_else(|e| e.into_inner());
		if let Some(partition) = partitions.get_mut(&Self::key(schema, &record.entity_id)) {
			partition.remove(&record.id);
		}
		Ok(())
	}

	async fn release(&self) -> Result<(), StoreError> {
		self.release_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

/// Fixed entity population, optionally loaded from a JSON array file.
#[derive(Debug, Clone, Default)]
pub struct StaticEntityCatalog {
	entities: Vec<Entity>,
}

impl StaticEntityCatalog {
	pub fn new(entities: Vec<Entity>) -> Self {
		Self { entities }
	}

	pub async fn from_json_file(path: &Path) -> Result<Self, StoreError> {
		let content = tokio::fs::read_to_string(path).await?;
		let entities: Vec<Entity> = serde_json::from_str(&content)?;
		Ok(Self::new(entities))
	}
}

#[async_trait::async_trait]
impl EntityCatalog for StaticEntityCatalog {
	async fn load(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
		Ok(self
			.entities
			.iter()
			.filter(|e| query.matches(e))
			.cloned()
			.collect())
	}
}

/// Trading days per region, optionally loaded from `{"region": ["2024-01-02", ...]}`.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
	regions: HashMap<String, Vec<Timestamp>>,
}

impl StaticCalendar {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_region(mut self, region: impl Into<String>, days: Vec<Timestamp>) -> Self {
		self.regions.insert(region.into(), days);
		self
	}

	pub async fn from_json_file(path: &Path) -> Result<Self, StoreError> {
		let content = tokio::fs::read_to_string(path).await?;
		let raw: HashMap<String, Vec<String>> = serde_json::from_str(&content)?;

		let mut calendar = Self::new();
		for (region, days) in raw {
			let mut parsed = Vec::with_capacity(days.len());
			for day in days {
				let ts = parse_timestamp_str(&day)
					.ok_or_else(|| StoreError::Backend(format!("invalid trading day {} in {}", day, region)))?;
				parsed.push(ts);
			}
			calendar = calendar.with_region(region, parsed);
		}
		Ok(calendar)
	}
}

#[async_trait::async_trait]
impl CalendarService for StaticCalendar {
	async fn trading_days(&self, region: &str) -> Result<Vec<Timestamp>, StoreError> {
		let mut days = self.regions.get(region).cloned().unwrap_or_default();
		days.sort_by(|a, b| b.cmp(a));
		Ok(days)
	}
}
