//! Turns fetched payloads into persistable records.
//!
//! The reconciler derives the stable id of every payload, drops or overlays
//! records that are already persisted, resolves id collisions inside a batch
//! and finally writes the batch through the data store.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::{Itertools, MinMaxResult};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::model::{DataSchema, Entity, RawRecord, Record};
use crate::source::FetchOutput;
use crate::store::DataStore;
use crate::sync::SyncError;
use crate::sync::config::{DuplicateResolution, SyncConfig};
use crate::sync::field_map::{FieldMap, apply_field_map};
use crate::utils::parse_timestamp_value;
use crate::utils::time::{TIME_FORMAT_SECOND, to_time_str};

/// Result of reconciling one fetched batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
	/// Records to persist, in fetch order.
	pub records: Vec<Record>,
	/// Non-empty batch without a single newly created record.
	pub all_duplicate: bool,
	/// The batch was dropped because of an id collision.
	pub aborted: bool,
	pub created: usize,
	pub updated: usize,
	pub skipped: usize,
}

/// Random suffix used to keep colliding records apart.
fn collision_token() -> String {
	let mut token = [0u8; 16];
	rand::rng().fill(&mut token);
	hex::encode(token)
}

pub struct RecordReconciler {
	store: Arc<dyn DataStore>,
	schema: DataSchema,
	field_map: FieldMap,
	force_update: bool,
	resolution: DuplicateResolution,
	batch_size: usize,
}

impl RecordReconciler {
	pub fn new(store: Arc<dyn DataStore>, config: &SyncConfig, field_map: FieldMap) -> Self {
		Self {
			store,
			schema: config.schema.clone(),
			field_map,
			force_update: config.force_update,
			resolution: config.duplicate_resolution,
			batch_size: config.batch_size.max(1),
		}
	}

	pub fn schema(&self) -> &DataSchema {
		&self.schema
	}

	pub async fn reconcile(&self, entity: &Entity, output: FetchOutput) -> Result<Reconciliation, SyncError> {
		match output {
			FetchOutput::Records(records) => {
				let created = records.len();
				Ok(Reconciliation {
					all_duplicate: false,
					aborted: false,
					created,
					updated: 0,
					skipped: 0,
					records,
				})
			}
			FetchOutput::Raw(payloads) => self.reconcile_raw(entity, payloads).await,
		}
	}

	async fn reconcile_raw(&self, entity: &Entity, payloads: Vec<RawRecord>) -> Result<Reconciliation, SyncError> {
		let mut result = Reconciliation::default();
		let mut seen: HashSet<String> = HashSet::with_capacity(payloads.len());
		let batch_len = payloads.len();

		for payload in payloads {
			let Some(timestamp) = payload
				.get(&self.schema.time_field)
				.and_then(parse_timestamp_value)
			else {
				let err = SyncError::TimestampParse(format!(
					"field {} of {} payload: {:?}",
					self.schema.time_field,
					entity.id,
					payload.get(&self.schema.time_field)
				));
				warn!("Skipping payload: {}", err);
				continue;
			};

			let mut id = self.schema.record_id(&entity.id, &timestamp);

			if let Some(mut existing) = self.store.get(&self.schema, &entity.id, &id).await? {
				// several payloads may map onto one persisted record; touch it once
				if self.force_update && seen.insert(id) {
					apply_field_map(&payload, &self.field_map, &mut existing.payload);
					result.records.push(existing);
					result.updated += 1;
				} else {
					result.skipped += 1;
				}
				continue;
			}

			if !seen.insert(id.clone()) {
				match self.resolution {
					DuplicateResolution::Ignore => {
						warn!(
							"Duplicate id {} within batch of {}, dropping batch",
							id, entity.id
						);
						return Ok(Reconciliation {
							all_duplicate: true,
							aborted: true,
							..Reconciliation::default()
						});
					}
					DuplicateResolution::Add => {
						let renamed = format!("{}_{}", id, collision_token());
						debug!("Duplicate id {} within batch, storing as {}", id, renamed);
						id = renamed;
						seen.insert(id.clone());
					}
				}
			}

			let mut record = Record::new(id, entity, timestamp, self.schema.supports_name);
			apply_field_map(&payload, &self.field_map, &mut record.payload);
			result.records.push(record);
			result.created += 1;
		}

		result.all_duplicate = batch_len > 0 && result.created == 0;
		Ok(result)
	}

	/// Write `records` in chunks of the configured batch size.
	///
	/// Each chunk is one atomic store call. Returns the number of records written.
	pub async fn persist(&self, entity: &Entity, records: &[Record]) -> Result<usize, SyncError> {
		if records.is_empty() {
			return Ok(0);
		}

		for chunk in records.chunks(self.batch_size) {
			self.store
				.upsert_batch(&self.schema, &entity.id, chunk)
				.await?;
		}

		match records.iter().minmax_by_key(|r| r.timestamp) {
			MinMaxResult::OneElement(only) => info!(
				"Persisted 1 {} record of {} at {}",
				self.schema.name,
				entity.id,
				to_time_str(&only.timestamp, TIME_FORMAT_SECOND)
			),
			MinMaxResult::MinMax(first, last) => info!(
				"Persisted {} {} records of {} from {} to {}",
				records.len(),
				self.schema.name,
				entity.id,
				to_time_str(&first.timestamp, TIME_FORMAT_SECOND),
				to_time_str(&last.timestamp, TIME_FORMAT_SECOND)
			),
			MinMaxResult::NoElements => {}
		}

		Ok(records.len())
	}
}
