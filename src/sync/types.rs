use crate::source::SourceError;
use crate::store::StoreError;

/// Outcome of one entity's synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
	Finished,
	Failed,
}

/// What the entity loop reports back to its worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
	pub entity_id: String,
	pub outcome: EntityOutcome,
	pub cycles: usize,
	pub records_written: usize,
}

/// Error types for the sync engine
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Fetch error: {0}")]
	TransientFetch(#[from] SourceError),

	#[error("Timestamp parse error: {0}")]
	TimestampParse(String),

	#[error("Persistence error: {0}")]
	Persistence(#[from] StoreError),

	#[error("Catalog error: {0}")]
	Catalog(String),

	#[error("Calendar error: {0}")]
	Calendar(String),

	#[error("Worker error: {0}")]
	Worker(String),
}
