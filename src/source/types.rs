//! Types exchanged with data sources

use crate::model::{RawRecord, Record};

/// Result of one fetch against a source.
///
/// Schema-specific sources either hand back raw payloads, which go through id
/// derivation and dedup, or fully-formed records that bypass it.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutput {
	/// Raw provider payloads.
	Raw(Vec<RawRecord>),
	/// Records already built by the source.
	Records(Vec<Record>),
}

impl FetchOutput {
	pub fn len(&self) -> usize {
		match self {
			FetchOutput::Raw(items) => items.len(),
			FetchOutput::Records(items) => items.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for FetchOutput {
	fn default() -> Self {
		FetchOutput::Raw(Vec::new())
	}
}

/// Error types for source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Source responded with status {0}")]
	StatusError(String),

	#[error("No data returned")]
	NoData,

	#[error("Source error: {0}")]
	Other(String),
}
