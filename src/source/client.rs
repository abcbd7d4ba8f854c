//!
//! Data source seam and a generic HTTP JSON source.
//!
//! The engine only talks to [`SourceClient`]. [`HttpSourceClient`] is a reference
//! implementation that asks a JSON endpoint for records inside a fetch window and
//! retries transient transport failures with exponential backoff.

use super::types::*;
use crate::model::{Entity, FetchWindow, RawRecord};
use crate::utils::time::{TIME_FORMAT_SECOND, Timestamp, parse_timestamp_value, to_time_str};

use backoff::{ExponentialBackoff, future::retry};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Pluggable, schema-specific fetch of provider records.
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
	/// Fetch the records of `entity` covered by `window`.
	async fn fetch(&self, entity: &Entity, window: &FetchWindow) -> Result<FetchOutput, SourceError>;

	/// Discover the candidate event timestamps of `entity`.
	///
	/// Only used by the explicit-timestamp policy; sources without irregular
	/// events report none.
	async fn event_timestamps(&self, _entity: &Entity) -> Result<Vec<Timestamp>, SourceError> {
		Ok(Vec::new())
	}

	/// Get the name of this source for logging.
	fn name(&self) -> &str;
}

/// Generic JSON-over-HTTP source
#[derive(Clone)]
pub struct HttpSourceClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL; `records` and `timestamps` endpoints hang off it.
	base_url: String,
	/// Upper bound on time spent retrying one request.
	max_retry: Duration,
}

impl HttpSourceClient {
	/// Create a new source client.
	///
	/// # Arguments
	/// * `base_url` - The HTTP endpoint serving records.
	/// * `timeout` - Per-request timeout.
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			max_retry: Duration::from_secs(60),
		})
	}

	pub fn with_max_retry(mut self, max_retry: Duration) -> Self {
		self.max_retry = max_retry;
		self
	}

	fn window_query(entity: &Entity, window: &FetchWindow) -> Vec<(String, String)> {
		let mut query = vec![
			("entity_id".to_string(), entity.id.clone()),
			("code".to_string(), entity.code.clone()),
			("size".to_string(), window.size.to_string()),
		];

		if let Some(timestamps) = &window.explicit_timestamps {
			let joined = timestamps
				.iter()
				.map(|t| to_time_str(t, TIME_FORMAT_SECOND))
				.collect::<Vec<_>>()
				.join(",");
			query.push(("timestamps".to_string(), joined));
			return query;
		}

		if let Some(start) = &window.start {
			query.push(("start".to_string(), to_time_str(start, TIME_FORMAT_SECOND)));
		}
		if let Some(end) = &window.end {
			query.push(("end".to_string(), to_time_str(end, TIME_FORMAT_SECOND)));
		}
		query
	}

	/// GET `path` with `query`, retrying transient failures.
	async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, SourceError> {
		let url = format!("{}/{}", self.base_url, path);
		let policy = ExponentialBackoff {
			max_elapsed_time: Some(self.max_retry),
			..ExponentialBackoff::default()
		};

		retry(policy, || async {
			let response = self
				.http_client
				.get(&url)
				.query(query)
				.send()
				.await
				.map_err(|e| {
					warn!("Source request to {} failed: {}", url, e);
					backoff::Error::transient(SourceError::HttpError(e))
				})?;

			let status = response.status();
			if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
				warn!("Source {} responded {}, retrying", url, status);
				return Err(backoff::Error::transient(SourceError::StatusError(
					status.to_string(),
				)));
			}
			if !status.is_success() {
				return Err(backoff::Error::permanent(SourceError::StatusError(
					status.to_string(),
				)));
			}

			response
				.json::<Value>()
				.await
				.map_err(|e| backoff::Error::permanent(SourceError::HttpError(e)))
		})
		.await
	}

	/// Accept either a bare array or an object wrapping it under `data`.
	fn unwrap_items(body: Value) -> Result<Vec<Value>, SourceError> {
		match body {
			Value::Array(items) => Ok(items),
			Value::Object(mut obj) => match obj.remove("data") {
				Some(Value::Array(items)) => Ok(items),
				Some(Value::Null) | None => Ok(Vec::new()),
				Some(_) => Err(SourceError::NoData),
			},
			Value::Null => Ok(Vec::new()),
			_ => Err(SourceError::NoData),
		}
	}
}

#[async_trait::async_trait]
impl SourceClient for HttpSourceClient {
	async fn fetch(&self, entity: &Entity, window: &FetchWindow) -> Result<FetchOutput, SourceError> {
		let query = Self::window_query(entity, window);
		let body = self.get_json("records", &query).await?;

		let mut raw: Vec<RawRecord> = Vec::new();
		for item in Self::unwrap_items(body)? {
			match item {
				Value::Object(map) => raw.push(map),
				other => debug!("Ignoring non-object item from source: {}", other),
			}
		}

		debug!("Fetched {} raw records for {}", raw.len(), entity.id);
		Ok(FetchOutput::Raw(raw))
	}

	async fn event_timestamps(&self, entity: &Entity) -> Result<Vec<Timestamp>, SourceError> {
		let query = vec![("entity_id".to_string(), entity.id.clone())];
		let body = self.get_json("timestamps", &query).await?;

		let mut timestamps = Vec::new();
		for item in Self::unwrap_items(body)? {
			match parse_timestamp_value(&item) {
				Some(t) => timestamps.push(t),
				None => warn!("Ignoring unparseable event timestamp {} for {}", item, entity.id),
			}
		}
		Ok(timestamps)
	}

	fn name(&self) -> &str {
		"http"
	}
}
