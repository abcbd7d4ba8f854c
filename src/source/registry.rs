//! Explicit `(schema, provider) → source` registry.
//!
//! Sources are registered by name at startup; nothing registers itself
//! implicitly. Resolving a pair that was never registered is a configuration
//! error and is reported before any entity is touched.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::client::SourceClient;
use crate::sync::SyncError;

/// Builds a source for a registered `(schema, provider)` pair.
pub type SourceFactory = Arc<dyn Fn() -> Result<Arc<dyn SourceClient>, SyncError> + Send + Sync>;

#[derive(Default, Clone)]
pub struct SourceRegistry {
	factories: HashMap<(String, String), SourceFactory>,
}

impl SourceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a factory, replacing any earlier binding for the same pair.
	pub fn register<F>(&mut self, schema: impl Into<String>, provider: impl Into<String>, factory: F)
	where
		F: Fn() -> Result<Arc<dyn SourceClient>, SyncError> + Send + Sync + 'static,
	{
		let key = (schema.into(), provider.into());
		debug!("Registering source for schema {} / provider {}", key.0, key.1);
		self.factories.insert(key, Arc::new(factory));
	}

	pub fn contains(&self, schema: &str, provider: &str) -> bool {
		self.factories
			.contains_key(&(schema.to_string(), provider.to_string()))
	}

	/// Providers registered for `schema`, sorted.
	pub fn providers(&self, schema: &str) -> Vec<String> {
		let mut providers: Vec<String> = self
			.factories
			.keys()
			.filter(|(s, _)| s == schema)
			.map(|(_, p)| p.clone())
			.collect();
		providers.sort();
		providers
	}

	/// Build the source bound to `(schema, provider)`.
	pub fn resolve(&self, schema: &str, provider: &str) -> Result<Arc<dyn SourceClient>, SyncError> {
		let factory = self
			.factories
			.get(&(schema.to_string(), provider.to_string()))
			.ok_or_else(|| {
				SyncError::Configuration(format!(
					"no source registered for schema {} and provider {}",
					schema, provider
				))
			})?;
		factory()
	}
}
