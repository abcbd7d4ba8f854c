//! Typed mapping from provider payload fields onto record payloads.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::model::RawRecord;

/// Provider values that mean "no value".
pub const NONE_MARKERS: [&str; 3] = ["", "-", "--"];

pub type Transform = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone)]
struct FieldMapping {
	source: String,
	target: String,
	transform: Option<Transform>,
}

/// `source field → (target field, optional transform)`
///
/// An empty map copies every source field unchanged.
#[derive(Clone, Default)]
pub struct FieldMap {
	mappings: Vec<FieldMapping>,
}

impl fmt::Debug for FieldMap {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map()
			.entries(self.mappings.iter().map(|m| (&m.source, &m.target)))
			.finish()
	}
}

impl FieldMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn map(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
		self.mappings.push(FieldMapping {
			source: source.into(),
			target: target.into(),
			transform: None,
		});
		self
	}

	pub fn map_with<F>(mut self, source: impl Into<String>, target: impl Into<String>, transform: F) -> Self
	where
		F: Fn(&Value) -> Value + Send + Sync + 'static,
	{
		self.mappings.push(FieldMapping {
			source: source.into(),
			target: target.into(),
			transform: Some(Arc::new(transform)),
		});
		self
	}

	pub fn is_empty(&self) -> bool {
		self.mappings.is_empty()
	}

	pub fn len(&self) -> usize {
		self.mappings.len()
	}
}

fn is_none_marker(value: &Value) -> bool {
	matches!(value, Value::String(s) if NONE_MARKERS.contains(&s.trim()))
}

/// Fill `target` from `source` through `map`.
///
/// Fields absent from `source` leave `target` untouched, so applying a map onto
/// an existing payload only overwrites what the provider actually sent.
pub fn apply_field_map(source: &RawRecord, map: &FieldMap, target: &mut Map<String, Value>) {
	if map.is_empty() {
		for (key, value) in source {
			let value = if is_none_marker(value) { Value::Null } else { value.clone() };
			target.insert(key.clone(), value);
		}
		return;
	}

	for mapping in &map.mappings {
		let Some(value) = source.get(&mapping.source) else {
			continue;
		};

		let mapped = if is_none_marker(value) || value.is_null() {
			Value::Null
		} else {
			match &mapping.transform {
				Some(transform) => transform(value),
				None => value.clone(),
			}
		};
		target.insert(mapping.target.clone(), mapped);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn raw(value: Value) -> RawRecord {
		value.as_object().cloned().unwrap()
	}

	#[test]
	fn test_empty_map_copies_everything() {
		let source = raw(json!({"open": 1.0, "close": "-", "volume": 100}));
		let mut target = Map::new();
		apply_field_map(&source, &FieldMap::new(), &mut target);

		assert_eq!(target["open"], json!(1.0));
		assert_eq!(target["close"], Value::Null);
		assert_eq!(target["volume"], json!(100));
	}

	#[test]
	fn test_mapping_with_transform() {
		let map = FieldMap::new()
			.map("f2", "close")
			.map_with("f5", "volume", |v| json!(v.as_f64().unwrap_or(0.0) * 100.0))
			.map("f9", "pe");
		let source = raw(json!({"f2": 10.5, "f5": 3, "f9": "--", "ignored": true}));

		let mut target = Map::new();
		target.insert("pe".to_string(), json!(12.0));
		apply_field_map(&source, &map, &mut target);

		assert_eq!(target["close"], json!(10.5));
		assert_eq!(target["volume"], json!(300.0));
		assert_eq!(target["pe"], Value::Null);
		assert!(!target.contains_key("ignored"));
		assert_eq!(map.len(), 3);
	}
}
