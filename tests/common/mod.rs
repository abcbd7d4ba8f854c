#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use series_sync::model::{Entity, FetchWindow, RawRecord};
use series_sync::source::{FetchOutput, SourceClient, SourceError};
use series_sync::sync::SyncError;
use series_sync::sync::events::{SyncEvent, SyncEventHandler};
use series_sync::utils::{FixedClock, Timestamp, parse_timestamp_str, parse_timestamp_value};

pub fn ts(s: &str) -> Timestamp {
	parse_timestamp_str(s).unwrap()
}

pub fn payload(timestamp: &str, close: f64) -> RawRecord {
	json!({"timestamp": timestamp, "close": close})
		.as_object()
		.cloned()
		.unwrap()
}

/// Source double serving a fixed dataset per entity
#[derive(Default)]
pub struct ScriptedSource {
	data: HashMap<String, Vec<RawRecord>>,
	events: HashMap<String, Vec<Timestamp>>,
	failing: Vec<String>,
	page_limit: Option<usize>,
	whole_dataset: bool,
	clock_step: Option<(Arc<FixedClock>, chrono::Duration)>,
	windows: Mutex<Vec<FetchWindow>>,
	event_calls: AtomicUsize,
}

impl ScriptedSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// One record per calendar day in `[from, to]`.
	pub fn with_daily(mut self, entity_id: &str, from: &str, to: &str) -> Self {
		let records = ts(from)
			.date()
			.iter_days()
			.take_while(|d| *d <= ts(to).date())
			.enumerate()
			.map(|(i, d)| payload(&d.format("%Y-%m-%d").to_string(), i as f64))
			.collect();
		self.data.insert(entity_id.to_string(), records);
		self
	}

	pub fn with_payloads(mut self, entity_id: &str, payloads: Vec<RawRecord>) -> Self {
		self.data.insert(entity_id.to_string(), payloads);
		self
	}

	pub fn with_events(mut self, entity_id: &str, events: Vec<Timestamp>) -> Self {
		self.events.insert(entity_id.to_string(), events);
		self
	}

	pub fn failing_for(mut self, entity_id: &str) -> Self {
		self.failing.push(entity_id.to_string());
		self
	}

	/// Serve at most `limit` records per fetch.
	pub fn with_page_limit(mut self, limit: usize) -> Self {
		self.page_limit = Some(limit);
		self
	}

	/// Serve every record on each range fetch, whatever the window.
	pub fn ignoring_window(mut self) -> Self {
		self.whole_dataset = true;
		self
	}

	/// Move `clock` forward by `step` on every fetch.
	pub fn advancing(mut self, clock: Arc<FixedClock>, step: chrono::Duration) -> Self {
		self.clock_step = Some((clock, step));
		self
	}

	pub fn windows(&self) -> Vec<FetchWindow> {
		self.windows.lock().unwrap().clone()
	}

	pub fn event_calls(&self) -> usize {
		self.event_calls.load(Ordering::SeqCst)
	}
}

fn timestamp_of(payload: &RawRecord) -> Option<Timestamp> {
	payload.get("timestamp").and_then(parse_timestamp_value)
}

#[async_trait::async_trait]
impl SourceClient for ScriptedSource {
	async fn fetch(&self, entity: &Entity, window: &FetchWindow) -> Result<FetchOutput, SourceError> {
		self.windows.lock().unwrap().push(window.clone());
		if let Some((clock, step)) = &self.clock_step {
			clock.advance(*step);
		}
		if self.failing.contains(&entity.id) {
			return Err(SourceError::StatusError("503 Service Unavailable".to_string()));
		}

		let all = self.data.get(&entity.id).cloned().unwrap_or_default();
		let selected: Vec<RawRecord> = match &window.explicit_timestamps {
			Some(wanted) => all
				.into_iter()
				.filter(|p| timestamp_of(p).is_some_and(|t| wanted.contains(&t)))
				.collect(),
			None if self.whole_dataset => all,
			None => all
				.into_iter()
				.filter(|p| match timestamp_of(p) {
					Some(t) => window.start.is_none_or(|s| t >= s) && window.end.is_none_or(|e| t <= e),
					None => true,
				})
				.take(window.size.min(self.page_limit.unwrap_or(usize::MAX)))
				.collect(),
		};

		Ok(FetchOutput::Raw(selected))
	}

	async fn event_timestamps(&self, entity: &Entity) -> Result<Vec<Timestamp>, SourceError> {
		self.event_calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.events.get(&entity.id).cloned().unwrap_or_default())
	}

	fn name(&self) -> &str {
		"scripted"
	}
}

/// Handler collecting every dispatched event
pub struct RecordingHandler(pub Arc<Mutex<Vec<SyncEvent>>>);

impl SyncEventHandler for RecordingHandler {
	fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
		self.0.lock().unwrap().push(event.clone());
		Ok(())
	}

	fn name(&self) -> &'static str {
		"recording"
	}
}
