//! Per-entity synchronization loop.
//!
//! One loop drives one entity through repeated
//! window → fetch → reconcile → persist → completion cycles until it is
//! finished or an error moves it to failed. Errors never escape the loop; the
//! caller only ever sees an [`EntityReport`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::calendar::TradingCalendar;
use crate::model::{DataSchema, Entity, Record};
use crate::source::SourceClient;
use crate::store::{DataStore, Order};
use crate::sync::completion::CompletionDetector;
use crate::sync::config::SyncConfig;
use crate::sync::field_map::FieldMap;
use crate::sync::reconciler::RecordReconciler;
use crate::sync::state::SyncState;
use crate::sync::window::{WindowInput, WindowPolicy, resolve_anchor};
use crate::sync::{EntityOutcome, EntityReport, SyncError};
use crate::utils::Clock;
use crate::utils::time::format_optional;

enum CycleStep {
	Continue,
	Finished,
}

pub struct EntitySyncLoop {
	store: Arc<dyn DataStore>,
	source: Arc<dyn SourceClient>,
	clock: Arc<dyn Clock>,
	calendar: Option<Arc<TradingCalendar>>,
	policy: WindowPolicy,
	reconciler: RecordReconciler,
	completion: CompletionDetector,
	schema: DataSchema,
	sleep: Duration,
}

impl EntitySyncLoop {
	pub fn new(
		store: Arc<dyn DataStore>,
		source: Arc<dyn SourceClient>,
		clock: Arc<dyn Clock>,
		calendar: Option<Arc<TradingCalendar>>,
		config: &SyncConfig,
		field_map: FieldMap,
	) -> Self {
		Self {
			reconciler: RecordReconciler::new(store.clone(), config, field_map),
			store,
			source,
			clock,
			calendar,
			policy: WindowPolicy::from_config(config),
			completion: CompletionDetector::from_config(config),
			schema: config.schema.clone(),
			sleep: config.sleep_duration(),
		}
	}

	/// Run `entity` to a terminal state.
	pub async fn run(&self, entity: &Entity) -> EntityReport {
		let mut state = SyncState::new();

		let outcome = loop {
			match self.run_cycle(entity, &mut state).await {
				Ok(CycleStep::Finished) => break EntityOutcome::Finished,
				Ok(CycleStep::Continue) => {
					// a zero sleep still hands the worker back to the runtime
					if self.sleep.is_zero() {
						tokio::task::yield_now().await;
					} else {
						tokio::time::sleep(self.sleep).await;
					}
				}
				Err(e) => {
					error!(
						entity_id = %entity.id,
						schema = %self.schema.name,
						"Failed to sync entity: {}",
						e
					);
					break EntityOutcome::Failed;
				}
			}
		};

		debug!(
			"{} done after {} cycles, {} records written, last persisted {}",
			entity.id,
			state.cycles,
			state.records_written,
			format_optional(state.last_persisted.as_ref())
		);

		EntityReport {
			entity_id: entity.id.clone(),
			outcome,
			cycles: state.cycles,
			records_written: state.records_written,
		}
	}

	/// Read the most recent records and settle on the anchor, dropping a
	/// provisional bar when the fixed-cycle policy finds one.
	async fn load_anchor(&self, entity: &Entity) -> Result<Option<Record>, SyncError> {
		let latest = self
			.store
			.latest(&self.schema, &entity.id, Order::Descending, self.policy.anchor_depth())
			.await?;

		match &self.policy {
			WindowPolicy::FixedCycle(policy) => {
				let resolution = resolve_anchor(&latest, policy.level());
				if let Some(provisional) = resolution.provisional {
					info!(
						"Removing provisional {} record {} of {}",
						self.schema.name, provisional.id, entity.id
					);
					self.store.delete_one(&self.schema, &provisional).await?;
				}
				Ok(resolution.anchor)
			}
			_ => Ok(latest.into_iter().next()),
		}
	}

	async fn run_cycle(&self, entity: &Entity, state: &mut SyncState) -> Result<CycleStep, SyncError> {
		let anchor = self.load_anchor(entity).await?;

		if let WindowPolicy::ExplicitTimestamps(policy) = &self.policy {
			if state.candidates.is_none() {
				let discovered = self.source.event_timestamps(entity).await?;
				let prepared = policy.prepare_candidates(discovered);
				debug!("{} candidate timestamps for {}", prepared.len(), entity.id);
				state.candidates = Some(prepared);
			}
		}

		let input = WindowInput::new(self.clock.now(), entity)
			.with_anchor(anchor.as_ref())
			.with_calendar(self.calendar.as_deref())
			.with_candidates(state.candidates.as_deref());
		let window = self.policy.evaluate(&input);

		if window.is_empty() {
			debug!(
				"Nothing to fetch for {} from {}",
				entity.id,
				format_optional(window.start.as_ref())
			);
			state.record_cycle(0, None);
			return Ok(CycleStep::Finished);
		}

		debug!(
			"Fetching {} {} records of {} from {} (size {}) via {}",
			self.policy.name(),
			self.schema.name,
			entity.id,
			format_optional(window.start.as_ref()),
			window.size,
			self.source.name()
		);

		let output = self.source.fetch(entity, &window).await?;
		let fetched_empty = output.is_empty();
		let reconciled = self.reconciler.reconcile(entity, output).await?;

		if reconciled.aborted {
			state.record_cycle(0, None);
			return Ok(CycleStep::Finished);
		}

		let written = self.reconciler.persist(entity, &reconciled.records).await?;
		state.record_cycle(written, reconciled.records.iter().map(|r| r.timestamp).max());

		if self
			.completion
			.is_finished(fetched_empty, reconciled.all_duplicate, &self.clock.now())
		{
			return Ok(CycleStep::Finished);
		}

		Ok(CycleStep::Continue)
	}
}
