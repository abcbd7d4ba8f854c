//! Sync coordinator and integration point for all sync services.
//!
//! This module defines the `SyncCoordinator`, which runs the entity population
//! of one schema through a fixed pool of workers. It loads the entities and,
//! when needed, the trading calendar once, fans the entities out over a shared
//! queue and collects the outcome into a `RunSummary`.
//!
//! The coordinator is responsible for:
//! - Resolving the source bound to the configured schema and provider
//! - Loading the entity population and the trading calendar
//! - Spawning the workers and optionally staggering their start
//! - Releasing store sessions on every exit path

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::calendar::TradingCalendar;
use crate::model::Entity;
use crate::source::{SourceClient, SourceRegistry};
use crate::store::{CalendarService, DataStore, EntityCatalog};
use crate::sync::SyncError;
use crate::sync::config::SyncConfig;
use crate::sync::entity_loop::EntitySyncLoop;
use crate::sync::events::{EventDispatcher, LoggingProgressHandler, SyncEventHandler};
use crate::sync::field_map::FieldMap;
use crate::sync::progress_tracker::{ProgressShare, RunSummary};
use crate::sync::window::WindowPolicy;
use crate::utils::Clock;

/// External collaborators a run is wired to.
#[derive(Clone)]
pub struct SyncBindings {
    pub store: Arc<dyn DataStore>,
    pub catalog: Arc<dyn EntityCatalog>,
    pub calendar: Arc<dyn CalendarService>,
    pub sources: SourceRegistry,
    pub clock: Arc<dyn Clock>,
}

/// Main sync coordinator that fans entities out over the worker pool.
pub struct SyncCoordinator {
    config: SyncConfig,
    store: Arc<dyn DataStore>,
    catalog: Arc<dyn EntityCatalog>,
    calendar_service: Arc<dyn CalendarService>,
    source: Arc<dyn SourceClient>,
    clock: Arc<dyn Clock>,
    field_map: FieldMap,
    dispatcher: EventDispatcher,
}

type EntityQueue = Arc<Mutex<VecDeque<Entity>>>;

impl SyncCoordinator {
    /// Create a new coordinator.
    ///
    /// Fails with a configuration error when the configuration is invalid or
    /// no source is registered for the configured schema and provider.
    pub fn new(config: SyncConfig, bindings: SyncBindings) -> Result<Self, SyncError> {
        config.validate()?;
        let source = bindings
            .sources
            .resolve(&config.schema.name, &config.schema.provider)?;

        let mut dispatcher = EventDispatcher::new();
        dispatcher.register_handler(Box::new(LoggingProgressHandler));

        Ok(Self {
            config,
            store: bindings.store,
            catalog: bindings.catalog,
            calendar_service: bindings.calendar,
            source,
            clock: bindings.clock,
            field_map: FieldMap::new(),
            dispatcher,
        })
    }

    pub fn with_field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// Register an additional progress handler.
    pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
        self.dispatcher.register_handler(handler);
    }

    /// Run every entity to a terminal state.
    ///
    /// Entity failures are counted in the summary; only catalog, calendar and
    /// worker failures are returned as errors.
    pub async fn run(self) -> Result<RunSummary, SyncError> {
        let store = self.store.clone();
        let result = self.execute().await;

        if let Err(e) = store.release().await {
            warn!("Failed to release store session: {}", e);
        }
        result
    }

    async fn load_calendar(&self, policy: &WindowPolicy) -> Result<Option<Arc<TradingCalendar>>, SyncError> {
        if !policy.needs_calendar() {
            return Ok(None);
        }

        let days = self
            .calendar_service
            .trading_days(&self.config.region)
            .await
            .map_err(|e| SyncError::Calendar(format!("region {}: {}", self.config.region, e)))?;
        let calendar = TradingCalendar::from_timestamps(days);

        if calendar.is_empty() {
            warn!(
                "No trading days for region {}, counting wall-clock days",
                self.config.region
            );
        } else {
            debug!(
                "Loaded {} trading days for region {}",
                calendar.len(),
                self.config.region
            );
        }
        Ok(Some(Arc::new(calendar)))
    }

    async fn execute(self) -> Result<RunSummary, SyncError> {
        let policy = WindowPolicy::from_config(&self.config);
        let label = self.config.label();

        let entities = self
            .catalog
            .load(&self.config.entities)
            .await
            .map_err(|e| SyncError::Catalog(e.to_string()))?;
        let calendar = self.load_calendar(&policy).await?;

        let total = entities.len();
        let workers = self.config.worker_count;
        info!(
            "Starting {} sync of {} entities with {} policy on {} workers",
            label,
            total,
            policy.name(),
            workers
        );

        let progress = Arc::new(ProgressShare::new(
            label,
            total,
            workers,
            self.config.keep_progress_visible,
            self.dispatcher,
        ));
        let queue: EntityQueue = Arc::new(Mutex::new(entities.into_iter().collect()));
        let entity_loop = Arc::new(EntitySyncLoop::new(
            self.store.clone(),
            self.source.clone(),
            self.clock.clone(),
            calendar,
            &self.config,
            self.field_map,
        ));
        let stagger = self.config.stagger_start.then_some(workers as u64);

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    queue.clone(),
                    entity_loop.clone(),
                    progress.clone(),
                    self.store.clone(),
                    stagger,
                ))
            })
            .collect();

        for joined in join_all(handles).await {
            joined.map_err(|e| SyncError::Worker(e.to_string()))?;
        }

        Ok(progress.finish())
    }
}

fn next_entity(queue: &EntityQueue) -> Option<Entity> {
    queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
}

async fn run_worker(
    worker: usize,
    queue: EntityQueue,
    entity_loop: Arc<EntitySyncLoop>,
    progress: Arc<ProgressShare>,
    store: Arc<dyn DataStore>,
    stagger: Option<u64>,
) {
    if let Some(max_delay) = stagger {
        let delay = rand::rng().random_range(0..=max_delay);
        debug!("Worker {} starting in {}s", worker, delay);
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }

    while let Some(entity) = next_entity(&queue) {
        let report = entity_loop.run(&entity).await;
        progress.advance(worker, &report);
    }

    if let Err(e) = store.release().await {
        warn!("Worker {} failed to release store session: {}", worker, e);
    }
}
