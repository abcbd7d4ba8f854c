//! Progress tracking across the worker pool.
//!
//! This module provides `ProgressShare`, the only state the workers of a run
//! share. Each worker reports a finished entity through `advance`, which
//! increments the counters and refreshes the display under a single lock.
//! `RunSummary` is the final tally handed back to the caller.

use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::sync::events::{EventDispatcher, SyncEvent};
use crate::sync::{EntityOutcome, EntityReport};

#[derive(Default)]
struct ProgressCounters {
    completed: usize,
    finished: usize,
    failed: usize,
    records_written: usize,
    per_worker: Vec<usize>,
}

/// Shared progress of one run
///
/// Handed to every worker behind an `Arc`. The completed count never goes
/// backwards and every increment is immediately followed by a display refresh.
pub struct ProgressShare {
    label: String,
    total: usize,
    keep_visible: bool,
    inner: Mutex<(ProgressCounters, EventDispatcher)>,
}

impl ProgressShare {
    /// Create a tracker for `total` entities spread over `workers` slots.
    pub fn new(
        label: impl Into<String>,
        total: usize,
        workers: usize,
        keep_visible: bool,
        dispatcher: EventDispatcher,
    ) -> Self {
        let counters = ProgressCounters {
            per_worker: vec![0; workers],
            ..ProgressCounters::default()
        };
        Self {
            label: label.into(),
            total,
            keep_visible,
            inner: Mutex::new((counters, dispatcher)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, (ProgressCounters, EventDispatcher)> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Record a processed entity and refresh the display.
    ///
    /// Failed entities count as processed; they are tallied separately.
    pub fn advance(&self, worker: usize, report: &EntityReport) {
        let mut guard = self.lock();
        let (counters, dispatcher) = &mut *guard;

        counters.completed += 1;
        counters.records_written += report.records_written;
        match report.outcome {
            EntityOutcome::Finished => counters.finished += 1,
            EntityOutcome::Failed => counters.failed += 1,
        }

        if counters.per_worker.len() <= worker {
            counters.per_worker.resize(worker + 1, 0);
        }
        counters.per_worker[worker] += 1;

        dispatcher.dispatch(&SyncEvent::ProgressUpdate {
            label: self.label.clone(),
            worker,
            worker_completed: counters.per_worker[worker],
            completed: counters.completed,
            total: self.total,
        });
    }

    pub fn completed(&self) -> usize {
        self.lock().0.completed
    }

    /// Entities completed by each worker slot.
    pub fn per_worker(&self) -> Vec<usize> {
        self.lock().0.per_worker.clone()
    }

    /// Close the run: emit the completion event and return the tally.
    pub fn finish(&self) -> RunSummary {
        let mut guard = self.lock();
        let (counters, dispatcher) = &mut *guard;

        let summary = RunSummary {
            label: self.label.clone(),
            total: self.total,
            finished: counters.finished,
            failed: counters.failed,
            records_written: counters.records_written,
        };

        dispatcher.dispatch(&SyncEvent::RunCompleted {
            label: self.label.clone(),
            total: self.total,
            finished: summary.finished,
            failed: summary.failed,
            keep_visible: self.keep_visible,
        });

        info!("{}", summary.summary());
        summary
    }
}

/// Final tally of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub label: String,
    pub total: usize,
    pub finished: usize,
    pub failed: usize,
    pub records_written: usize,
}

impl RunSummary {
    /// True when there was work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.failed == self.total
    }

    /// Get a human-readable summary of the run
    pub fn summary(&self) -> String {
        format!(
            "Sync {}: {} entities, {} finished, {} failed, {} records written",
            self.label, self.total, self.finished, self.failed, self.records_written
        )
    }
}
