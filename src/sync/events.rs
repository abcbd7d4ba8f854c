//! Event system for progress reporting.
//!
//! Workers never render progress themselves. Every completed entity produces a
//! `SyncEvent::ProgressUpdate` that the shared progress tracker hands to the
//! registered handlers while it still holds its lock, so displays observe a
//! strictly increasing completed count. Rendering is up to the handler; the
//! shipped `LoggingProgressHandler` writes it to the log.

use crate::sync::SyncError;
use tracing::{error, info};

/// Events emitted while a run makes progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// One more entity reached a terminal state
    ProgressUpdate {
        label: String,
        worker: usize,
        /// Entities this worker has completed so far
        worker_completed: usize,
        completed: usize,
        total: usize,
    },
    /// Every entity has been processed
    RunCompleted {
        label: String,
        total: usize,
        finished: usize,
        failed: usize,
        keep_visible: bool,
    },
}

/// Trait for handling sync events.
///
/// Handlers run under the progress lock and must not block for long.
pub trait SyncEventHandler: Send {
    /// Handle a sync event.
    fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
    /// Create a new, empty event dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a new event handler.
    ///
    /// Handlers are called in the order they are registered.
    pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch an event to all registered handlers.
    ///
    /// Errors from handlers are logged, but do not stop other handlers from running.
    pub fn dispatch(&mut self, event: &SyncEvent) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.handle(event) {
                error!("Handler {} failed to process event: {}", handler.name(), e);
            }
        }
    }
}

/// Writes progress to the log
#[derive(Debug, Default)]
pub struct LoggingProgressHandler;

impl SyncEventHandler for LoggingProgressHandler {
    fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
        match event {
            SyncEvent::ProgressUpdate {
                label,
                worker,
                worker_completed,
                completed,
                total,
            } => {
                info!(
                    "[{}] {}/{} entities done (worker {}: {})",
                    label, completed, total, worker, worker_completed
                );
            }
            SyncEvent::RunCompleted {
                label,
                total,
                finished,
                failed,
                keep_visible,
            } => {
                if *keep_visible || *failed > 0 {
                    info!(
                        "[{}] completed: {} entities, {} finished, {} failed",
                        label, total, finished, failed
                    );
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "logging-progress"
    }
}
