//! Background resize watcher and migration driver.
//!
//! Every tick the task either advances an in-flight migration by one bounded
//! step or, when the store is stable and past its load factor, starts a
//! resize. Steps are synchronous and short; the sleep between them keeps
//! foreground latency flat. Stopping the task only ever happens between
//! steps, so the store is left in a valid, resumable state.

use crate::storage::{MigrationStep, StoreError, StoreFrontier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Configuration for the migrator.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Pause between steps (default: 10ms)
    pub interval: Duration,

    /// Maximum entries moved per step (default: 256)
    pub batch_size: usize,

    /// Start a resize when the load factor is exceeded (default: true)
    pub auto_resize: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            batch_size: 256,
            auto_resize: true,
        }
    }
}

/// A handle to the running migrator.
///
/// When this handle is dropped, the migrator task will be stopped.
#[derive(Debug)]
pub struct Migrator {
    shutdown_tx: watch::Sender<bool>,
}

impl Migrator {
    /// Starts the migrator as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(store: Arc<StoreFrontier>, config: MigrationConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(migrator_loop(store, config, shutdown_rx));

        info!("Background migrator started");

        Self { shutdown_tx }
    }

    /// Stops the migrator after its current step.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            info!("Background migrator stopped");
        }
    }
}

impl Drop for Migrator {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn migrator_loop(
    store: Arc<StoreFrontier>,
    config: MigrationConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Migrator received shutdown signal");
                    return;
                }
            }
        }

        if config.auto_resize && store.needs_resize() {
            match store.begin_resize() {
                Ok(topology) => debug!(topology = %topology, "Load factor exceeded"),
                // Someone else (e.g. a RESIZE command) got there first
                Err(StoreError::ResizeInProgress) => {}
                Err(e) => error!(error = %e, "Failed to start resize"),
            }
        }

        match store.migrate_step(config.batch_size) {
            Ok(MigrationStep::Idle) | Ok(MigrationStep::Progress { .. }) => {}
            Ok(MigrationStep::Completed {
                moved, generation, ..
            }) => {
                debug!(moved = moved, generation = generation, "Final migration step");
            }
            Err(e) => {
                // Only a corrupt routing table gets here; keep serving and
                // leave the migration where it is.
                error!(error = %e, "Migration step failed");
            }
        }
    }
}
