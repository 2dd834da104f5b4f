//! Process-scoped store lifecycle.
//!
//! [`Store::open`] builds the [`StoreFrontier`] and starts its background
//! tasks; [`Store::close`] stops them. The frontier itself is handed to the
//! connection layer explicitly; there is no global instance.

use crate::storage::{
    ExpiryConfig, ExpirySweeper, MigrationConfig, Migrator, ResizePolicy, StoreFrontier,
};
use std::sync::Arc;
use tracing::info;

/// Everything needed to open a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Keys the first generation is sized for (default: 80)
    pub initial_capacity: usize,
    pub resize: ResizePolicy,
    pub migration: MigrationConfig,
    pub expiry: ExpiryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 80,
            resize: ResizePolicy::default(),
            migration: MigrationConfig::default(),
            expiry: ExpiryConfig::default(),
        }
    }
}

/// An open store: the frontier plus its sweeper and migrator.
#[derive(Debug)]
pub struct Store {
    frontier: Arc<StoreFrontier>,
    sweeper: ExpirySweeper,
    migrator: Migrator,
}

impl Store {
    /// Opens a store and starts its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: StoreConfig) -> Self {
        let frontier = Arc::new(StoreFrontier::new(
            config.initial_capacity,
            config.resize.clone(),
        ));
        info!(
            capacity = config.initial_capacity,
            topology = %frontier.topology(),
            "Store opened"
        );

        let sweeper = ExpirySweeper::start(Arc::clone(&frontier), config.expiry);
        let migrator = Migrator::start(Arc::clone(&frontier), config.migration);

        Self {
            frontier,
            sweeper,
            migrator,
        }
    }

    /// The shared frontier, for handing to connection handlers.
    pub fn frontier(&self) -> &Arc<StoreFrontier> {
        &self.frontier
    }

    /// Stops the background tasks.
    ///
    /// A migration in flight is left where it stopped; the returned
    /// frontier keeps serving from both generations.
    pub fn close(self) -> Arc<StoreFrontier> {
        self.migrator.stop();
        self.sweeper.stop();
        info!(keys = self.frontier.len(), "Store closed");
        Arc::clone(&self.frontier)
    }
}
