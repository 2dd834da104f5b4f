//! Background Expiry Sweeper
//!
//! Lazy expiry hides expired entries from reads, but an entry that is never
//! read again would stay in memory. This task periodically purges expired
//! entries from every shard of both generations.
//!
//! The sweep takes the same shard write locks as an ordinary delete, one
//! shard at a time, so it can run alongside a migration: an expired key is
//! removed from whichever generation holds it at that moment.
//!
//! ## Adaptive Frequency
//!
//! If many keys are expiring, the sweeper runs more frequently.
//! If few keys are expiring, it backs off to save CPU.

use crate::storage::StoreFrontier;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of stored keys expired in one sweep, speed up
    pub speedup_threshold: f64,

    /// If this fraction of stored keys expired in one sweep, slow down
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(store: Arc<StoreFrontier>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ExpiryConfig {
    /// Interval for the next sweep, given how many of the `stored` entries
    /// the last sweep removed.
    ///
    /// Halves towards `min_interval` when the expired share is above
    /// `speedup_threshold`, doubles towards `max_interval` when a sweep found
    /// nothing, and otherwise keeps `interval`. An empty store backs off.
    pub fn next_interval(&self, interval: Duration, expired: usize, stored: usize) -> Duration {
        if stored == 0 || expired == 0 {
            return (interval * 2).min(self.max_interval);
        }

        let rate = expired as f64 / stored as f64;
        if rate > self.speedup_threshold {
            (interval / 2).max(self.min_interval)
        } else if rate < self.slowdown_threshold {
            (interval * 2).min(self.max_interval)
        } else {
            interval
        }
    }
}

async fn sweeper_loop(
    store: Arc<StoreFrontier>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        // Exact counts: the advisory counters lag behind under migration.
        let (current, next) = store.generation_sizes();
        let stored = current + next.unwrap_or(0);
        let expired = store.purge_expired() as usize;

        let previous = interval;
        interval = config.next_interval(interval, expired, stored);

        if expired > 0 {
            debug!(
                expired = expired,
                stored = stored,
                migrating = next.is_some(),
                interval_ms = interval.as_millis(),
                "Expired entries purged"
            );
        } else if interval != previous {
            trace!(interval_ms = interval.as_millis(), "Nothing expired, backing off");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ResizePolicy, Topology};
    use bytes::Bytes;

    fn store() -> Arc<StoreFrontier> {
        Arc::new(StoreFrontier::with_topology(
            Topology::new(2, 4).unwrap(),
            1024,
            ResizePolicy::default(),
        ))
    }

    #[test]
    fn test_next_interval_adapts_to_expired_share() {
        let config = ExpiryConfig::default();
        let base = config.base_interval;

        // Half the entries expired: sweep sooner
        assert_eq!(config.next_interval(base, 50, 100), base / 2);
        // A few percent: keep the pace
        assert_eq!(config.next_interval(base, 5, 100), base);
        // Below the slowdown threshold but non-zero
        assert_eq!(config.next_interval(base, 1, 1000), base * 2);
        // Nothing expired, or nothing stored
        assert_eq!(config.next_interval(base, 0, 100), base * 2);
        assert_eq!(config.next_interval(base, 0, 0), base * 2);
    }

    #[test]
    fn test_next_interval_is_clamped() {
        let config = ExpiryConfig::default();

        assert_eq!(
            config.next_interval(config.min_interval, 100, 100),
            config.min_interval
        );
        assert_eq!(
            config.next_interval(config.max_interval, 0, 100),
            config.max_interval
        );
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let store = store();

        for i in 0..10 {
            store.set_with_ttl(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Duration::from_millis(50),
            );
        }
        store.set(Bytes::from("persistent"), Bytes::from("value"), None);

        assert_eq!(store.len(), 11);

        let config = ExpiryConfig {
            base_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let _sweeper = ExpirySweeper::start(Arc::clone(&store), config);

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Only the persistent key should remain
        assert_eq!(store.len(), 1);
        assert!(store.exists(b"persistent"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let store = store();

        let config = ExpiryConfig {
            base_interval: Duration::from_millis(10),
            ..Default::default()
        };

        {
            let _sweeper = ExpirySweeper::start(Arc::clone(&store), config);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        store.set_with_ttl(
            Bytes::from("key"),
            Bytes::from("value"),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nobody swept it, but reads still hide it
        assert_eq!(store.generation_sizes().0, 1);
        assert!(store.get(b"key").is_none());
    }

    #[tokio::test]
    async fn test_sweeper_runs_during_migration() {
        let store = store();

        for i in 0..100 {
            store.set_with_ttl(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Duration::from_millis(20),
            );
        }
        store.begin_resize().unwrap();
        store.migrate_step(30).unwrap();

        let config = ExpiryConfig {
            base_interval: Duration::from_millis(10),
            min_interval: Duration::from_millis(5),
            ..Default::default()
        };
        let _sweeper = ExpirySweeper::start(Arc::clone(&store), config);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.len(), 0);
        let (current, next) = store.generation_sizes();
        assert_eq!(current, 0);
        assert_eq!(next, Some(0));
    }
}
