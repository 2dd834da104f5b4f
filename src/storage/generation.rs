//! One fixed-topology instance of the shard hierarchy.
//!
//! A generation owns `managers x shards_per_manager` shards, pre-allocated
//! at construction. Its topology never changes; only entry contents and the
//! advisory `used_capacity` counter move after it is built. Growth is done
//! by building a larger generation and migrating into it (see
//! [`StoreFrontier`](crate::storage::StoreFrontier)).

use crate::storage::entry::Entry;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::manager::ShardManager;
use crate::storage::router;
use crate::storage::shard::Shard;
use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;

/// The shape of a generation: how many managers, and how many shards each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub managers: usize,
    pub shards_per_manager: usize,
}

impl Topology {
    /// Creates a topology, rejecting empty dimensions.
    pub fn new(managers: usize, shards_per_manager: usize) -> StoreResult<Self> {
        if managers == 0 || shards_per_manager == 0 {
            return Err(StoreError::InvalidTopology {
                managers,
                shards_per_manager,
            });
        }
        Ok(Self {
            managers,
            shards_per_manager,
        })
    }

    /// Total number of shards.
    pub fn shard_count(&self) -> usize {
        self.managers * self.shards_per_manager
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.managers, self.shards_per_manager)
    }
}

/// When to resize, and how big the next generation should be.
#[derive(Debug, Clone)]
pub struct ResizePolicy {
    /// Resize once `used / total` exceeds this fraction (default: 0.75)
    pub load_factor: f64,

    /// Capacity multiplier for the next generation (default: 2)
    pub growth_factor: usize,

    /// Shards in every manager of a newly sized generation (default: 16)
    pub shards_per_manager: usize,

    /// Keys one shard is expected to hold at full capacity (default: 64)
    pub keys_per_shard: usize,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            load_factor: 0.75,
            growth_factor: 2,
            shards_per_manager: 16,
            keys_per_shard: 64,
        }
    }
}

impl ResizePolicy {
    /// Rejects settings the sizing and trigger math cannot work with.
    ///
    /// `load_factor` must lie in `(0, 1]`; every count must be at least 1.
    pub fn validate(&self) -> StoreResult<()> {
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(StoreError::InvalidPolicy(format!(
                "load factor {} outside (0, 1]",
                self.load_factor
            )));
        }
        if self.growth_factor == 0 {
            return Err(StoreError::InvalidPolicy("growth factor must be at least 1".into()));
        }
        if self.shards_per_manager == 0 || self.keys_per_shard == 0 {
            return Err(StoreError::InvalidPolicy(
                "shards per manager and keys per shard must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Sizes a topology able to hold `capacity` keys.
    pub fn topology_for(&self, capacity: usize) -> Topology {
        let shards_per_manager = self.shards_per_manager.max(1);
        let per_manager = shards_per_manager * self.keys_per_shard.max(1);
        Topology {
            managers: capacity.div_ceil(per_manager).max(1),
            shards_per_manager,
        }
    }

    /// Capacity of the generation that replaces one of `capacity`.
    ///
    /// Always strictly larger than the input.
    pub fn grow(&self, capacity: usize) -> usize {
        capacity
            .saturating_mul(self.growth_factor)
            .max(capacity.saturating_add(1))
    }
}

/// One complete shard hierarchy (the "keeper" of its managers).
#[derive(Debug)]
pub struct Generation {
    id: u64,
    topology: Topology,
    managers: Vec<ShardManager>,

    /// Upper bound on stored keys before a resize is warranted
    total_capacity: usize,

    /// Approximate live key count; advisory only
    used_capacity: AtomicUsize,

    /// Set on the outgoing generation while a migration drains it
    resizing: AtomicBool,
}

impl Generation {
    /// Builds a generation sized for `expected_capacity` keys.
    pub fn new(id: u64, expected_capacity: usize, policy: &ResizePolicy) -> Self {
        Self::with_topology(id, policy.topology_for(expected_capacity), expected_capacity)
    }

    /// Builds a generation with an explicit topology.
    pub fn with_topology(id: u64, topology: Topology, total_capacity: usize) -> Self {
        let managers = (0..topology.managers)
            .map(|index| ShardManager::new(index, topology.shards_per_manager))
            .collect();

        Self {
            id,
            topology,
            managers,
            total_capacity: total_capacity.max(1),
            used_capacity: AtomicUsize::new(0),
            resizing: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn total_capacity(&self) -> usize {
        self.total_capacity
    }

    pub fn used_capacity(&self) -> usize {
        self.used_capacity.load(Ordering::Relaxed)
    }

    pub fn managers(&self) -> &[ShardManager] {
        &self.managers
    }

    /// Returns the manager at `manager_index`.
    pub fn manager_for(&self, manager_index: usize) -> StoreResult<&ShardManager> {
        self.managers.get(manager_index).ok_or(StoreError::OutOfRange {
            what: "manager",
            index: manager_index,
            len: self.managers.len(),
        })
    }

    /// The `(manager, shard)` pair a key routes to in this generation.
    #[inline]
    pub fn locate(&self, key: &[u8]) -> (usize, usize) {
        router::route(key, self.topology.managers, self.topology.shards_per_manager)
    }

    /// Resolves the shard owning `key`.
    ///
    /// # Panics
    ///
    /// Panics if the router produces an index outside this topology. That
    /// means the routing table is corrupt and no answer would be correct.
    #[inline]
    pub fn route(&self, key: &[u8]) -> &Shard {
        let (manager, shard) = self.locate(key);
        &self.managers[manager].shards()[shard]
    }

    /// Gets the live entry for a key.
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        self.route(key).get(key)
    }

    /// Inserts or overwrites an entry. Returns `true` for a new key.
    pub fn set(&self, key: Bytes, entry: Entry) -> bool {
        let is_new = self.route(&key).set(key, entry);
        if is_new {
            self.note_inserted(1);
        }
        is_new
    }

    /// Removes a key. Returns `true` if it was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        let removed = self.route(key).delete(key);
        if removed {
            self.note_removed(1);
        }
        removed
    }

    #[inline]
    pub(crate) fn note_inserted(&self, count: usize) {
        self.used_capacity.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn note_removed(&self, count: usize) {
        if count == 0 {
            return;
        }
        let _ = self
            .used_capacity
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(count))
            });
    }

    /// True when the load exceeds `load_factor`.
    pub fn should_resize(&self, load_factor: f64) -> bool {
        self.used_capacity() as f64 / self.total_capacity as f64 > load_factor
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing.load(Ordering::Acquire)
    }

    pub(crate) fn set_resizing(&self, resizing: bool) {
        self.resizing.store(resizing, Ordering::Release);
    }

    /// Exact entry count, walking every shard. Expired entries not yet
    /// swept are included.
    pub fn len(&self) -> usize {
        self.managers.iter().map(ShardManager::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.iter().all(ShardManager::is_empty)
    }

    /// Removes expired entries from every shard, one shard lock at a time.
    pub fn purge_expired(&self, now: SystemTime) -> usize {
        let removed: usize = self
            .managers
            .iter()
            .flat_map(|manager| manager.shards())
            .map(|shard| shard.purge_expired(now))
            .sum();
        self.note_removed(removed);
        removed
    }
}
