//! Two-generation store with online resizing.
//!
//! ## States
//!
//! ```text
//!             begin_resize()               cursor reaches end,
//!   ┌────────┐ ───────────────> ┌───────────┐  current empty   ┌────────┐
//!   │ Stable │                  │ Migrating │ ───────────────> │ Stable │
//!   └────────┘                  └───────────┘   (promote next) └────────┘
//!    current                     current + next                  next
//! ```
//!
//! ## Locking
//!
//! 1. `generations` (RwLock): read side held for the whole of every data
//!    operation and migration step; write side only to install `next` or to
//!    promote it. No operation straddles a generation swap.
//! 2. Shard locks. While migrating, an operation on key `k` that touches
//!    both generations locks `current.route(k)` before `next.route(k)`. The
//!    migration step uses the same order, so moving a key is atomic with
//!    respect to that key's readers and writers, and no cycle can form.
//!
//! ## Invariants while migrating
//!
//! - Reads check `next` first, then `current`.
//! - Writes land in `next`; any copy left in `current` is removed in the
//!   same critical section, so a key never has two live values.
//! - The migration step writes an entry into `next` before removing it
//!   from `current`.
//! - Deletes remove from both generations.

use crate::storage::entry::Entry;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::generation::{Generation, ResizePolicy, Topology};
use crate::storage::shard::{live_entry, Shard};
use bytes::Bytes;
use std::collections::hash_map::Entry as MapEntry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Whether a resize is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeState {
    /// Only `current` is live
    Stable,
    /// `current` is being drained into `next`
    Migrating,
}

/// Outcome of one bounded migration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// No resize in flight
    Idle,
    /// Entries were moved; more remain
    Progress { moved: usize, dropped: usize },
    /// The old generation is drained and `next` is now `current`
    Completed {
        moved: usize,
        dropped: usize,
        generation: u64,
    },
}

#[derive(Debug)]
struct Generations {
    current: Generation,
    next: Option<Generation>,
}

/// Position of the migration within the generation being drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MigrationCursor {
    /// Id of the generation being filled; a mismatch means a stale cursor
    target: u64,
    manager: usize,
    shard: usize,
}

impl MigrationCursor {
    fn for_target(target: u64) -> Self {
        Self {
            target,
            manager: 0,
            shard: 0,
        }
    }

    fn advance(&mut self, topology: Topology) {
        self.shard += 1;
        if self.shard >= topology.shards_per_manager {
            self.shard = 0;
            self.manager += 1;
        }
    }

    fn finished(&self, topology: Topology) -> bool {
        self.manager >= topology.managers
    }
}

/// Frontier statistics.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Approximate number of keys across both generations
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Expired entries removed by sweeps or dropped during migration
    pub expired: u64,
    /// Entries moved from one generation to the next
    pub migrated: u64,
}

/// The process-wide store: a `current` generation plus, while resizing,
/// a larger `next` one.
///
/// Share it behind an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use gridkv::storage::{ResizePolicy, StoreFrontier};
/// use bytes::Bytes;
///
/// let store = StoreFrontier::new(80, ResizePolicy::default());
/// store.set(Bytes::from("name"), Bytes::from("gridkv"), None);
/// assert_eq!(store.get(b"name"), Some(Bytes::from("gridkv")));
///
/// store.begin_resize().unwrap();
/// store.migrate_all(64).unwrap();
/// assert_eq!(store.get(b"name"), Some(Bytes::from("gridkv")));
/// ```
pub struct StoreFrontier {
    generations: RwLock<Generations>,
    cursor: Mutex<MigrationCursor>,
    policy: ResizePolicy,
    next_generation_id: AtomicU64,

    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
    migrated_count: AtomicU64,
}

impl std::fmt::Debug for StoreFrontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFrontier")
            .field("state", &self.state())
            .field("topology", &self.topology())
            .field("next_topology", &self.next_topology())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl StoreFrontier {
    /// Creates a store whose first generation is sized for `initial_capacity`.
    pub fn new(initial_capacity: usize, policy: ResizePolicy) -> Self {
        let current = Generation::new(0, initial_capacity, &policy);
        Self::from_generation(current, policy)
    }

    /// Creates a store with an explicit first topology.
    pub fn with_topology(topology: Topology, total_capacity: usize, policy: ResizePolicy) -> Self {
        let current = Generation::with_topology(0, topology, total_capacity);
        Self::from_generation(current, policy)
    }

    fn from_generation(current: Generation, policy: ResizePolicy) -> Self {
        Self {
            cursor: Mutex::new(MigrationCursor::for_target(current.id())),
            next_generation_id: AtomicU64::new(current.id() + 1),
            generations: RwLock::new(Generations {
                current,
                next: None,
            }),
            policy,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
            migrated_count: AtomicU64::new(0),
        }
    }

    fn read_generations(&self) -> RwLockReadGuard<'_, Generations> {
        self.generations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_generations(&self) -> RwLockWriteGuard<'_, Generations> {
        self.generations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cursor(&self) -> MutexGuard<'_, MigrationCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn policy(&self) -> &ResizePolicy {
        &self.policy
    }

    // ========================================================================
    // DATA OPERATIONS
    // ========================================================================

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key).map(|entry| entry.value)
    }

    /// Gets the full entry for a key (including expiry).
    pub fn get_entry(&self, key: &[u8]) -> Option<Entry> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key)
    }

    fn lookup(&self, key: &[u8]) -> Option<Entry> {
        let gens = self.read_generations();

        match &gens.next {
            None => gens.current.route(key).get(key),
            Some(next) => {
                let now = SystemTime::now();
                // Holding the current shard pins the key against a migration
                // step while both generations are searched.
                let current = gens.current.route(key).read();
                let fresh = next.route(key).read();
                live_entry(&fresh, key, now)
                    .or_else(|| live_entry(&current, key, now))
                    .cloned()
            }
        }
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }

    /// Gets the remaining TTL for a key in seconds.
    ///
    /// - `Some(seconds)` if the key exists and has an expiry
    /// - `Some(-1)` if the key exists but has no expiry
    /// - `None` if the key doesn't exist
    pub fn ttl(&self, key: &[u8]) -> Option<i64> {
        self.lookup(key)
            .map(|entry| entry.ttl().map(|d| d.as_secs() as i64).unwrap_or(-1))
    }

    /// Sets a key, optionally expiring at an absolute instant.
    ///
    /// An `expires_at` at or before now stores an entry that is already
    /// invisible to reads.
    ///
    /// Returns `true` if a new key was created.
    pub fn set(&self, key: Bytes, value: Bytes, expires_at: Option<SystemTime>) -> bool {
        self.set_entry(key, Entry { value, expires_at })
    }

    /// Sets a key with a TTL relative to now.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) -> bool {
        self.set_entry(key, Entry::with_ttl(value, ttl))
    }

    fn set_entry(&self, key: Bytes, entry: Entry) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        let gens = self.read_generations();

        let Some(next) = &gens.next else {
            return gens.current.set(key, entry);
        };

        let mut current = gens.current.route(&key).write();
        let is_new = next
            .route(&key)
            .write()
            .insert(key.clone(), entry)
            .is_none();
        let had_stale = current.remove(&key).is_some();
        drop(current);

        if is_new {
            next.note_inserted(1);
        }
        if had_stale {
            gens.current.note_removed(1);
        }
        is_new && !had_stale
    }

    /// Deletes a key from the store.
    ///
    /// Returns `true` if the key was deleted, `false` if it didn't exist.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        let gens = self.read_generations();

        let Some(next) = &gens.next else {
            return gens.current.delete(key);
        };

        let mut current = gens.current.route(key).write();
        let mut fresh = next.route(key).write();
        let in_next = fresh.remove(key).is_some();
        let in_current = current.remove(key).is_some();
        drop(fresh);
        drop(current);

        if in_next {
            next.note_removed(1);
        }
        if in_current {
            gens.current.note_removed(1);
        }
        in_next || in_current
    }

    /// Returns the approximate number of keys in the store.
    pub fn len(&self) -> u64 {
        let gens = self.read_generations();
        let next = gens.next.as_ref().map(Generation::used_capacity).unwrap_or(0);
        (gens.current.used_capacity() + next) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact entry counts of `current` and, while migrating, `next`.
    ///
    /// Walks every shard; meant for diagnostics, not the request path.
    pub fn generation_sizes(&self) -> (usize, Option<usize>) {
        let gens = self.read_generations();
        (gens.current.len(), gens.next.as_ref().map(Generation::len))
    }

    /// Removes expired entries from both generations.
    ///
    /// Called by the background expiry sweeper.
    pub fn purge_expired(&self) -> u64 {
        let now = SystemTime::now();
        let gens = self.read_generations();

        let mut cleaned = gens.current.purge_expired(now);
        if let Some(next) = &gens.next {
            cleaned += next.purge_expired(now);
        }

        let cleaned = cleaned as u64;
        if cleaned > 0 {
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
        }
        cleaned
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
            migrated: self.migrated_count.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // RESIZE & MIGRATION
    // ========================================================================

    pub fn state(&self) -> ResizeState {
        if self.read_generations().next.is_some() {
            ResizeState::Migrating
        } else {
            ResizeState::Stable
        }
    }

    /// Topology of the `current` generation.
    pub fn topology(&self) -> Topology {
        self.read_generations().current.topology()
    }

    /// Topology of the `next` generation, if a resize is in flight.
    pub fn next_topology(&self) -> Option<Topology> {
        self.read_generations().next.as_ref().map(Generation::topology)
    }

    /// True when no resize is running and `current` is past the load factor.
    pub fn needs_resize(&self) -> bool {
        let gens = self.read_generations();
        gens.next.is_none() && gens.current.should_resize(self.policy.load_factor)
    }

    /// Starts a resize into a generation grown by the policy.
    ///
    /// Returns the new generation's topology, or
    /// [`StoreError::ResizeInProgress`] if a migration is already running.
    pub fn begin_resize(&self) -> StoreResult<Topology> {
        let mut gens = self.write_generations();
        if gens.next.is_some() {
            return Err(StoreError::ResizeInProgress);
        }

        let capacity = self.policy.grow(gens.current.total_capacity());
        let next = Generation::new(self.allocate_generation_id(), capacity, &self.policy);
        Ok(self.install_next(&mut gens, next))
    }

    /// Starts a resize into an explicit topology.
    pub fn resize_to(&self, topology: Topology) -> StoreResult<()> {
        let topology = Topology::new(topology.managers, topology.shards_per_manager)?;
        let mut gens = self.write_generations();
        if gens.next.is_some() {
            return Err(StoreError::ResizeInProgress);
        }

        let capacity = topology.shard_count() * self.policy.keys_per_shard.max(1);
        let next = Generation::with_topology(self.allocate_generation_id(), topology, capacity);
        self.install_next(&mut gens, next);
        Ok(())
    }

    fn allocate_generation_id(&self) -> u64 {
        self.next_generation_id.fetch_add(1, Ordering::Relaxed)
    }

    fn install_next(&self, gens: &mut Generations, next: Generation) -> Topology {
        let topology = next.topology();
        info!(
            from = %gens.current.topology(),
            to = %topology,
            used = gens.current.used_capacity(),
            capacity = next.total_capacity(),
            generation = next.id(),
            "Resize started"
        );

        gens.current.set_resizing(true);
        *self.lock_cursor() = MigrationCursor::for_target(next.id());
        gens.next = Some(next);
        topology
    }

    /// Moves at most `batch` entries from `current` into `next`.
    ///
    /// Entries found expired are dropped instead of moved and count toward
    /// the batch. The step runs to completion once started; stopping the
    /// migration between steps leaves a valid state that the next step
    /// resumes from the cursor.
    pub fn migrate_step(&self, batch: usize) -> StoreResult<MigrationStep> {
        let batch = batch.max(1);
        let (moved, dropped) = {
            let gens = self.read_generations();
            let Some(next) = &gens.next else {
                return Ok(MigrationStep::Idle);
            };
            let current = &gens.current;
            let topology = current.topology();

            let mut cursor = self.lock_cursor();
            if cursor.target != next.id() {
                *cursor = MigrationCursor::for_target(next.id());
            }

            let (mut moved, mut dropped) = (0, 0);
            while moved + dropped < batch && !cursor.finished(topology) {
                let shard = current
                    .manager_for(cursor.manager)?
                    .shard_for(cursor.shard)?;
                let (m, d, drained) = drain_shard(shard, next, batch - moved - dropped);
                moved += m;
                dropped += d;
                if drained {
                    cursor.advance(topology);
                }
            }

            current.note_removed(moved + dropped);
            self.migrated_count
                .fetch_add(moved as u64, Ordering::Relaxed);
            self.expired_count
                .fetch_add(dropped as u64, Ordering::Relaxed);

            if !cursor.finished(topology) {
                debug!(
                    moved = moved,
                    dropped = dropped,
                    manager = cursor.manager,
                    shard = cursor.shard,
                    "Migration step"
                );
                return Ok(MigrationStep::Progress { moved, dropped });
            }
            (moved, dropped)
        };

        self.promote(moved, dropped)
    }

    /// Swaps `next` in as `current` once the old generation is empty.
    fn promote(&self, moved: usize, dropped: usize) -> StoreResult<MigrationStep> {
        let mut gens = self.write_generations();
        let Some(next_id) = gens.next.as_ref().map(Generation::id) else {
            return Ok(MigrationStep::Idle);
        };

        if !gens.current.is_empty() {
            // Writes never land in `current` while migrating, so this only
            // happens if the cursor was reset underneath us. Start over.
            warn!(
                remaining = gens.current.len(),
                "Old generation not empty at end of migration, rescanning"
            );
            *self.lock_cursor() = MigrationCursor::for_target(next_id);
            return Ok(MigrationStep::Progress { moved, dropped });
        }

        if let Some(next) = gens.next.take() {
            let retired = std::mem::replace(&mut gens.current, next);
            info!(
                retired = retired.id(),
                generation = gens.current.id(),
                topology = %gens.current.topology(),
                keys = gens.current.used_capacity(),
                "Migration complete, generation promoted"
            );
        }

        Ok(MigrationStep::Completed {
            moved,
            dropped,
            generation: next_id,
        })
    }

    /// Runs migration steps until the resize completes.
    ///
    /// Returns the number of entries moved. Does nothing when stable.
    pub fn migrate_all(&self, batch: usize) -> StoreResult<usize> {
        let mut total = 0;
        loop {
            match self.migrate_step(batch)? {
                MigrationStep::Idle => return Ok(total),
                MigrationStep::Progress { moved, .. } => total += moved,
                MigrationStep::Completed { moved, .. } => return Ok(total + moved),
            }
        }
    }
}

/// Moves up to `budget` entries from `source` into their shards in `next`.
///
/// Returns `(moved, dropped, drained)`. The source shard stays write-locked
/// for the whole batch; each destination shard is locked per entry, after
/// the source, matching the lock order of the data operations.
fn drain_shard(source: &Shard, next: &Generation, budget: usize) -> (usize, usize, bool) {
    let now = SystemTime::now();
    let mut data = source.write();
    let keys: Vec<Bytes> = data.keys().take(budget).cloned().collect();

    let (mut moved, mut dropped) = (0, 0);
    for key in keys {
        let Some(entry) = data.get(&key).cloned() else {
            continue;
        };

        if entry.is_expired_at(now) {
            data.remove(&key);
            dropped += 1;
            continue;
        }

        // Commit into `next` first. A value already there is newer and wins.
        if let MapEntry::Vacant(slot) = next.route(&key).write().entry(key.clone()) {
            slot.insert(entry);
            next.note_inserted(1);
        }
        data.remove(&key);
        moved += 1;
    }

    (moved, dropped, data.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn small_store() -> StoreFrontier {
        StoreFrontier::with_topology(Topology::new(2, 2).unwrap(), 16, ResizePolicy::default())
    }

    #[test]
    fn test_set_and_get() {
        let store = small_store();

        assert!(store.set(Bytes::from("key"), Bytes::from("value"), None));
        assert_eq!(store.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = small_store();
        assert_eq!(store.get(b"nonexistent"), None);
    }

    #[test]
    fn test_delete() {
        let store = small_store();

        store.set(Bytes::from("key"), Bytes::from("value"), None);
        assert!(store.delete(b"key"));
        assert_eq!(store.get(b"key"), None);
        assert!(!store.delete(b"key")); // Already deleted
    }

    #[test]
    fn test_zero_ttl_is_immediately_gone() {
        let store = small_store();

        store.set_with_ttl(Bytes::from("x"), Bytes::from("1"), Duration::ZERO);
        assert_eq!(store.get(b"x"), None);
        assert!(!store.exists(b"x"));
    }

    #[test]
    fn test_past_absolute_expiry() {
        let store = small_store();
        let past = SystemTime::now() - Duration::from_secs(10);

        store.set(Bytes::from("old"), Bytes::from("v"), Some(past));
        assert_eq!(store.get(b"old"), None);
    }

    #[test]
    fn test_ttl() {
        let store = small_store();

        assert_eq!(store.ttl(b"nonexistent"), None);

        store.set(Bytes::from("persistent"), Bytes::from("v"), None);
        assert_eq!(store.ttl(b"persistent"), Some(-1));

        store.set_with_ttl(Bytes::from("expiring"), Bytes::from("v"), Duration::from_secs(100));
        let ttl = store.ttl(b"expiring").unwrap();
        assert!(ttl > 0 && ttl <= 100);
    }

    /// Finds keys covering every (manager, shard) pair of a topology.
    fn keys_covering(topology: Topology) -> Vec<String> {
        let sizing = Generation::with_topology(0, topology, 1);
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut i = 0;
        while seen.len() < topology.shard_count() {
            let key = format!("key-{}", i);
            if seen.insert(sizing.locate(key.as_bytes())) {
                keys.push(key);
            }
            i += 1;
        }
        keys
    }

    #[test]
    fn test_resize_two_by_two_to_four_by_four() {
        let store = small_store();
        let keys = keys_covering(store.topology());
        assert_eq!(keys.len(), 4);

        for key in &keys {
            store.set(Bytes::from(key.clone()), Bytes::from(format!("v-{}", key)), None);
        }
        for key in &keys {
            assert_eq!(store.get(key.as_bytes()), Some(Bytes::from(format!("v-{}", key))));
        }

        store.resize_to(Topology::new(4, 4).unwrap()).unwrap();
        assert_eq!(store.state(), ResizeState::Migrating);
        assert_eq!(store.migrate_all(1).unwrap(), 4);

        assert_eq!(store.state(), ResizeState::Stable);
        assert_eq!(store.topology(), Topology::new(4, 4).unwrap());
        for key in &keys {
            assert_eq!(store.get(key.as_bytes()), Some(Bytes::from(format!("v-{}", key))));
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_reads_during_migration_see_every_key() {
        let store = small_store();
        for i in 0..50 {
            store.set(Bytes::from(format!("k{}", i)), Bytes::from(format!("{}", i)), None);
        }

        store.begin_resize().unwrap();
        loop {
            for i in 0..50 {
                assert_eq!(
                    store.get(format!("k{}", i).as_bytes()),
                    Some(Bytes::from(format!("{}", i)))
                );
            }
            let (current, next) = store.generation_sizes();
            if let Some(next) = next {
                assert_eq!(current + next, 50);
            }
            if let MigrationStep::Completed { .. } = store.migrate_step(3).unwrap() {
                break;
            }
        }

        assert_eq!(store.generation_sizes(), (50, None));
    }

    #[test]
    fn test_writes_during_migration_win() {
        let store = small_store();
        for i in 0..20 {
            store.set(Bytes::from(format!("k{}", i)), Bytes::from("old"), None);
        }

        store.begin_resize().unwrap();
        store.migrate_step(5).unwrap();

        // Overwrite everything mid-migration, migrated or not
        for i in 0..20 {
            assert!(!store.set(Bytes::from(format!("k{}", i)), Bytes::from("new"), None));
        }
        store.migrate_all(5).unwrap();

        for i in 0..20 {
            assert_eq!(store.get(format!("k{}", i).as_bytes()), Some(Bytes::from("new")));
        }
        assert_eq!(store.generation_sizes(), (20, None));
    }

    #[test]
    fn test_delete_during_migration_does_not_resurrect() {
        let store = small_store();
        for i in 0..20 {
            store.set(Bytes::from(format!("k{}", i)), Bytes::from("v"), None);
        }

        store.begin_resize().unwrap();
        store.migrate_step(7).unwrap();

        for i in 0..20 {
            assert!(store.delete(format!("k{}", i).as_bytes()));
        }
        store.migrate_all(7).unwrap();

        for i in 0..20 {
            assert_eq!(store.get(format!("k{}", i).as_bytes()), None);
        }
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_new_key_during_migration_lands_in_next() {
        let store = small_store();
        store.set(Bytes::from("a"), Bytes::from("1"), None);
        store.begin_resize().unwrap();

        assert!(store.set(Bytes::from("fresh"), Bytes::from("2"), None));
        let (current, next) = store.generation_sizes();
        assert_eq!(current, 1);
        assert_eq!(next, Some(1));
    }

    #[test]
    fn test_begin_resize_twice() {
        let store = small_store();
        let topology = store.begin_resize().unwrap();
        assert_eq!(store.next_topology(), Some(topology));
        assert_eq!(store.begin_resize(), Err(StoreError::ResizeInProgress));
        assert_eq!(
            store.resize_to(Topology::new(8, 8).unwrap()),
            Err(StoreError::ResizeInProgress)
        );
    }

    #[test]
    fn test_resize_to_rejects_empty_topology() {
        let store = small_store();
        assert!(matches!(
            store.resize_to(Topology {
                managers: 0,
                shards_per_manager: 4
            }),
            Err(StoreError::InvalidTopology { .. })
        ));
        assert_eq!(store.state(), ResizeState::Stable);
    }

    #[test]
    fn test_migrate_step_when_stable() {
        let store = small_store();
        assert_eq!(store.migrate_step(10).unwrap(), MigrationStep::Idle);
        assert_eq!(store.migrate_all(10).unwrap(), 0);
    }

    #[test]
    fn test_migrate_step_respects_batch() {
        let store = small_store();
        for i in 0..10 {
            store.set(Bytes::from(format!("k{}", i)), Bytes::from("v"), None);
        }
        store.begin_resize().unwrap();

        match store.migrate_step(1).unwrap() {
            MigrationStep::Progress { moved, dropped } => assert_eq!(moved + dropped, 1),
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_empty_store_migration_completes() {
        let store = small_store();
        store.begin_resize().unwrap();
        assert!(matches!(
            store.migrate_step(1).unwrap(),
            MigrationStep::Completed { moved: 0, .. }
        ));
        assert_eq!(store.state(), ResizeState::Stable);
    }

    #[test]
    fn test_expired_entries_dropped_during_migration() {
        let store = small_store();
        store.set_with_ttl(Bytes::from("gone"), Bytes::from("v"), Duration::ZERO);
        store.set(Bytes::from("kept"), Bytes::from("v"), None);

        store.begin_resize().unwrap();
        assert_eq!(store.migrate_all(10).unwrap(), 1);
        assert_eq!(store.generation_sizes(), (1, None));
        assert_eq!(store.stats().expired, 1);
        assert_eq!(store.stats().migrated, 1);
    }

    #[test]
    fn test_needs_resize_and_growth() {
        let policy = ResizePolicy {
            load_factor: 0.5,
            ..Default::default()
        };
        let store = StoreFrontier::new(8, policy);

        for i in 0..4 {
            store.set(Bytes::from(format!("k{}", i)), Bytes::from("v"), None);
        }
        assert!(!store.needs_resize());

        store.set(Bytes::from("k4"), Bytes::from("v"), None);
        assert!(store.needs_resize());

        store.begin_resize().unwrap();
        assert!(!store.needs_resize());
        store.migrate_all(100).unwrap();
        assert!(!store.needs_resize());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_purge_expired_covers_both_generations() {
        let store = small_store();
        store.set_with_ttl(Bytes::from("a"), Bytes::from("v"), Duration::ZERO);
        store.begin_resize().unwrap();
        store.set_with_ttl(Bytes::from("b"), Bytes::from("v"), Duration::ZERO);
        store.set(Bytes::from("c"), Bytes::from("v"), None);

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(small_store());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    store.set(Bytes::from(key.clone()), Bytes::from("value"), None);
                    store.get(key.as_bytes());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn test_concurrent_traffic_during_migration() {
        let store = Arc::new(small_store());
        for i in 0..500 {
            store.set(Bytes::from(format!("seed-{}", i)), Bytes::from(format!("{}", i)), None);
        }
        store.begin_resize().unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let mut handles = vec![];

        // Readers: seeded keys must never disappear or change
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            handles.push(thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    for i in 0..500 {
                        assert_eq!(
                            store.get(format!("seed-{}", i).as_bytes()),
                            Some(Bytes::from(format!("{}", i)))
                        );
                    }
                }
            }));
        }

        // Writers: distinct keys, last write per key must survive
        let mut writers = vec![];
        for t in 0..4 {
            let store = Arc::clone(&store);
            writers.push(thread::spawn(move || {
                for round in 0..3 {
                    for j in 0..200 {
                        store.set(
                            Bytes::from(format!("w-{}-{}", t, j)),
                            Bytes::from(format!("{}", round)),
                            None,
                        );
                    }
                }
            }));
        }

        let migrator = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                while store.migrate_step(16).unwrap() != MigrationStep::Idle {
                    thread::yield_now();
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        migrator.join().unwrap();
        done.store(true, Ordering::Relaxed);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.state(), ResizeState::Stable);
        for t in 0..4 {
            for j in 0..200 {
                assert_eq!(
                    store.get(format!("w-{}-{}", t, j).as_bytes()),
                    Some(Bytes::from("2"))
                );
            }
        }
        assert_eq!(store.generation_sizes(), (1300, None));
    }
}
