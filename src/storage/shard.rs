//! The smallest independently lockable partition of the keyspace.

use crate::storage::entry::Entry;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// The map a shard guards.
pub(crate) type ShardMap = HashMap<Bytes, Entry>;

/// A single shard containing a portion of the key-value pairs.
///
/// Shards never grow in number; capacity growth happens by building a new
/// generation with more of them.
#[derive(Debug, Default)]
pub struct Shard {
    data: RwLock<ShardMap>,
}

impl Shard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access to the map. A poisoned lock is recovered: every
    /// mutation is a single map operation, so no half-written entry exists.
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ShardMap> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the map.
    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ShardMap> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets a copy of the live entry for a key.
    ///
    /// An entry past its expiry is reported as absent even if the sweeper
    /// has not removed it yet.
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        let data = self.read();
        live_entry(&data, key, SystemTime::now()).cloned()
    }

    /// Inserts or overwrites an entry.
    ///
    /// Returns `true` if the key was not present before.
    pub fn set(&self, key: Bytes, entry: Entry) -> bool {
        self.write().insert(key, entry).is_none()
    }

    /// Removes a key. Returns `true` if it was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.write().remove(key).is_some()
    }

    /// Returns the keys currently held, including expired ones not yet swept.
    pub fn snapshot_keys(&self) -> Vec<Bytes> {
        self.read().keys().cloned().collect()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drops every entry that has expired by `now`. Returns the number removed.
    pub fn purge_expired(&self, now: SystemTime) -> usize {
        let mut data = self.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        before - data.len()
    }
}

/// Looks up a key in an already locked map, skipping expired entries.
#[inline]
pub(crate) fn live_entry<'a>(map: &'a ShardMap, key: &[u8], now: SystemTime) -> Option<&'a Entry> {
    map.get(key).filter(|entry| !entry.is_expired_at(now))
}
