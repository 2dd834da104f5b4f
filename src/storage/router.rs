//! Key routing across a two-level shard topology.
//!
//! A key is hashed once and the hash is mapped onto the flattened
//! `managers * shards_per_manager` space, then split back into a
//! `(manager, shard)` pair. Every pair in the space is reachable and
//! equally likely, so lock contention spreads evenly over all shards.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Hashes a key.
///
/// `DefaultHasher::new()` uses fixed keys, so the result is stable for the
/// lifetime of the process. Routing never needs to survive a restart.
#[inline]
pub fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Maps a key to a `(manager_index, shard_index)` pair.
///
/// # Panics
///
/// Panics if either count is zero. Topologies are validated on
/// construction, so that is a programming error.
#[inline]
pub fn route(key: &[u8], managers: usize, shards_per_manager: usize) -> (usize, usize) {
    assert!(
        managers > 0 && shards_per_manager > 0,
        "routing over an empty topology"
    );
    let slots = (managers * shards_per_manager) as u64;
    let slot = (hash_key(key) % slots) as usize;
    (slot / shards_per_manager, slot % shards_per_manager)
}
