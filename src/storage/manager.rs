//! Fixed-size groups of shards.

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::shard::Shard;

/// A structural grouping of shards, the unit of coarse routing.
///
/// The shard list is built once and never changes, so shared borrows are
/// enough to address it; only the shards themselves carry locks.
#[derive(Debug)]
pub struct ShardManager {
    /// Position in the owning generation's manager list
    index: usize,
    shards: Vec<Shard>,
}

impl ShardManager {
    /// Creates a manager with `shard_count` empty shards.
    pub fn new(index: usize, shard_count: usize) -> Self {
        Self {
            index,
            shards: (0..shard_count).map(|_| Shard::new()).collect(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the shard at `shard_index`.
    pub fn shard_for(&self, shard_index: usize) -> StoreResult<&Shard> {
        self.shards.get(shard_index).ok_or(StoreError::OutOfRange {
            what: "shard",
            index: shard_index,
            len: self.shards.len(),
        })
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of entries across all shards, expired ones included.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }
}
