//! Errors raised by the storage core.
//!
//! A missing or expired key is not an error: lookups return `Option`.
//! What remains are routing-table violations and resize bookkeeping.

use thiserror::Error;

/// Errors that can occur inside the storage core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A manager or shard index fell outside a generation's topology.
    ///
    /// With a correct router this never happens; seeing it means the
    /// routing table is corrupt.
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A resize was requested while a migration is still running.
    #[error("resize already in progress")]
    ResizeInProgress,

    /// A resize policy that could never trigger, or always would.
    #[error("invalid resize policy: {0}")]
    InvalidPolicy(String),

    /// A topology with zero managers or zero shards per manager.
    #[error("invalid topology: {managers} managers x {shards_per_manager} shards")]
    InvalidTopology {
        managers: usize,
        shards_per_manager: usize,
    },
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
