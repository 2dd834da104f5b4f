//! Stored values and their expiry metadata.

use bytes::Bytes;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Represents a stored value with optional expiry time.
///
/// Expiry is an absolute wall-clock instant because clients send absolute
/// Unix timestamps over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<SystemTime>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry that expires at the given instant.
    pub fn expiring_at(value: Bytes, expires_at: SystemTime) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// Creates a new entry with TTL, relative to now.
    ///
    /// A TTL too large for the clock to represent never expires.
    pub fn with_ttl(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: SystemTime::now().checked_add(ttl),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Checks expiry against an explicit point in time.
    #[inline]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Returns the remaining TTL, or None if the entry never expires.
    ///
    /// An already expired entry reports zero.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at.map(|exp| {
            exp.duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }
}

/// Converts a Unix timestamp in seconds into an absolute instant.
///
/// Returns `None` when the timestamp lies beyond what `SystemTime` can hold.
pub fn unix_to_system_time(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
