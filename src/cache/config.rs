//! Cache configuration.

use std::time::Duration;

/// Configuration for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Entries are evicted this long after insertion.
    pub ttl: Option<Duration>,

    /// Entries are evicted if not read within this duration.
    pub tti: Option<Duration>,
}

impl CacheConfig {
    /// Short-lived lookups for records that the service itself writes.
    /// Every write through the owning repository refreshes the entry, so
    /// the TTL only bounds staleness from writers in other processes.
    pub fn lookup() -> Self {
        Self {
            max_capacity: 5_000,
            ttl: Some(Duration::from_secs(60)),
            tti: Some(Duration::from_secs(30)),
        }
    }
}
