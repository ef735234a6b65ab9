//! Operation metrics for chatvault

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for store operations
#[derive(Debug)]
pub struct MetricsCollector {
    // Write path
    /// Number of appended rows
    append_count: AtomicUsize,
    /// Number of shard partitions created
    shards_created: AtomicUsize,
    /// Number of ensure-shard calls answered from the existence cache
    existence_cache_hits: AtomicUsize,
    /// Number of ensure-shard calls that went to the backend catalog
    existence_cache_misses: AtomicUsize,

    // Quota path
    /// Number of quota reads served from the cached snapshot
    quota_cache_hits: AtomicUsize,
    /// Number of quota reads that contacted the remote source
    quota_cache_misses: AtomicUsize,
    /// Number of failed remote usage fetches
    quota_fetch_failures: AtomicUsize,

    /// Start time of the collector
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            append_count: AtomicUsize::new(0),
            shards_created: AtomicUsize::new(0),
            existence_cache_hits: AtomicUsize::new(0),
            existence_cache_misses: AtomicUsize::new(0),
            quota_cache_hits: AtomicUsize::new(0),
            quota_cache_misses: AtomicUsize::new(0),
            quota_fetch_failures: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_appends(&self) {
        self.append_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_shards_created(&self) {
        self.shards_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_existence_cache_hit(&self) {
        self.existence_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_existence_cache_miss(&self) {
        self.existence_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quota_cache_hit(&self) {
        self.quota_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quota_cache_miss(&self) {
        self.quota_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quota_fetch_failure(&self) {
        self.quota_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Time elapsed since the collector was created
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            append_count: self.append_count.load(Ordering::Relaxed),
            shards_created: self.shards_created.load(Ordering::Relaxed),
            existence_cache_hits: self.existence_cache_hits.load(Ordering::Relaxed),
            existence_cache_misses: self.existence_cache_misses.load(Ordering::Relaxed),
            quota_cache_hits: self.quota_cache_hits.load(Ordering::Relaxed),
            quota_cache_misses: self.quota_cache_misses.load(Ordering::Relaxed),
            quota_fetch_failures: self.quota_fetch_failures.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }
}

/// Point-in-time view of the collector's counters
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub append_count: usize,
    pub shards_created: usize,
    pub existence_cache_hits: usize,
    pub existence_cache_misses: usize,
    pub quota_cache_hits: usize,
    pub quota_cache_misses: usize,
    pub quota_fetch_failures: usize,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Existence-cache hit rate as a percentage
    pub fn existence_cache_hit_rate(&self) -> f64 {
        Self::hit_rate(self.existence_cache_hits, self.existence_cache_misses)
    }

    /// Quota-cache hit rate as a percentage
    pub fn quota_cache_hit_rate(&self) -> f64 {
        Self::hit_rate(self.quota_cache_hits, self.quota_cache_misses)
    }

    fn hit_rate(hits: usize, misses: usize) -> f64 {
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64 * 100.0
    }
}
