//! TTL-bounded cache in front of the remote usage source
//!
//! The remote counter is polled at most once per TTL window unless a caller
//! forces a refresh. A failed fetch never disturbs the cached snapshot: for
//! this advisory subsystem, stale data beats no data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics::MetricsCollector;
use crate::quota::QuotaSnapshot;

/// Raw `{used, total}` pair reported by the remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawUsage {
    pub used: u64,
    pub total: u64,
}

/// Capability for reading the remote usage counter
///
/// Invoked at most once per cache miss or forced refresh. Implementations
/// should bound the call with a timeout and surface it as a fetch failure;
/// the guard treats a timeout exactly like any other failed fetch.
pub trait UsageSource: Send + Sync {
    fn fetch_usage(&self) -> Result<RawUsage>;
}

/// TTL-bounded snapshot cache over a [`UsageSource`]
pub struct QuotaUsageCache {
    source: Arc<dyn UsageSource>,
    ttl: Duration,
    slot: RwLock<Option<QuotaSnapshot>>,
    /// Set by `invalidate`; the next read bypasses the cached snapshot once
    bypass_next: AtomicBool,
    metrics: Arc<MetricsCollector>,
}

impl QuotaUsageCache {
    /// Create a cache over a usage source
    pub fn new(source: Arc<dyn UsageSource>, ttl: Duration, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
            bypass_next: AtomicBool::new(false),
            metrics,
        }
    }

    /// The configured snapshot time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a fresh snapshot, fetching from the remote source if needed
    ///
    /// With `force_refresh` false, a cached snapshot within its TTL is
    /// returned without contacting the source. On a failed fetch the cached
    /// snapshot, fresh or stale, is left in place and the error is returned.
    pub fn fetch(&self, force_refresh: bool) -> Result<QuotaSnapshot> {
        let bypass = self.bypass_next.swap(false, Ordering::SeqCst);

        if !force_refresh && !bypass {
            if let Some(snapshot) = self.slot.read().as_ref() {
                if snapshot.is_fresh(Utc::now()) {
                    self.metrics.record_quota_cache_hit();
                    return Ok(snapshot.clone());
                }
            }
        }
        self.metrics.record_quota_cache_miss();

        match self.source.fetch_usage() {
            Ok(raw) => {
                let snapshot = QuotaSnapshot::new(raw.total, raw.used, Utc::now(), self.ttl);
                debug!(
                    used = raw.used,
                    total = raw.total,
                    "refreshed quota snapshot"
                );
                *self.slot.write() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                self.metrics.record_quota_fetch_failure();
                warn!(error = %e, "quota usage fetch failed, keeping cached snapshot");
                Err(Error::quota_fetch_failed(e.to_string()))
            }
        }
    }

    /// The cached snapshot, if any, regardless of freshness
    pub fn cached(&self) -> Option<QuotaSnapshot> {
        self.slot.read().clone()
    }

    /// Force the next read to bypass the cached snapshot
    pub fn invalidate(&self) {
        self.bypass_next.store(true, Ordering::SeqCst);
    }

    /// Drop the cached snapshot entirely
    pub fn clear(&self) {
        *self.slot.write() = None;
        self.bypass_next.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Replays a scripted sequence of responses and counts invocations
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<RawUsage>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<RawUsage>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl UsageSource for ScriptedSource {
        fn fetch_usage(&self) -> Result<RawUsage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Ok(RawUsage { used: 0, total: 0 }))
        }
    }

    fn new_cache(source: Arc<ScriptedSource>, ttl: Duration) -> QuotaUsageCache {
        QuotaUsageCache::new(source, ttl, Arc::new(MetricsCollector::new()))
    }

    #[test]
    fn test_within_ttl_source_called_at_most_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(RawUsage { used: 500, total: 1000 }),
            Ok(RawUsage { used: 999, total: 1000 }),
        ]));
        let cache = new_cache(source.clone(), Duration::from_secs(3600));

        let first = cache.fetch(false).unwrap();
        let second = cache.fetch(false).unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first.used, 500);
        assert_eq!(second.used, 500);
        assert_eq!(first.fetched_at, second.fetched_at);
    }

    #[test]
    fn test_force_refresh_always_contacts_source() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(RawUsage { used: 100, total: 1000 }),
            Ok(RawUsage { used: 200, total: 1000 }),
        ]));
        let cache = new_cache(source.clone(), Duration::from_secs(3600));

        assert_eq!(cache.fetch(false).unwrap().used, 100);
        assert_eq!(cache.fetch(true).unwrap().used, 200);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_failed_fetch_keeps_cached_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(RawUsage { used: 300, total: 1000 }),
            Err(Error::other("remote source unreachable")),
        ]));
        let cache = new_cache(source.clone(), Duration::from_secs(3600));

        cache.fetch(false).unwrap();

        let err = cache.fetch(true).unwrap_err();
        assert!(err.is_quota_fetch_failed());

        // The previous snapshot survives the failure
        let cached = cache.cached().unwrap();
        assert_eq!(cached.used, 300);
    }

    #[test]
    fn test_failed_first_fetch_leaves_cache_empty() {
        let source = Arc::new(ScriptedSource::new(vec![Err(Error::other("down"))]));
        let cache = new_cache(source, Duration::from_secs(3600));

        assert!(cache.fetch(false).unwrap_err().is_quota_fetch_failed());
        assert!(cache.cached().is_none());
    }

    #[test]
    fn test_invalidate_bypasses_cache_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(RawUsage { used: 10, total: 100 }),
            Ok(RawUsage { used: 20, total: 100 }),
        ]));
        let cache = new_cache(source.clone(), Duration::from_secs(3600));

        cache.fetch(false).unwrap();
        cache.invalidate();

        assert_eq!(cache.fetch(false).unwrap().used, 20);
        assert_eq!(source.calls(), 2);

        // Bypass applies to a single read
        cache.fetch(false).unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_clear_drops_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(RawUsage { used: 10, total: 100 }),
            Ok(RawUsage { used: 20, total: 100 }),
        ]));
        let cache = new_cache(source.clone(), Duration::from_secs(3600));

        cache.fetch(false).unwrap();
        cache.clear();
        assert!(cache.cached().is_none());

        assert_eq!(cache.fetch(false).unwrap().used, 20);
    }

    #[test]
    fn test_expired_snapshot_triggers_refresh() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(RawUsage { used: 10, total: 100 }),
            Ok(RawUsage { used: 20, total: 100 }),
        ]));
        let cache = new_cache(source.clone(), Duration::from_millis(1));

        cache.fetch(false).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.fetch(false).unwrap().used, 20);
        assert_eq!(source.calls(), 2);
    }
}
