//! Quota admission guard
//!
//! Classifies a usage snapshot into severity bands and decides whether an
//! advisory warning should be raised. The guard performs no I/O of its own
//! and never blocks or fails message handling: a failed fetch at the cache
//! means the last known snapshot is served stale, without a fresh warning.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::quota::{QuotaSnapshot, QuotaUsageCache};

/// Severity band for a usage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageBand {
    /// Below 75 percent
    Normal,
    /// 75 to just under 90 percent
    Elevated,
    /// 90 to just under 95 percent
    High,
    /// 95 percent and above
    Critical,
}

impl UsageBand {
    /// Classify a usage percentage
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 95.0 {
            Self::Critical
        } else if percent >= 90.0 {
            Self::High
        } else if percent >= 75.0 {
            Self::Elevated
        } else {
            Self::Normal
        }
    }

    /// Get the name of the band
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for UsageBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of classifying a single snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaClassification {
    pub band: UsageBand,
    pub should_warn: bool,
}

/// Advisory quota state reported to callers
///
/// `snapshot` is `None` when no fetch has ever succeeded; `stale` marks a
/// snapshot served past its TTL because the latest fetch failed.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaStatus {
    pub snapshot: Option<QuotaSnapshot>,
    pub band: Option<UsageBand>,
    pub should_warn: bool,
    pub stale: bool,
}

impl QuotaStatus {
    /// Whether no usage information is available at all
    pub fn is_unknown(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Classifies quota usage and decides when to warn
pub struct QuotaAdmissionGuard {
    cache: Arc<QuotaUsageCache>,
    /// Warning threshold in percent, clamped to [0, 100] on assignment
    threshold: RwLock<f64>,
}

impl QuotaAdmissionGuard {
    /// Create a guard over a usage cache with an initial threshold
    pub fn new(cache: Arc<QuotaUsageCache>, threshold: f64) -> Self {
        Self {
            cache,
            threshold: RwLock::new(threshold.clamp(0.0, 100.0)),
        }
    }

    /// Classify a snapshot against a threshold
    ///
    /// Pure: no I/O, no state. `should_warn` holds iff the usage percentage
    /// is at or above the threshold (clamped to [0, 100]).
    pub fn evaluate(snapshot: &QuotaSnapshot, threshold: f64) -> QuotaClassification {
        let percent = snapshot.percent_used();
        QuotaClassification {
            band: UsageBand::from_percent(percent),
            should_warn: percent >= threshold.clamp(0.0, 100.0),
        }
    }

    /// The current warning threshold
    pub fn threshold(&self) -> f64 {
        *self.threshold.read()
    }

    /// Set the warning threshold, clamping silently to [0, 100]
    pub fn set_threshold(&self, percent: f64) {
        *self.threshold.write() = percent.clamp(0.0, 100.0);
    }

    /// Fetch, classify, and report the current quota state
    ///
    /// Fetch failures are swallowed here: the last known snapshot is served
    /// marked stale with no fresh warning, or the unknown state is reported
    /// when nothing was ever fetched. Message handling must never degrade
    /// because this advisory check failed.
    pub fn status(&self, force_refresh: bool) -> QuotaStatus {
        match self.cache.fetch(force_refresh) {
            Ok(snapshot) => {
                let classification = Self::evaluate(&snapshot, self.threshold());
                QuotaStatus {
                    snapshot: Some(snapshot),
                    band: Some(classification.band),
                    should_warn: classification.should_warn,
                    stale: false,
                }
            }
            Err(_) => match self.cache.cached() {
                Some(snapshot) => {
                    let band = UsageBand::from_percent(snapshot.percent_used());
                    QuotaStatus {
                        snapshot: Some(snapshot),
                        band: Some(band),
                        should_warn: false,
                        stale: true,
                    }
                }
                None => QuotaStatus {
                    snapshot: None,
                    band: None,
                    should_warn: false,
                    stale: false,
                },
            },
        }
    }

    /// Drop the cached snapshot via the cache
    pub fn clear_cached_snapshot(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::metrics::MetricsCollector;
    use crate::quota::{RawUsage, UsageSource};
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<RawUsage>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<RawUsage>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl UsageSource for ScriptedSource {
        fn fetch_usage(&self) -> Result<RawUsage> {
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Err(Error::other("script exhausted")))
        }
    }

    fn guard_with(responses: Vec<Result<RawUsage>>, threshold: f64) -> QuotaAdmissionGuard {
        let cache = Arc::new(QuotaUsageCache::new(
            Arc::new(ScriptedSource::new(responses)),
            Duration::from_secs(3600),
            Arc::new(MetricsCollector::new()),
        ));
        QuotaAdmissionGuard::new(cache, threshold)
    }

    fn snapshot(total: u64, used: u64) -> QuotaSnapshot {
        QuotaSnapshot::new(total, used, Utc::now(), Duration::from_secs(3600))
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(UsageBand::from_percent(0.0), UsageBand::Normal);
        assert_eq!(UsageBand::from_percent(74.9), UsageBand::Normal);
        assert_eq!(UsageBand::from_percent(75.0), UsageBand::Elevated);
        assert_eq!(UsageBand::from_percent(89.9), UsageBand::Elevated);
        assert_eq!(UsageBand::from_percent(90.0), UsageBand::High);
        assert_eq!(UsageBand::from_percent(94.9), UsageBand::High);
        assert_eq!(UsageBand::from_percent(95.0), UsageBand::Critical);
        assert_eq!(UsageBand::from_percent(120.0), UsageBand::Critical);
    }

    #[test]
    fn test_evaluate_fixtures() {
        // used=920: 92.0 percent, high, warns at threshold 90
        let c = QuotaAdmissionGuard::evaluate(&snapshot(1000, 920), 90.0);
        assert_eq!(c.band, UsageBand::High);
        assert!(c.should_warn);

        // used=500: 50.0 percent, normal, no warning
        let c = QuotaAdmissionGuard::evaluate(&snapshot(1000, 500), 90.0);
        assert_eq!(c.band, UsageBand::Normal);
        assert!(!c.should_warn);

        // used=960: 96.0 percent, critical, warns
        let c = QuotaAdmissionGuard::evaluate(&snapshot(1000, 960), 90.0);
        assert_eq!(c.band, UsageBand::Critical);
        assert!(c.should_warn);
    }

    #[test]
    fn test_warn_at_exact_threshold() {
        let c = QuotaAdmissionGuard::evaluate(&snapshot(100, 90), 90.0);
        assert!(c.should_warn);

        let c = QuotaAdmissionGuard::evaluate(&snapshot(1000, 899), 90.0);
        assert!(!c.should_warn);
    }

    #[test]
    fn test_threshold_clamped() {
        let guard = guard_with(vec![], 90.0);

        guard.set_threshold(150.0);
        assert_eq!(guard.threshold(), 100.0);

        guard.set_threshold(-10.0);
        assert_eq!(guard.threshold(), 0.0);

        let guard = guard_with(vec![], 300.0);
        assert_eq!(guard.threshold(), 100.0);
    }

    #[test]
    fn test_status_classifies_fresh_snapshot() {
        let guard = guard_with(vec![Ok(RawUsage { used: 920, total: 1000 })], 90.0);

        let status = guard.status(false);
        assert_eq!(status.band, Some(UsageBand::High));
        assert!(status.should_warn);
        assert!(!status.stale);
        assert_eq!(status.snapshot.unwrap().remaining(), 80);
    }

    #[test]
    fn test_status_unknown_when_never_fetched() {
        let guard = guard_with(vec![Err(Error::other("down"))], 90.0);

        let status = guard.status(false);
        assert!(status.is_unknown());
        assert_eq!(status.band, None);
        assert!(!status.should_warn);
    }

    #[test]
    fn test_status_serves_stale_snapshot_without_warning() {
        let guard = guard_with(
            vec![
                Ok(RawUsage { used: 960, total: 1000 }),
                Err(Error::other("down")),
            ],
            90.0,
        );

        let first = guard.status(false);
        assert!(first.should_warn);

        let second = guard.status(true);
        assert!(second.stale);
        assert_eq!(second.band, Some(UsageBand::Critical));
        // No fresh warning while the source is unreachable
        assert!(!second.should_warn);
        assert_eq!(second.snapshot.unwrap().used, 960);
    }

    #[test]
    fn test_clear_cached_snapshot() {
        let guard = guard_with(
            vec![
                Ok(RawUsage { used: 100, total: 1000 }),
                Err(Error::other("down")),
            ],
            90.0,
        );

        guard.status(false);
        guard.clear_cached_snapshot();

        let status = guard.status(false);
        assert!(status.is_unknown());
    }
}
