//! Quota usage snapshots
//!
//! A snapshot is a point-in-time read of the remote messaging API's usage
//! counter. Remaining capacity and usage percentage are always derived from
//! total and used, never stored alongside them, so the three can never drift.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of remote quota consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Total capacity reported by the remote source
    pub total: u64,
    /// Amount consumed
    pub used: u64,
    /// When this snapshot was fetched
    pub fetched_at: DateTime<Utc>,
    /// How long the snapshot stays fresh
    pub ttl: Duration,
}

impl QuotaSnapshot {
    /// Create a snapshot
    pub fn new(total: u64, used: u64, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            total,
            used,
            fetched_at,
            ttl,
        }
    }

    /// Remaining capacity, floored at zero
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }

    /// Usage percentage, or zero when total is zero
    pub fn percent_used(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64 * 100.0
    }

    /// Whether the snapshot is still within its TTL at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            // A fetched_at in the future means a negative age; still fresh
            Err(_) => true,
        }
    }
}
