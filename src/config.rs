//! Configuration for chatvault
//!
//! This module provides configuration options for the chatvault store.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shard::validate::is_safe_identifier;

/// Default maximum identifier length, matching common SQL backends
pub const DEFAULT_MAX_IDENTIFIER_LEN: usize = 64;

/// Default time-to-live for cached quota snapshots
pub const DEFAULT_QUOTA_TTL: Duration = Duration::from_secs(60 * 60);

/// Default usage percentage above which a warning is raised
pub const DEFAULT_WARNING_THRESHOLD: f64 = 90.0;

/// Length of the `_YYYY_MM` suffix appended to the table prefix
const SHARD_SUFFIX_LEN: usize = 8;

/// Configuration options for a chatvault store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct VaultConfig {
    // Shard configuration
    /// Prefix for shard partition names; a shard id is `<prefix>_<year>_<month>`
    pub table_prefix: String,
    /// Maximum length of any identifier passed to the storage backend
    pub max_identifier_len: usize,
    /// Offset from UTC, in seconds, of the fixed timezone used to resolve
    /// timestamps to calendar months
    pub utc_offset_secs: i32,

    // Quota configuration
    /// Time-to-live for cached quota snapshots
    pub quota_ttl: Duration,
    /// Usage percentage above which a warning is raised; clamped to [0, 100]
    pub warning_threshold: f64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            table_prefix: "chat_events".to_string(),
            max_identifier_len: DEFAULT_MAX_IDENTIFIER_LEN,
            utc_offset_secs: 0,
            quota_ttl: DEFAULT_QUOTA_TTL,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl VaultConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shard partition name prefix
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Set the maximum identifier length
    pub fn with_max_identifier_len(mut self, len: usize) -> Self {
        self.max_identifier_len = len;
        self
    }

    /// Set the fixed timezone as an offset from UTC in seconds
    pub fn with_utc_offset_secs(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    /// Set the quota snapshot time-to-live
    pub fn with_quota_ttl(mut self, ttl: Duration) -> Self {
        self.quota_ttl = ttl;
        self
    }

    /// Set the warning threshold, clamped to [0, 100]
    pub fn with_warning_threshold(mut self, percent: f64) -> Self {
        self.warning_threshold = percent.clamp(0.0, 100.0);
        self
    }

    /// The fixed timezone used for month resolution
    ///
    /// Falls back to UTC if the configured offset is out of range; `validate`
    /// rejects such configurations up front.
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_safe_identifier(&self.table_prefix) {
            return Err(Error::config(
                "Table prefix must be non-empty and contain only letters, digits, and underscores",
            ));
        }

        if self.max_identifier_len < SHARD_SUFFIX_LEN + 1 {
            return Err(Error::config(format!(
                "Maximum identifier length must be at least {}",
                SHARD_SUFFIX_LEN + 1
            )));
        }

        if self.table_prefix.len() + SHARD_SUFFIX_LEN > self.max_identifier_len {
            return Err(Error::config(format!(
                "Table prefix too long: {} characters leave no room for the _YYYY_MM suffix",
                self.table_prefix.len()
            )));
        }

        if self.utc_offset_secs <= -86_400 || self.utc_offset_secs >= 86_400 {
            return Err(Error::config(
                "UTC offset must be strictly between -86400 and 86400 seconds",
            ));
        }

        if self.quota_ttl.is_zero() {
            return Err(Error::config("Quota TTL must be non-zero"));
        }

        if !(0.0..=100.0).contains(&self.warning_threshold) {
            return Err(Error::config(
                "Warning threshold must be between 0 and 100",
            ));
        }

        Ok(())
    }
}
