//! The chatvault store facade
//!
//! Wires the shard lifecycle manager, event writer, and quota admission guard
//! over constructor-injected backend capabilities. This is the library
//! boundary higher-level request handlers call into.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::VaultConfig;
use crate::error::Result;
use crate::event::{EventRecord, StoredEvent};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::quota::{QuotaAdmissionGuard, QuotaStatus, QuotaUsageCache, UsageSource};
use crate::shard::{ShardId, ShardLifecycleManager, ShardNameResolver};
use crate::storage::{RowId, SqliteBackend, StorageBackend};
use crate::writer::EventWriter;

/// Aggregate statistics about a vault
#[derive(Debug, Clone, Default)]
pub struct VaultStats {
    /// Number of shard partitions in the catalog
    pub shard_count: usize,
    /// Total rows across all shards
    pub total_rows: u64,
    /// Start of the oldest shard's month
    pub oldest_month: Option<DateTime<Utc>>,
    /// Start of the newest shard's month
    pub newest_month: Option<DateTime<Utc>>,
    /// Operation counters
    pub metrics: MetricsSnapshot,
}

/// Time-partitioned event store with quota admission guarding
pub struct ChatVault {
    config: VaultConfig,
    backend: Arc<dyn StorageBackend>,
    manager: Arc<ShardLifecycleManager>,
    writer: EventWriter,
    quota: QuotaAdmissionGuard,
    metrics: Arc<MetricsCollector>,
}

impl ChatVault {
    /// Create a vault over injected backend capabilities
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        usage_source: Arc<dyn UsageSource>,
        config: VaultConfig,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(MetricsCollector::new());
        let resolver = ShardNameResolver::new(
            config.table_prefix.clone(),
            config.timezone(),
            config.max_identifier_len,
        )?;
        let manager = Arc::new(ShardLifecycleManager::new(
            backend.clone(),
            config.max_identifier_len,
            metrics.clone(),
        ));
        let writer = EventWriter::new(
            backend.clone(),
            resolver,
            manager.clone(),
            metrics.clone(),
        );
        let cache = Arc::new(QuotaUsageCache::new(
            usage_source,
            config.quota_ttl,
            metrics.clone(),
        ));
        let quota = QuotaAdmissionGuard::new(cache, config.warning_threshold);

        Ok(Self {
            config,
            backend,
            manager,
            writer,
            quota,
            metrics,
        })
    }

    /// Open a vault backed by a SQLite database file
    pub fn open<P: AsRef<Path>>(
        path: P,
        usage_source: Arc<dyn UsageSource>,
        config: VaultConfig,
    ) -> Result<Self> {
        let backend = Arc::new(SqliteBackend::open(path)?);
        Self::new(backend, usage_source, config)
    }

    /// Open a vault backed by an in-memory SQLite database
    pub fn open_in_memory(
        usage_source: Arc<dyn UsageSource>,
        config: VaultConfig,
    ) -> Result<Self> {
        let backend = Arc::new(SqliteBackend::open_in_memory()?);
        Self::new(backend, usage_source, config)
    }

    /// The vault's configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Append an event record, returning the assigned row identity
    pub fn append(&self, record: &EventRecord) -> Result<RowId> {
        self.writer.append(record)
    }

    /// Ensure the shard for a timestamp exists, returning its id
    pub fn ensure_shard_for_timestamp(&self, timestamp: DateTime<Utc>) -> Result<ShardId> {
        let shard_id = self.writer.resolver().resolve(timestamp);
        self.manager.ensure_shard(&shard_id)
    }

    /// Current advisory quota state; never fails message handling
    pub fn quota_status(&self, force_refresh: bool) -> QuotaStatus {
        self.quota.status(force_refresh)
    }

    /// Set the quota warning threshold, clamping silently to [0, 100]
    pub fn set_warning_threshold(&self, percent: f64) {
        self.quota.set_threshold(percent);
    }

    /// The current quota warning threshold
    pub fn warning_threshold(&self) -> f64 {
        self.quota.threshold()
    }

    /// Drop the cached quota snapshot
    pub fn clear_quota_cache(&self) {
        self.quota.clear_cached_snapshot();
    }

    /// List shard partitions under this vault's prefix
    pub fn list_shards(&self) -> Result<Vec<ShardId>> {
        self.backend.list_partitions(&self.config.table_prefix)
    }

    /// Read back all rows of one shard
    pub fn read_shard(&self, shard_id: &str) -> Result<Vec<StoredEvent>> {
        self.manager.validate_identifier(shard_id)?;
        self.backend.fetch_rows(shard_id)
    }

    /// Aggregate statistics across all shards
    pub fn stats(&self) -> Result<VaultStats> {
        let shards = self.list_shards()?;
        let resolver = self.writer.resolver();

        let mut stats = VaultStats {
            shard_count: shards.len(),
            metrics: self.metrics.snapshot(),
            ..Default::default()
        };

        for shard_id in &shards {
            stats.total_rows += self.backend.count_rows(shard_id)?;

            if let Ok((start, _)) = resolver.parse(shard_id) {
                if stats.oldest_month.map_or(true, |oldest| start < oldest) {
                    stats.oldest_month = Some(start);
                }
                if stats.newest_month.map_or(true, |newest| start > newest) {
                    stats.newest_month = Some(start);
                }
            }
        }

        Ok(stats)
    }

    /// Point-in-time operation counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Drop the shard existence cache; the next appends re-check the catalog
    pub fn reset_existence_cache(&self) {
        self.manager.reset_existence_cache();
    }
}
