//! Shard lifecycle management
//!
//! Ensures that a calendar-month partition exists before any row is written
//! to it. Existence is cached in process memory once confirmed, so steady-state
//! appends cost no storage round-trip; a failed create is never cached, and
//! the next call re-enters the check-then-create path.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::metrics::MetricsCollector;
use crate::shard::validate::SecurityValidator;
use crate::shard::ShardId;
use crate::storage::{CreateOutcome, StorageBackend};

/// Creates and tracks shard partitions
pub struct ShardLifecycleManager {
    backend: Arc<dyn StorageBackend>,
    validator: SecurityValidator,
    /// Shard ids confirmed to exist; populated only on success, cleared only
    /// by `reset_existence_cache` or process restart
    known: RwLock<HashSet<ShardId>>,
    /// Collapses concurrent first writes into a single create call. The
    /// backend create is idempotent, so correctness does not depend on this
    /// lock; it only avoids creation storms.
    create_lock: Mutex<()>,
    metrics: Arc<MetricsCollector>,
}

impl ShardLifecycleManager {
    /// Create a manager over a storage backend
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        max_identifier_len: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            backend,
            validator: SecurityValidator::new(max_identifier_len),
            known: RwLock::new(HashSet::new()),
            create_lock: Mutex::new(()),
            metrics,
        }
    }

    /// Validate an identifier against this manager's whitelist
    pub fn validate_identifier(&self, candidate: &str) -> Result<()> {
        self.validator.validate(candidate)
    }

    /// Ensure a shard partition exists, creating it if needed
    ///
    /// The identifier is validated before any storage call. A concurrent
    /// create by another caller is success, not a failure; any other backend
    /// failure surfaces as `ShardCreateFailed` and leaves the existence cache
    /// untouched.
    pub fn ensure_shard(&self, shard_id: &str) -> Result<ShardId> {
        self.validator.validate(shard_id)?;

        if self.known.read().contains(shard_id) {
            self.metrics.record_existence_cache_hit();
            return Ok(shard_id.to_string());
        }
        self.metrics.record_existence_cache_miss();

        let _guard = self.create_lock.lock();

        // Another caller may have finished while we waited for the lock
        if self.known.read().contains(shard_id) {
            return Ok(shard_id.to_string());
        }

        let exists = self
            .backend
            .partition_exists(shard_id)
            .map_err(|e| Error::shard_create_failed(shard_id, e.to_string()))?;

        if !exists {
            match self.backend.create_partition(shard_id) {
                Ok(CreateOutcome::Created) => {
                    info!(shard = %shard_id, "created shard partition");
                    self.metrics.increment_shards_created();
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    debug!(shard = %shard_id, "shard partition created concurrently");
                }
                Err(Error::InvalidIdentifier(msg)) => {
                    return Err(Error::InvalidIdentifier(msg));
                }
                Err(e) => {
                    return Err(Error::shard_create_failed(shard_id, e.to_string()));
                }
            }
        }

        self.known.write().insert(shard_id.to_string());
        Ok(shard_id.to_string())
    }

    /// Check whether a shard id is cached as existing
    pub fn is_cached(&self, shard_id: &str) -> bool {
        self.known.read().contains(shard_id)
    }

    /// Shard ids currently cached as existing
    pub fn cached_shards(&self) -> Vec<ShardId> {
        let mut shards: Vec<_> = self.known.read().iter().cloned().collect();
        shards.sort();
        shards
    }

    /// Drop the existence cache, forcing catalog checks on the next calls
    pub fn reset_existence_cache(&self) {
        self.known.write().clear();
    }
}
