//! Calendar-month shard management for event storage
//!
//! This module organizes event records into calendar-month partitions. A
//! shard id names one partition and is derived purely from a timestamp in the
//! store's fixed timezone; every id is validated against a strict whitelist
//! before it reaches the storage backend.

mod manager;
mod resolver;
pub(crate) mod validate;

pub use manager::ShardLifecycleManager;
pub use resolver::ShardNameResolver;
pub use validate::SecurityValidator;

/// Shard ID type
pub type ShardId = String;
