//! # ChatVault
//!
//! A time-partitioned store for chat event records with quota-aware
//! admission guarding.
//!
//! Events are routed into calendar-month shards (one SQL table per month,
//! named `<prefix>_<YYYY>_<MM>` in a configured timezone), created lazily and
//! idempotently on first write. A strict identifier whitelist keeps every
//! dynamically named table safe to splice into DDL. Alongside the write path,
//! a TTL-bounded cache polls a remote usage counter and an admission guard
//! classifies consumption into severity bands, raising advisory warnings
//! without ever blocking message handling.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatvault::{
//!     ChatVault, EventOrigin, EventRecord, MessageKind, RawUsage, Result,
//!     Sender, UsageSource, VaultConfig,
//! };
//!
//! struct StaticUsage;
//!
//! impl UsageSource for StaticUsage {
//!     fn fetch_usage(&self) -> Result<RawUsage> {
//!         Ok(RawUsage { used: 120, total: 1000 })
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let vault = ChatVault::open("vault.db", Arc::new(StaticUsage), VaultConfig::default())?;
//!
//!     let record = EventRecord::new(
//!         "U123",
//!         Sender::Contact,
//!         MessageKind::Text,
//!         EventOrigin::Ingested,
//!         "hello there",
//!     );
//!     let row_id = vault.append(&record)?;
//!     println!("stored as row {row_id}");
//!
//!     let status = vault.quota_status(false);
//!     if status.should_warn {
//!         println!("quota warning: {:?}", status.band);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod quota;
pub mod shard;
pub mod storage;
pub mod store;
pub mod writer;

pub use config::{
    VaultConfig, DEFAULT_MAX_IDENTIFIER_LEN, DEFAULT_QUOTA_TTL, DEFAULT_WARNING_THRESHOLD,
};
pub use error::{Error, Result};
pub use event::{
    generate_event_id, EventOrigin, EventRecord, MessageKind, Sender, StoredEvent,
};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use quota::{
    QuotaAdmissionGuard, QuotaClassification, QuotaSnapshot, QuotaStatus, QuotaUsageCache,
    RawUsage, UsageBand, UsageSource,
};
pub use shard::{SecurityValidator, ShardId, ShardLifecycleManager, ShardNameResolver};
pub use storage::{CreateOutcome, RowId, SqliteBackend, StorageBackend};
pub use store::{ChatVault, VaultStats};
pub use writer::EventWriter;
