//! Quota admission guarding for the remote messaging API
//!
//! A TTL-bounded cache polls the remote usage counter, and an admission guard
//! classifies the snapshot into severity bands and decides when an advisory
//! warning should be raised. Nothing here ever blocks or fails message
//! handling; a failed fetch just keeps serving the last known snapshot.

mod cache;
mod guard;
mod snapshot;

pub use cache::{QuotaUsageCache, RawUsage, UsageSource};
pub use guard::{QuotaAdmissionGuard, QuotaClassification, QuotaStatus, UsageBand};
pub use snapshot::QuotaSnapshot;
