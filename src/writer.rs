//! Event append path
//!
//! Routes each record to its calendar-month shard and persists it there.
//! Exactly one row lands in exactly one partition per append; the insert is a
//! single atomic statement, so a cancelled write never leaves a partial row.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::event::{generate_event_id, EventRecord};
use crate::metrics::MetricsCollector;
use crate::shard::{ShardLifecycleManager, ShardNameResolver};
use crate::storage::{RowId, StorageBackend};

/// Writes event records into their owning shards
pub struct EventWriter {
    backend: Arc<dyn StorageBackend>,
    resolver: ShardNameResolver,
    manager: Arc<ShardLifecycleManager>,
    metrics: Arc<MetricsCollector>,
}

impl EventWriter {
    /// Create a writer over a backend, resolver, and lifecycle manager
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        resolver: ShardNameResolver,
        manager: Arc<ShardLifecycleManager>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            backend,
            resolver,
            manager,
            metrics,
        }
    }

    /// The shard name resolver this writer routes with
    pub fn resolver(&self) -> &ShardNameResolver {
        &self.resolver
    }

    /// Append a record to the shard owning its timestamp
    ///
    /// The shard is resolved from `record.created_at`, ensured to exist, and
    /// the row inserted. A record without a pre-assigned event id gets a
    /// generated one carrying its origin prefix. Shard failures propagate
    /// verbatim; a failed insert surfaces as `WriteFailed`.
    pub fn append(&self, record: &EventRecord) -> Result<RowId> {
        let shard_id = self.resolver.resolve(record.created_at);
        self.manager.ensure_shard(&shard_id)?;

        let event_id = match &record.event_id {
            Some(id) => id.clone(),
            None => generate_event_id(record.origin, record.created_at),
        };

        let row_id = self.backend.insert_row(&shard_id, &event_id, record)?;
        self.metrics.increment_appends();
        debug!(shard = %shard_id, event_id = %event_id, row_id, "appended event");

        Ok(row_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventOrigin, MessageKind, Sender};
    use crate::storage::SqliteBackend;
    use chrono::{Offset, TimeZone, Utc};

    fn new_writer() -> (EventWriter, Arc<SqliteBackend>) {
        let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let metrics = Arc::new(MetricsCollector::new());
        let resolver = ShardNameResolver::new("chat_events", Utc.fix(), 64).unwrap();
        let manager = Arc::new(ShardLifecycleManager::new(
            backend.clone(),
            64,
            metrics.clone(),
        ));
        let writer = EventWriter::new(backend.clone(), resolver, manager, metrics);
        (writer, backend)
    }

    fn record_at(year: i32, month: u32) -> EventRecord {
        EventRecord::new(
            "U42",
            Sender::Contact,
            MessageKind::Text,
            EventOrigin::Ingested,
            "payload",
        )
        .with_created_at(Utc.with_ymd_and_hms(year, month, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_append_routes_by_timestamp() {
        let (writer, backend) = new_writer();

        let row_id = writer.append(&record_at(2024, 3)).unwrap();
        assert_eq!(row_id, 1);

        let rows = backend.fetch_rows("chat_events_2024_03").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject_id, "U42");
    }

    #[test]
    fn test_append_generates_origin_prefixed_id() {
        let (writer, backend) = new_writer();

        writer.append(&record_at(2024, 3)).unwrap();
        let manual = EventRecord {
            origin: EventOrigin::Manual,
            sender: Sender::Operator,
            ..record_at(2024, 3)
        };
        writer.append(&manual).unwrap();

        let rows = backend.fetch_rows("chat_events_2024_03").unwrap();
        assert_eq!(rows[0].origin(), Some(EventOrigin::Ingested));
        assert_eq!(rows[1].origin(), Some(EventOrigin::Manual));
    }

    #[test]
    fn test_append_keeps_caller_supplied_id() {
        let (writer, backend) = new_writer();

        let record = record_at(2024, 3).with_event_id("webhook-777");
        writer.append(&record).unwrap();

        let rows = backend.fetch_rows("chat_events_2024_03").unwrap();
        assert_eq!(rows[0].event_id, "webhook-777");
        assert_eq!(rows[0].origin(), None);
    }

    #[test]
    fn test_appends_one_month_apart_land_in_distinct_partitions() {
        let (writer, backend) = new_writer();

        writer.append(&record_at(2024, 3)).unwrap();
        writer.append(&record_at(2024, 4)).unwrap();

        assert_eq!(backend.count_rows("chat_events_2024_03").unwrap(), 1);
        assert_eq!(backend.count_rows("chat_events_2024_04").unwrap(), 1);
        assert_eq!(
            backend.list_partitions("chat_events").unwrap(),
            vec!["chat_events_2024_03", "chat_events_2024_04"]
        );
    }
}
