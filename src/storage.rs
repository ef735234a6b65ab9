//! Storage backend abstraction and the SQLite implementation
//!
//! The backend capability is the seam the shard lifecycle manager and event
//! writer are built against: check a partition's existence in the catalog,
//! create it idempotently, insert a single row returning its identity, and
//! read partitions back. Backends are constructor-injected so tests can
//! substitute doubles.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::event::{EventRecord, MessageKind, Sender, StoredEvent};
use crate::shard::validate::is_safe_identifier;

/// Backend-assigned row identity
pub type RowId = i64;

/// Outcome of an idempotent partition create
///
/// Both variants are success: a duplicate-creation race is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The partition did not exist and was created by this call
    Created,
    /// The partition already existed
    AlreadyExists,
}

/// Capability exposed by a storage backend
///
/// `create_partition` must be idempotent: implementations either use the
/// backend's native if-not-exists clause or map a duplicate error to
/// [`CreateOutcome::AlreadyExists`]. `insert_row` must be a single atomic
/// statement; a cancelled write never leaves a partial row visible.
pub trait StorageBackend: Send + Sync {
    /// Check the catalog for a partition's existence
    fn partition_exists(&self, name: &str) -> Result<bool>;

    /// Create a partition with the fixed event schema, idempotently
    fn create_partition(&self, name: &str) -> Result<CreateOutcome>;

    /// Insert one row into a partition, returning the assigned identity
    fn insert_row(&self, partition: &str, event_id: &str, record: &EventRecord) -> Result<RowId>;

    /// List partitions whose names start with `<prefix>_`
    fn list_partitions(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read all rows of a partition in identity order
    fn fetch_rows(&self, partition: &str) -> Result<Vec<StoredEvent>>;

    /// Count the rows of a partition
    fn count_rows(&self, partition: &str) -> Result<u64>;
}

/// Fixed schema for an event partition
///
/// `CREATE TABLE IF NOT EXISTS` is SQLite's native atomic idempotent-create
/// primitive, so concurrent first writes race harmlessly inside the backend.
fn partition_ddl(name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{name}\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL UNIQUE,
            subject_id TEXT NOT NULL,
            sender TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{{}}',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS \"idx_{name}_subject\" ON \"{name}\" (subject_id);
        CREATE INDEX IF NOT EXISTS \"idx_{name}_created\" ON \"{name}\" (created_at);"
    )
}

/// SQLite-backed storage
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn check_identifier(name: &str) -> Result<()> {
        if !is_safe_identifier(name) {
            return Err(Error::invalid_identifier(format!(
                "unsafe partition name: {:?}",
                name
            )));
        }
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn partition_exists(&self, name: &str) -> Result<bool> {
        Self::check_identifier(name)?;

        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        Ok(stmt.exists(params![name])?)
    }

    fn create_partition(&self, name: &str) -> Result<CreateOutcome> {
        Self::check_identifier(name)?;

        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        let existed = stmt.exists(params![name])?;
        drop(stmt);

        conn.execute_batch(&partition_ddl(name))?;

        if existed {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            Ok(CreateOutcome::Created)
        }
    }

    fn insert_row(&self, partition: &str, event_id: &str, record: &EventRecord) -> Result<RowId> {
        Self::check_identifier(partition)?;

        let metadata = serde_json::to_string(&record.metadata)?;
        let sql = format!(
            "INSERT INTO \"{}\" (event_id, subject_id, sender, kind, payload, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            partition
        );

        let conn = self.conn.lock();
        conn.execute(
            &sql,
            params![
                event_id,
                record.subject_id,
                record.sender.as_str(),
                record.kind.as_str(),
                record.payload,
                metadata,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::write_failed(format!("insert into {}: {}", partition, e)))?;

        let row_id = conn.last_insert_rowid();
        if row_id == 0 {
            return Err(Error::write_failed(format!(
                "insert into {} returned no identity",
                partition
            )));
        }

        Ok(row_id)
    }

    fn list_partitions(&self, prefix: &str) -> Result<Vec<String>> {
        Self::check_identifier(prefix)?;

        // GLOB treats underscores literally, unlike LIKE
        let pattern = format!("{}_*", prefix);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name GLOB ?1 ORDER BY name",
        )?;
        let names = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(names)
    }

    fn fetch_rows(&self, partition: &str) -> Result<Vec<StoredEvent>> {
        Self::check_identifier(partition)?;

        let sql = format!(
            "SELECT id, event_id, subject_id, sender, kind, payload, metadata, created_at
             FROM \"{}\" ORDER BY id",
            partition
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        let mut events = Vec::with_capacity(rows.len());
        for (row_id, event_id, subject_id, sender, kind, payload, metadata, created_at) in rows {
            let metadata: HashMap<String, String> = serde_json::from_str(&metadata)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::other(format!("bad created_at in {}: {}", partition, e)))?
                .with_timezone(&Utc);

            events.push(StoredEvent {
                row_id,
                event_id,
                subject_id,
                sender: Sender::parse(&sender)?,
                kind: MessageKind::parse(&kind)?,
                payload,
                metadata,
                created_at,
            });
        }

        Ok(events)
    }

    fn count_rows(&self, partition: &str) -> Result<u64> {
        Self::check_identifier(partition)?;

        let sql = format!("SELECT COUNT(*) FROM \"{}\"", partition);

        let conn = self.conn.lock();
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
