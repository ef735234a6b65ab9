//! Event record types
//!
//! Defines the shard-owning event entity, its classification enums, and the
//! event-id scheme. A generated event id carries an origin prefix so that
//! downstream consumers can tell manually-authored records from ingested ones
//! without a lookup.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// How a record entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// Received from the remote messaging platform
    Ingested,
    /// Authored by an operator through the admin surface
    Manual,
}

impl EventOrigin {
    /// The prefix a generated event id starts with
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Ingested => "evt",
            Self::Manual => "man",
        }
    }

    /// Recover the origin from an event id
    pub fn from_event_id(event_id: &str) -> Option<Self> {
        if event_id.starts_with("evt_") {
            Some(Self::Ingested)
        } else if event_id.starts_with("man_") {
            Some(Self::Manual)
        } else {
            None
        }
    }
}

impl fmt::Display for EventOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingested => write!(f, "ingested"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Source/sender classification of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The remote conversation partner
    Contact,
    /// A human operator
    Operator,
    /// An automated responder
    Bot,
}

impl Sender {
    /// The storage representation of the sender
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Operator => "operator",
            Self::Bot => "bot",
        }
    }

    /// Parse a sender from its storage representation
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "contact" => Ok(Self::Contact),
            "operator" => Ok(Self::Operator),
            "bot" => Ok(Self::Bot),
            _ => Err(Error::other(format!("Unknown sender: {}", s))),
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    File,
    Location,
    Sticker,
    System,
}

impl MessageKind {
    /// The storage representation of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
            Self::Location => "location",
            Self::Sticker => "sticker",
            Self::System => "system",
        }
    }

    /// Parse a message kind from its storage representation
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "file" => Ok(Self::File),
            "location" => Ok(Self::Location),
            "sticker" => Ok(Self::Sticker),
            "system" => Ok(Self::System),
            _ => Err(Error::other(format!("Unknown message kind: {}", s))),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chat/event record to be appended to a shard
///
/// Every record belongs to exactly one shard, determined solely by
/// `created_at`; once written it is never moved between shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Pre-assigned event id; generated at append time when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// The remote conversation/user key
    pub subject_id: String,
    /// Who produced the record
    pub sender: Sender,
    /// Payload kind
    pub kind: MessageKind,
    /// How the record entered the system
    pub origin: EventOrigin,
    /// Message content
    pub payload: String,
    /// Free-form key-value metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Creation timestamp; determines the owning shard
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Create a record timestamped now
    pub fn new(
        subject_id: impl Into<String>,
        sender: Sender,
        kind: MessageKind,
        origin: EventOrigin,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            event_id: None,
            subject_id: subject_id.into(),
            sender,
            kind,
            origin,
            payload: payload.into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Set a pre-assigned event id
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Set the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A record as read back from a shard partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Backend-assigned row identity
    pub row_id: i64,
    /// Event id, origin-prefixed when generated
    pub event_id: String,
    pub subject_id: String,
    pub sender: Sender,
    pub kind: MessageKind,
    pub payload: String,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Recover the record's origin from its event id, when prefixed
    pub fn origin(&self) -> Option<EventOrigin> {
        EventOrigin::from_event_id(&self.event_id)
    }
}

/// Generate an event id for a record without one
///
/// Combines the origin prefix, the record timestamp in milliseconds, and a
/// random UUID component: practically unique within a shard, and the origin
/// is readable from the id alone.
pub fn generate_event_id(origin: EventOrigin, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        origin.id_prefix(),
        timestamp.timestamp_millis(),
        Uuid::new_v4().simple()
    )
}
