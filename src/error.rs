//! Error handling for chatvault
//!
//! This module provides error types and result aliases for chatvault operations.

use std::io;
use thiserror::Error;

/// Errors that can occur in chatvault operations
#[derive(Error, Debug)]
pub enum Error {
    /// An identifier failed the whitelist check and was rejected before
    /// reaching the storage backend
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Creating a shard partition failed for a reason other than the
    /// partition already existing
    #[error("Shard create failed for {shard}: {message}")]
    ShardCreateFailed {
        shard: String,
        message: String,
    },

    /// A row insert failed or the backend returned no identity
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// The remote usage source was unreachable or returned malformed data
    #[error("Quota fetch failed: {0}")]
    QuotaFetchFailed(String),

    /// Errors raised by the storage backend outside the typed kinds above
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error type for other cases
    #[error("{0}")]
    Other(String),
}

/// Result type for chatvault operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid identifier error
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }

    /// Create a new shard create error
    pub fn shard_create_failed(shard: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShardCreateFailed {
            shard: shard.into(),
            message: message.into(),
        }
    }

    /// Create a new write error
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed(message.into())
    }

    /// Create a new quota fetch error
    pub fn quota_fetch_failed(message: impl Into<String>) -> Self {
        Self::QuotaFetchFailed(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Check if this is an invalid identifier error
    pub fn is_invalid_identifier(&self) -> bool {
        matches!(self, Self::InvalidIdentifier(_))
    }

    /// Check if this is a quota fetch error
    pub fn is_quota_fetch_failed(&self) -> bool {
        matches!(self, Self::QuotaFetchFailed(_))
    }

    /// Check if the caller may retry the failed operation
    ///
    /// Shard creation and row writes are retryable; a rejected identifier
    /// will never succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ShardCreateFailed { .. } | Self::WriteFailed(_) | Self::QuotaFetchFailed(_)
        )
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
