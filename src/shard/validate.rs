//! Identifier validation for schema-affecting operations
//!
//! Shard names are built from time values that callers influence, so every
//! dynamically constructed identifier passes through this module before it is
//! interpolated into a DDL or DML statement. The whitelist is deliberately
//! strict: letters, digits, and underscores only, bounded length.

use crate::config::DEFAULT_MAX_IDENTIFIER_LEN;
use crate::error::{Error, Result};

/// Check whether a candidate is a safe identifier at the default length limit
pub fn is_safe_identifier(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= DEFAULT_MAX_IDENTIFIER_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Whitelist validator for storage identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityValidator {
    max_len: usize,
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDENTIFIER_LEN)
    }
}

impl SecurityValidator {
    /// Create a validator with a custom maximum identifier length
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// The maximum identifier length this validator accepts
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Validate a candidate identifier
    ///
    /// Accepts only non-empty `[A-Za-z0-9_]+` strings up to the configured
    /// maximum length. Anything else, including quotes, backticks,
    /// whitespace, and path separators, is rejected.
    pub fn validate(&self, candidate: &str) -> Result<()> {
        if candidate.is_empty() {
            return Err(Error::invalid_identifier("identifier is empty"));
        }

        if candidate.len() > self.max_len {
            return Err(Error::invalid_identifier(format!(
                "identifier exceeds {} characters: {} characters",
                self.max_len,
                candidate.len()
            )));
        }

        for (pos, byte) in candidate.bytes().enumerate() {
            if !byte.is_ascii_alphanumeric() && byte != b'_' {
                return Err(Error::invalid_identifier(format!(
                    "identifier contains disallowed byte 0x{:02x} at position {}",
                    byte, pos
                )));
            }
        }

        Ok(())
    }
}
