//! Calendar-month shard name resolution
//!
//! Maps timestamps to shard identifiers of the form `<prefix>_<year>_<month>`
//! and parses them back into month time ranges. Resolution always uses the
//! fixed timezone configured for the store, never the caller's local time, so
//! two timestamps in the same calendar month yield the identical shard id on
//! every host.

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::shard::validate::SecurityValidator;
use crate::shard::ShardId;

/// Resolves timestamps to calendar-month shard identifiers
#[derive(Debug, Clone)]
pub struct ShardNameResolver {
    prefix: String,
    timezone: FixedOffset,
}

impl ShardNameResolver {
    /// Create a resolver for a namespace prefix and fixed timezone
    ///
    /// The prefix must itself be a safe identifier short enough to leave room
    /// for the `_YYYY_MM` suffix; a malformed prefix is the only failure mode
    /// of resolution, so it is rejected here, at construction.
    pub fn new(prefix: impl Into<String>, timezone: FixedOffset, max_identifier_len: usize) -> Result<Self> {
        let prefix = prefix.into();

        let validator = SecurityValidator::new(max_identifier_len);
        validator.validate(&prefix)?;
        if prefix.len() + 8 > max_identifier_len {
            return Err(Error::invalid_identifier(format!(
                "prefix {:?} leaves no room for the _YYYY_MM suffix",
                prefix
            )));
        }

        Ok(Self { prefix, timezone })
    }

    /// The namespace prefix shard ids are built from
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The fixed timezone used for month resolution
    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Resolve a timestamp to its shard id
    ///
    /// Pure and deterministic: timestamps in the same calendar month of the
    /// fixed timezone map to the identical id, with a zero-padded month.
    pub fn resolve(&self, timestamp: DateTime<Utc>) -> ShardId {
        let local = timestamp.with_timezone(&self.timezone);
        format!("{}_{:04}_{:02}", self.prefix, local.year(), local.month())
    }

    /// Parse a shard id back into its month's UTC time range
    ///
    /// Returns the half-open interval `[start, end)` covering the calendar
    /// month in the fixed timezone.
    pub fn parse(&self, shard_id: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let suffix = shard_id
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| {
                Error::invalid_identifier(format!(
                    "shard id {:?} does not start with prefix {:?}",
                    shard_id, self.prefix
                ))
            })?;

        let (year_part, month_part) = suffix.split_once('_').ok_or_else(|| {
            Error::invalid_identifier(format!("shard id {:?} is missing a month part", shard_id))
        })?;

        if year_part.len() != 4 || month_part.len() != 2 {
            return Err(Error::invalid_identifier(format!(
                "shard id {:?} does not match <prefix>_YYYY_MM",
                shard_id
            )));
        }

        let year: i32 = year_part.parse().map_err(|_| {
            Error::invalid_identifier(format!("invalid year in shard id {:?}", shard_id))
        })?;
        let month: u32 = month_part.parse().map_err(|_| {
            Error::invalid_identifier(format!("invalid month in shard id {:?}", shard_id))
        })?;

        if !(1..=12).contains(&month) {
            return Err(Error::invalid_identifier(format!(
                "month out of range in shard id {:?}",
                shard_id
            )));
        }

        let start = self.month_start(year, month)?;
        let end = if month == 12 {
            self.month_start(year + 1, 1)?
        } else {
            self.month_start(year, month + 1)?
        };

        Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }

    fn month_start(&self, year: i32, month: u32) -> Result<DateTime<FixedOffset>> {
        self.timezone
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| {
                Error::invalid_identifier(format!("invalid month {:04}-{:02}", year, month))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_resolver() -> ShardNameResolver {
        ShardNameResolver::new("chat_events", Utc.fix(), 64).unwrap()
    }

    use chrono::Offset;

    #[test]
    fn test_same_month_resolves_identically() {
        let resolver = utc_resolver();

        let first = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mid = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 45).unwrap();
        let last = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();

        assert_eq!(resolver.resolve(first), "chat_events_2024_03");
        assert_eq!(resolver.resolve(mid), resolver.resolve(first));
        assert_eq!(resolver.resolve(last), resolver.resolve(first));
    }

    #[test]
    fn test_different_months_resolve_differently() {
        let resolver = utc_resolver();

        let march = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let april = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let next_year = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(resolver.resolve(april), "chat_events_2024_04");
        assert_ne!(resolver.resolve(march), resolver.resolve(april));
        assert_ne!(resolver.resolve(march), resolver.resolve(next_year));
    }

    #[test]
    fn test_month_is_zero_padded() {
        let resolver = utc_resolver();
        let january = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();
        assert_eq!(resolver.resolve(january), "chat_events_2024_01");
    }

    #[test]
    fn test_fixed_timezone_not_utc() {
        // UTC-1: half past midnight UTC on June 1 is still May locally
        let tz = FixedOffset::east_opt(-3600).unwrap();
        let resolver = ShardNameResolver::new("chat_events", tz, 64).unwrap();

        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap();
        assert_eq!(resolver.resolve(ts), "chat_events_2024_05");

        let later = Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap();
        assert_eq!(resolver.resolve(later), "chat_events_2024_06");
    }

    #[test]
    fn test_parse_round_trip() {
        let resolver = utc_resolver();
        let ts = Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap();

        let shard_id = resolver.resolve(ts);
        let (start, end) = resolver.parse(&shard_id).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(ts >= start && ts < end);
    }

    #[test]
    fn test_parse_december_rolls_over_year() {
        let resolver = utc_resolver();

        let (start, end) = resolver.parse("chat_events_2024_12").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        let resolver = utc_resolver();

        for id in [
            "other_prefix_2024_01",
            "chat_events_2024",
            "chat_events_24_01",
            "chat_events_2024_1",
            "chat_events_2024_13",
            "chat_events_2024_00",
            "chat_events_abcd_01",
        ] {
            assert!(resolver.parse(id).is_err(), "accepted malformed id: {}", id);
        }
    }

    #[test]
    fn test_rejects_malformed_prefix() {
        assert!(ShardNameResolver::new("chat events", Utc.fix(), 64).is_err());
        assert!(ShardNameResolver::new("", Utc.fix(), 64).is_err());
        // A 60-char prefix cannot fit the suffix within 64 characters
        assert!(ShardNameResolver::new("x".repeat(60), Utc.fix(), 64).is_err());
    }
}
