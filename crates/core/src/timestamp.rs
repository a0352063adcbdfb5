// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock timestamps and their syslog renderings.

use crate::clock::Clock;
use crate::msg::MsgError;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A wall-clock timestamp with sub-second precision.
///
/// Kept with its original UTC offset so forwarded records preserve the
/// sender's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    pub fn now(clock: &impl Clock) -> Self {
        Self::from_epoch_ms(clock.epoch_ms())
    }

    pub fn from_epoch_ms(ms: u64) -> Self {
        let utc = Utc
            .timestamp_millis_opt(ms as i64)
            .single()
            .unwrap_or_else(|| Utc.timestamp_millis_opt(0).earliest().unwrap_or_default());
        Self(utc.fixed_offset())
    }

    /// Parse an RFC 3339 timestamp as found in RFC 5424 headers.
    pub fn parse_rfc3339(s: &str) -> Result<Self, MsgError> {
        DateTime::parse_from_rfc3339(s)
            .map(Self)
            .map_err(|_| MsgError::BadTimestamp(s.to_string()))
    }

    pub fn epoch_ms(&self) -> u64 {
        self.0.timestamp_millis().max(0) as u64
    }

    /// Legacy RFC 3164 shape: `Mmm dd hh:mm:ss` with a space-padded day.
    pub fn rfc3164(&self) -> String {
        self.0.format("%b %e %H:%M:%S").to_string()
    }

    /// RFC 3339 shape with millisecond precision.
    pub fn rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
    }

    /// ISO-SQL shape: `YYYY-MM-DD hh:mm:ss`.
    pub fn sql(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn year(&self) -> i32 {
        chrono::Datelike::year(&self.0)
    }

    pub fn month(&self) -> u32 {
        chrono::Datelike::month(&self.0)
    }

    pub fn day(&self) -> u32 {
        chrono::Datelike::day(&self.0)
    }

    pub fn hour(&self) -> u32 {
        chrono::Timelike::hour(&self.0)
    }

    pub fn minute(&self) -> u32 {
        chrono::Timelike::minute(&self.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rfc3339())
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
