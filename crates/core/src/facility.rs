// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syslog facility and severity codes.
//!
//! PRI is `facility * 8 + severity` per RFC 3164. Facilities above 23
//! and severities above 7 are rejected at construction, so a stored
//! value is always a valid table index.

use crate::msg::MsgError;
use serde::{Deserialize, Serialize};

/// Number of defined syslog facilities (0..=23).
pub const FACILITY_COUNT: usize = 24;

/// Syslog facility code, 0..=23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Facility(u8);

/// Syslog severity code, 0 (emerg) ..= 7 (debug).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

static FACILITY_NAMES: [&str; FACILITY_COUNT] = [
    "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news", "uucp", "cron", "authpriv",
    "ftp", "ntp", "audit", "alert", "clock", "local0", "local1", "local2", "local3", "local4",
    "local5", "local6", "local7",
];

static SEVERITY_NAMES: [&str; 8] =
    ["emerg", "alert", "crit", "err", "warning", "notice", "info", "debug"];

impl Facility {
    pub const KERN: Facility = Facility(0);
    pub const USER: Facility = Facility(1);
    pub const DAEMON: Facility = Facility(3);
    pub const SYSLOG: Facility = Facility(5);
    pub const LOCAL0: Facility = Facility(16);

    pub fn new(code: u8) -> Result<Self, MsgError> {
        if usize::from(code) < FACILITY_COUNT {
            Ok(Self(code))
        } else {
            Err(MsgError::BadFacility(code))
        }
    }

    /// Parse either a keyword ("mail") or a numeric code ("2").
    pub fn parse(s: &str) -> Result<Self, MsgError> {
        if let Some(idx) = FACILITY_NAMES.iter().position(|n| s.eq_ignore_ascii_case(n)) {
            return Ok(Self(idx as u8));
        }
        match s.parse::<u8>() {
            Ok(code) => Self::new(code),
            Err(_) => Err(MsgError::UnknownFacility(s.to_string())),
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn keyword(self) -> &'static str {
        FACILITY_NAMES[usize::from(self.0)]
    }
}

impl Severity {
    pub const EMERG: Severity = Severity(0);
    pub const ERR: Severity = Severity(3);
    pub const WARNING: Severity = Severity(4);
    pub const NOTICE: Severity = Severity(5);
    pub const INFO: Severity = Severity(6);
    pub const DEBUG: Severity = Severity(7);

    pub fn new(code: u8) -> Result<Self, MsgError> {
        if code < 8 {
            Ok(Self(code))
        } else {
            Err(MsgError::BadSeverity(code))
        }
    }

    /// Parse either a keyword ("err") or a numeric code ("3").
    pub fn parse(s: &str) -> Result<Self, MsgError> {
        if let Some(idx) = SEVERITY_NAMES.iter().position(|n| s.eq_ignore_ascii_case(n)) {
            return Ok(Self(idx as u8));
        }
        // historic aliases still seen in selector lines
        if s.eq_ignore_ascii_case("warn") {
            return Ok(Self(4));
        }
        if s.eq_ignore_ascii_case("error") {
            return Ok(Self(3));
        }
        if s.eq_ignore_ascii_case("panic") {
            return Ok(Self(0));
        }
        match s.parse::<u8>() {
            Ok(code) => Self::new(code),
            Err(_) => Err(MsgError::UnknownSeverity(s.to_string())),
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn keyword(self) -> &'static str {
        SEVERITY_NAMES[usize::from(self.0)]
    }

    /// Bit for this severity in a priority-bitmap entry.
    pub fn bit(self) -> u8 {
        1 << self.0
    }
}

impl TryFrom<u8> for Facility {
    type Error = MsgError;

    fn try_from(code: u8) -> Result<Self, MsgError> {
        Self::new(code)
    }
}

impl From<Facility> for u8 {
    fn from(f: Facility) -> u8 {
        f.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = MsgError;

    fn try_from(code: u8) -> Result<Self, MsgError> {
        Self::new(code)
    }
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> u8 {
        s.0
    }
}

/// Compose the RFC 3164 PRI value.
pub fn pri(facility: Facility, severity: Severity) -> u8 {
    facility.0 * 8 + severity.0
}

/// Split a PRI value into facility and severity.
pub fn split_pri(value: u8) -> Result<(Facility, Severity), MsgError> {
    let facility = Facility::new(value / 8)?;
    let severity = Severity(value % 8);
    Ok((facility, severity))
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
#[path = "facility_tests.rs"]
mod tests;
