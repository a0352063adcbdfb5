// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property resolution.
//!
//! A textual property name is parsed once, at configuration time, into a
//! [`Property`] descriptor so hot-path lookups never touch strings.
//! Resolution borrows from the message wherever the value is frozen or
//! pinned; payload lookups copy out under the payload mutex.

use crate::msg::{Message, MsgError};
use crate::payload::JsonPath;
use std::borrow::Cow;

/// Identifier of a resolvable message property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropId {
    Msg,
    RawMsg,
    Hostname,
    SyslogTag,
    ProgramName,
    AppName,
    ProcId,
    MsgId,
    StructuredData,
    Pri,
    PriText,
    Facility,
    FacilityText,
    Severity,
    SeverityText,
    TimeReported,
    TimeReported3339,
    TimeReportedSql,
    TimeGenerated,
    FromHost,
    InputName,
    /// JSON-path lookup into the structured payload.
    Cee,
}

/// A pre-parsed property descriptor: id plus optional payload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    id: PropId,
    path: Option<JsonPath>,
}

impl Property {
    pub fn from_id(id: PropId) -> Self {
        Self { id, path: None }
    }

    pub fn cee(path: JsonPath) -> Self {
        Self { id: PropId::Cee, path: Some(path) }
    }

    /// Parse a textual property name.
    ///
    /// `$!`-prefixed names address the structured payload; everything else
    /// must be a known property name (aliases included).
    pub fn parse(name: &str) -> Result<Self, MsgError> {
        if name.starts_with("$!") || name.starts_with('!') {
            return Ok(Self::cee(JsonPath::parse(name)?));
        }
        let id = match name {
            "msg" => PropId::Msg,
            "rawmsg" => PropId::RawMsg,
            "hostname" | "source" => PropId::Hostname,
            "syslogtag" => PropId::SyslogTag,
            "programname" => PropId::ProgramName,
            "app-name" => PropId::AppName,
            "procid" => PropId::ProcId,
            "msgid" => PropId::MsgId,
            "structured-data" => PropId::StructuredData,
            "pri" => PropId::Pri,
            "pri-text" => PropId::PriText,
            "syslogfacility" => PropId::Facility,
            "syslogfacility-text" => PropId::FacilityText,
            "syslogseverity" | "syslogpriority" => PropId::Severity,
            "syslogseverity-text" | "syslogpriority-text" => PropId::SeverityText,
            "timereported" | "timestamp" => PropId::TimeReported,
            "timereported-rfc3339" => PropId::TimeReported3339,
            "timereported-sql" => PropId::TimeReportedSql,
            "timegenerated" => PropId::TimeGenerated,
            "fromhost" => PropId::FromHost,
            "inputname" => PropId::InputName,
            other => return Err(MsgError::UnknownProperty(other.to_string())),
        };
        Ok(Self::from_id(id))
    }

    pub fn id(&self) -> PropId {
        self.id
    }

    pub fn path(&self) -> Option<&JsonPath> {
        self.path.as_ref()
    }

    /// Resolve against a message.
    ///
    /// Returns `None` only for payload paths that do not exist; plain
    /// properties always resolve (possibly to their empty/`-` defaults).
    pub fn resolve<'m>(&self, msg: &'m Message) -> Option<Cow<'m, str>> {
        let v: Cow<'m, str> = match self.id {
            PropId::Msg => Cow::Borrowed(msg.body()),
            PropId::RawMsg => String::from_utf8_lossy(msg.raw()),
            PropId::Hostname => Cow::Borrowed(msg.hostname()),
            PropId::SyslogTag => Cow::Borrowed(msg.tag()),
            PropId::ProgramName => Cow::Borrowed(msg.progname()),
            PropId::AppName => Cow::Borrowed(msg.app_name()),
            PropId::ProcId => Cow::Borrowed(msg.procid()),
            PropId::MsgId => Cow::Borrowed(msg.msgid()),
            PropId::StructuredData => Cow::Borrowed(msg.structured_data()),
            PropId::Pri => Cow::Owned(msg.pri().to_string()),
            PropId::PriText => Cow::Borrowed(msg.pri_text()),
            PropId::Facility => Cow::Owned(msg.facility().code().to_string()),
            PropId::FacilityText => Cow::Borrowed(msg.facility().keyword()),
            PropId::Severity => Cow::Owned(msg.severity().code().to_string()),
            PropId::SeverityText => Cow::Borrowed(msg.severity().keyword()),
            PropId::TimeReported => Cow::Borrowed(msg.time_reported_3164()),
            PropId::TimeReported3339 => Cow::Borrowed(msg.time_reported_3339()),
            PropId::TimeReportedSql => Cow::Borrowed(msg.time_reported_sql()),
            PropId::TimeGenerated => Cow::Borrowed(msg.time_generated_3164()),
            PropId::FromHost => Cow::Borrowed(msg.sender()),
            PropId::InputName => Cow::Borrowed(msg.input()),
            PropId::Cee => {
                let path = self.path.as_ref()?;
                return msg.payload_text(path).map(Cow::Owned);
            }
        };
        Some(v)
    }
}

#[cfg(test)]
#[path = "props_tests.rs"]
mod tests;
