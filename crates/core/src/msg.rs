// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The message object.
//!
//! One `Message` carries one log record from parse to delivery. Envelope
//! and syslog fields are single-assignment; after the input hands the
//! record over (wrapped in `Arc`) they are frozen. The structured payload
//! is the only part that may still grow, guarded by the payload mutex.
//! Formatted views are derived on first request and then pinned, so
//! templates that reference the same property many times pay once.

use crate::clock::Clock;
use crate::facility::{self, Facility, Severity};
use crate::payload::JsonPath;
use crate::timestamp::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors from message construction and property access
#[derive(Debug, Error)]
pub enum MsgError {
    #[error("field {0} is already set")]
    AlreadySet(&'static str),
    #[error("facility {0} out of range")]
    BadFacility(u8),
    #[error("severity {0} out of range")]
    BadSeverity(u8),
    #[error("unknown facility: {0}")]
    UnknownFacility(String),
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
    #[error("malformed payload path: {0}")]
    BadPath(String),
    #[error("malformed timestamp: {0}")]
    BadTimestamp(String),
    #[error("unknown property: {0}")]
    UnknownProperty(String),
}

/// Single-assignment string fields settable during parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgField {
    Hostname,
    Tag,
    AppName,
    ProcId,
    MsgId,
    StructuredData,
    Body,
    Input,
    Sender,
}

crate::simple_display! {
    MsgField {
        Hostname => "hostname",
        Tag => "tag",
        AppName => "app-name",
        ProcId => "procid",
        MsgId => "msgid",
        StructuredData => "structured-data",
        Body => "msg",
        Input => "inputname",
        Sender => "fromhost",
    }
}

/// One log record.
#[derive(Debug)]
pub struct Message {
    received_at: Timestamp,
    origin_at: Option<Timestamp>,
    input: Option<SmolStr>,
    sender: Option<SmolStr>,
    facility: Facility,
    severity: Severity,
    pri_set: bool,
    hostname: Option<SmolStr>,
    tag: Option<SmolStr>,
    app_name: Option<SmolStr>,
    procid: Option<SmolStr>,
    msgid: Option<SmolStr>,
    structured_data: Option<String>,
    body: Option<String>,
    raw: Option<Vec<u8>>,

    // derived caches, write-once
    pri_text: OnceLock<String>,
    reported_3164: OnceLock<String>,
    reported_3339: OnceLock<String>,
    reported_sql: OnceLock<String>,
    generated_3164: OnceLock<String>,
    progname: OnceLock<SmolStr>,

    payload: Mutex<Value>,
}

impl Message {
    /// Create an empty message stamped with the receive time.
    ///
    /// PRI defaults to user.notice (13) until [`set_pri`](Self::set_pri)
    /// is called.
    pub fn new(clock: &impl Clock) -> Self {
        Self::at(Timestamp::now(clock))
    }

    /// Create an empty message with an explicit receive timestamp.
    pub fn at(received_at: Timestamp) -> Self {
        Self {
            received_at,
            origin_at: None,
            input: None,
            sender: None,
            facility: Facility::USER,
            severity: Severity::NOTICE,
            pri_set: false,
            hostname: None,
            tag: None,
            app_name: None,
            procid: None,
            msgid: None,
            structured_data: None,
            body: None,
            raw: None,
            pri_text: OnceLock::new(),
            reported_3164: OnceLock::new(),
            reported_3339: OnceLock::new(),
            reported_sql: OnceLock::new(),
            generated_3164: OnceLock::new(),
            progname: OnceLock::new(),
            payload: Mutex::new(Value::Null),
        }
    }

    /// Set facility and severity. Fails with `AlreadySet` on a second call.
    pub fn set_pri(&mut self, facility: Facility, severity: Severity) -> Result<(), MsgError> {
        if self.pri_set {
            return Err(MsgError::AlreadySet("pri"));
        }
        self.facility = facility;
        self.severity = severity;
        self.pri_set = true;
        Ok(())
    }

    /// Set a single-assignment string field.
    pub fn set_field(&mut self, field: MsgField, value: &str) -> Result<(), MsgError> {
        fn put<T: for<'a> From<&'a str>>(
            slot: &mut Option<T>,
            name: &'static str,
            value: &str,
        ) -> Result<(), MsgError> {
            if slot.is_some() {
                return Err(MsgError::AlreadySet(name));
            }
            *slot = Some(T::from(value));
            Ok(())
        }
        match field {
            MsgField::Hostname => put(&mut self.hostname, "hostname", value),
            MsgField::Tag => put(&mut self.tag, "tag", value),
            MsgField::AppName => put(&mut self.app_name, "app-name", value),
            MsgField::ProcId => put(&mut self.procid, "procid", value),
            MsgField::MsgId => put(&mut self.msgid, "msgid", value),
            MsgField::StructuredData => put(&mut self.structured_data, "structured-data", value),
            MsgField::Body => put(&mut self.body, "msg", value),
            MsgField::Input => put(&mut self.input, "inputname", value),
            MsgField::Sender => put(&mut self.sender, "fromhost", value),
        }
    }

    /// Set the origin timestamp as parsed from the wire.
    pub fn set_origin_at(&mut self, ts: Timestamp) -> Result<(), MsgError> {
        if self.origin_at.is_some() {
            return Err(MsgError::AlreadySet("timereported"));
        }
        self.origin_at = Some(ts);
        Ok(())
    }

    /// Attach the undecoded wire bytes.
    pub fn set_raw(&mut self, raw: Vec<u8>) -> Result<(), MsgError> {
        if self.raw.is_some() {
            return Err(MsgError::AlreadySet("rawmsg"));
        }
        self.raw = Some(raw);
        Ok(())
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn pri(&self) -> u8 {
        facility::pri(self.facility, self.severity)
    }

    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }

    /// Origin timestamp; falls back to the receive time when the wire
    /// carried none.
    pub fn reported_at(&self) -> Timestamp {
        self.origin_at.unwrap_or(self.received_at)
    }

    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or("")
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }

    pub fn app_name(&self) -> &str {
        // RFC 5424 APP-NAME, with the legacy program name as fallback
        match self.app_name.as_deref() {
            Some(name) => name,
            None => self.progname(),
        }
    }

    pub fn procid(&self) -> &str {
        self.procid.as_deref().unwrap_or("-")
    }

    pub fn msgid(&self) -> &str {
        self.msgid.as_deref().unwrap_or("-")
    }

    pub fn structured_data(&self) -> &str {
        self.structured_data.as_deref().unwrap_or("-")
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn raw(&self) -> &[u8] {
        match &self.raw {
            Some(raw) => raw,
            None => self.body().as_bytes(),
        }
    }

    pub fn input(&self) -> &str {
        self.input.as_deref().unwrap_or("")
    }

    pub fn sender(&self) -> &str {
        self.sender.as_deref().unwrap_or("")
    }

    /// Formatted `<PRI>` string, derived once.
    pub fn pri_text(&self) -> &str {
        self.pri_text.get_or_init(|| format!("<{}>", self.pri()))
    }

    pub fn time_reported_3164(&self) -> &str {
        self.reported_3164.get_or_init(|| self.reported_at().rfc3164())
    }

    pub fn time_reported_3339(&self) -> &str {
        self.reported_3339.get_or_init(|| self.reported_at().rfc3339())
    }

    pub fn time_reported_sql(&self) -> &str {
        self.reported_sql.get_or_init(|| self.reported_at().sql())
    }

    pub fn time_generated_3164(&self) -> &str {
        self.generated_3164.get_or_init(|| self.received_at.rfc3164())
    }

    /// Program name: the tag with its instance suffix removed
    /// (`sshd[123]` → `sshd`).
    pub fn progname(&self) -> &str {
        self.progname.get_or_init(|| {
            let tag = self.tag();
            let end = tag
                .find(|c: char| c == '[' || c == ':' || c == '/' || c.is_whitespace())
                .unwrap_or(tag.len());
            SmolStr::new(&tag[..end])
        })
    }

    /// Insert `subtree` at `path` in the structured payload, replacing any
    /// existing subtree there.
    pub fn merge_subtree(&self, path: &JsonPath, subtree: Value) {
        let mut payload = self.payload.lock();
        path.set(&mut payload, subtree);
    }

    /// Rewrite dots in all payload keys to `sep`.
    pub fn de_dot_payload(&self, sep: &str) {
        let mut payload = self.payload.lock();
        let taken = payload.take();
        *payload = crate::payload::de_dot(taken, sep);
    }

    /// Clone the subtree at `path` out of the payload.
    pub fn payload_value(&self, path: &JsonPath) -> Option<Value> {
        let payload = self.payload.lock();
        path.lookup(&payload).cloned()
    }

    /// Render the subtree at `path` as text: strings verbatim, everything
    /// else as compact JSON.
    pub fn payload_text(&self, path: &JsonPath) -> Option<String> {
        let payload = self.payload.lock();
        let v = path.lookup(&payload)?;
        Some(match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Clone the whole payload tree.
    pub fn payload_snapshot(&self) -> Value {
        self.payload.lock().clone()
    }

    /// Deep copy with fresh derived caches and a private payload tree.
    pub fn duplicate(&self) -> Self {
        Self::from_record(self.to_record())
    }

    /// Snapshot for spooling. Derived caches are not carried; they are
    /// recomputed on demand after restore.
    pub fn to_record(&self) -> MsgRecord {
        MsgRecord {
            received_at: self.received_at,
            origin_at: self.origin_at,
            input: self.input.clone(),
            sender: self.sender.clone(),
            facility: self.facility,
            severity: self.severity,
            hostname: self.hostname.clone(),
            tag: self.tag.clone(),
            app_name: self.app_name.clone(),
            procid: self.procid.clone(),
            msgid: self.msgid.clone(),
            structured_data: self.structured_data.clone(),
            body: self.body.clone(),
            raw: self.raw.clone(),
            payload: self.payload_snapshot(),
        }
    }

    pub fn from_record(rec: MsgRecord) -> Self {
        let mut msg = Self::at(rec.received_at);
        msg.origin_at = rec.origin_at;
        msg.input = rec.input;
        msg.sender = rec.sender;
        msg.facility = rec.facility;
        msg.severity = rec.severity;
        msg.pri_set = true;
        msg.hostname = rec.hostname;
        msg.tag = rec.tag;
        msg.app_name = rec.app_name;
        msg.procid = rec.procid;
        msg.msgid = rec.msgid;
        msg.structured_data = rec.structured_data;
        msg.body = rec.body;
        msg.raw = rec.raw;
        msg.payload = Mutex::new(rec.payload);
        msg
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        // the payload may be arbitrarily deep; hand it to the worklist
        // teardown instead of Value's recursive destructor
        crate::payload::drop_tree(self.payload.lock().take());
    }
}

/// Serializable snapshot of a [`Message`], the spool record format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRecord {
    pub received_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SmolStr>,
    pub facility: Facility,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procid: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgid: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
    #[serde(default)]
    pub payload: Value,
}

#[cfg(test)]
#[path = "msg_tests.rs"]
mod tests;
