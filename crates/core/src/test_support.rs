// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared with other crates' tests via the `test-support`
//! feature.

use crate::facility::{Facility, Severity};
use crate::msg::{Message, MsgField};
use crate::payload::JsonPath;
use crate::timestamp::Timestamp;
use serde_json::Value;

/// Builder for messages in tests. Defaults to `user.notice` with a fixed
/// timestamp so assertions are reproducible.
pub struct MsgBuilder {
    epoch_ms: u64,
    facility: &'static str,
    severity: &'static str,
    hostname: Option<String>,
    tag: Option<String>,
    app_name: Option<String>,
    body: Option<String>,
    payload: Vec<(String, Value)>,
}

impl MsgBuilder {
    pub fn new() -> Self {
        Self {
            epoch_ms: 1_000_000_000_000,
            facility: "user",
            severity: "notice",
            hostname: None,
            tag: None,
            app_name: None,
            body: None,
            payload: Vec::new(),
        }
    }

    pub fn epoch_ms(mut self, ms: u64) -> Self {
        self.epoch_ms = ms;
        self
    }

    pub fn facility(mut self, f: &'static str) -> Self {
        self.facility = f;
        self
    }

    pub fn severity(mut self, s: &'static str) -> Self {
        self.severity = s;
        self
    }

    pub fn pri(mut self, facility: &'static str, severity: &'static str) -> Self {
        self.facility = facility;
        self.severity = severity;
        self
    }

    pub fn hostname(mut self, v: impl Into<String>) -> Self {
        self.hostname = Some(v.into());
        self
    }

    pub fn tag(mut self, v: impl Into<String>) -> Self {
        self.tag = Some(v.into());
        self
    }

    pub fn app_name(mut self, v: impl Into<String>) -> Self {
        self.app_name = Some(v.into());
        self
    }

    pub fn body(mut self, v: impl Into<String>) -> Self {
        self.body = Some(v.into());
        self
    }

    /// Add a top-level payload entry (`$!key`).
    pub fn payload_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.push((key.into(), value));
        self
    }

    #[allow(clippy::unwrap_used)]
    pub fn build(self) -> Message {
        let mut msg = Message::at(Timestamp::from_epoch_ms(self.epoch_ms));
        msg.set_pri(
            Facility::parse(self.facility).unwrap(),
            Severity::parse(self.severity).unwrap(),
        )
        .unwrap();
        if let Some(v) = &self.hostname {
            msg.set_field(MsgField::Hostname, v).unwrap();
        }
        if let Some(v) = &self.tag {
            msg.set_field(MsgField::Tag, v).unwrap();
        }
        if let Some(v) = &self.app_name {
            msg.set_field(MsgField::AppName, v).unwrap();
        }
        if let Some(v) = &self.body {
            msg.set_field(MsgField::Body, v).unwrap();
        }
        for (key, value) in self.payload {
            msg.merge_subtree(&JsonPath::parse(&key).unwrap(), value);
        }
        msg
    }
}

impl Default for MsgBuilder {
    fn default() -> Self {
        Self::new()
    }
}
