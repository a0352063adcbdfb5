// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sm-core: message object and property model for the sawmill engine.
//!
//! A [`Message`] carries one log record. Its envelope and syslog fields are
//! frozen once the record enters a ruleset; only the structured payload may
//! grow, under the payload mutex. Formatted views (PRI, timestamps, program
//! name) are derived lazily and pinned on first request.

pub mod macros;

pub mod clock;
pub mod facility;
pub mod msg;
pub mod payload;
pub mod props;
pub mod timestamp;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use facility::{Facility, Severity};
pub use msg::{Message, MsgError, MsgField, MsgRecord};
pub use payload::{de_dot, drop_tree, JsonPath};
pub use props::{PropId, Property};
#[cfg(any(test, feature = "test-support"))]
pub use test_support::MsgBuilder;
pub use timestamp::Timestamp;
