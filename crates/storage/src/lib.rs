// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sm-storage: the per-queue disk spool.
//!
//! Records spill to segmented files and are read back oldest-first
//! across restarts. The layout is deliberately simple: length-prefixed
//! blobs, one directory per queue, a tiny JSON state file for the
//! cursors.

mod spool;

pub use spool::{Spool, SpoolConfig, SpoolError};
