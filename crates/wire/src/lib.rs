// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sm-wire: syslog stream framing and the compression envelope.
//!
//! Two framings per RFC 6587: octet-stuffing (`SYSLOG-MSG LF`) and
//! octet-counting (`MSG-LEN SP SYSLOG-MSG`). Compressed payloads carry a
//! leading `z` marker and must always travel octet-counted, because the
//! deflate stream may contain any byte including LF.

mod compress;
mod frame;

pub use compress::{
    compress_payload, decompress_payload, is_compressed, COMPRESSION_MARKER, MIN_COMPRESS_SIZE,
};
pub use frame::{encode_frame, FrameDecoder, FrameError, Framing, MAX_FRAME_LEN};
