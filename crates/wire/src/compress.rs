// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `z`-marked zlib envelope.
//!
//! Compression is attempted only above a size threshold; the compressed
//! form is used only when it actually shrinks the payload (marker byte
//! included). Receivers distinguish compressed frames by the leading `z`,
//! which cannot start a syslog message (those begin with `<`).

use crate::frame::FrameError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Marker byte prefixed to compressed payloads.
pub const COMPRESSION_MARKER: u8 = b'z';

/// Payloads at or below this size are never compressed.
pub const MIN_COMPRESS_SIZE: usize = 1024;

/// Compress `payload` at `level`, returning the marked envelope, or
/// `None` whenever the payload should travel uncompressed: level 0, too
/// small, no size gain, or a deflate failure.
pub fn compress_payload(payload: &[u8], level: u32, min_size: usize) -> Option<Vec<u8>> {
    if level == 0 || payload.len() <= min_size {
        return None;
    }
    let mut out = Vec::with_capacity(payload.len() / 2 + 1);
    out.push(COMPRESSION_MARKER);
    let mut encoder = ZlibEncoder::new(out, Compression::new(level.min(9)));
    if encoder.write_all(payload).is_err() {
        return None;
    }
    let out = encoder.finish().ok()?;
    if out.len() < payload.len() {
        Some(out)
    } else {
        None
    }
}

pub fn is_compressed(frame: &[u8]) -> bool {
    frame.first() == Some(&COMPRESSION_MARKER)
}

/// Strip the marker and inflate.
pub fn decompress_payload(frame: &[u8]) -> Result<Vec<u8>, FrameError> {
    let body = match frame.split_first() {
        Some((&COMPRESSION_MARKER, body)) => body,
        _ => return Err(FrameError::NotCompressed),
    };
    let mut decoder = ZlibDecoder::new(body);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|_| FrameError::BadDeflate)?;
    Ok(out)
}

#[cfg(test)]
#[path = "compress_tests.rs"]
mod tests;
