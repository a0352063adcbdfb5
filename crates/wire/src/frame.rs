// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-stream framing for syslog over TCP.

use thiserror::Error;

/// Upper bound accepted for a single octet-counted frame.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("octet-counted frame does not start with a digit")]
    BadLengthPrefix,
    #[error("octet-counted frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("frame is not marked compressed")]
    NotCompressed,
    #[error("compressed payload did not inflate")]
    BadDeflate,
}

/// Message delimiting convention on a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// `SYSLOG-MSG LF` — the traditional mode.
    #[default]
    OctetStuffing,
    /// `MSG-LEN SP SYSLOG-MSG` — required for payloads that may contain LF.
    OctetCounting,
}

/// Frame one payload for the wire.
///
/// Octet-stuffing appends a terminating LF only when the payload does not
/// already end in one; octet-counting prefixes the decimal payload length
/// and a space, and adds no terminator.
pub fn encode_frame(payload: &[u8], framing: Framing) -> Vec<u8> {
    match framing {
        Framing::OctetStuffing => {
            let mut out = Vec::with_capacity(payload.len() + 1);
            out.extend_from_slice(payload);
            if out.last() != Some(&b'\n') {
                out.push(b'\n');
            }
            out
        }
        Framing::OctetCounting => {
            let header = format!("{} ", payload.len());
            let mut out = Vec::with_capacity(header.len() + payload.len());
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(payload);
            out
        }
    }
}

/// Incremental decoder for a stream of frames, one framing per session.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    framing: Framing,
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self { framing, buf: Vec::new() }
    }

    /// Feed received bytes into the decoder.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract the next complete frame, or `None` when more bytes are
    /// needed.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        match self.framing {
            Framing::OctetStuffing => {
                let Some(nl) = self.buf.iter().position(|&b| b == b'\n') else {
                    return Ok(None);
                };
                let mut rest = self.buf.split_off(nl + 1);
                std::mem::swap(&mut self.buf, &mut rest);
                let mut frame = rest;
                frame.pop(); // the LF terminator
                Ok(Some(frame))
            }
            Framing::OctetCounting => {
                let Some(sp) = self.buf.iter().position(|&b| b == b' ') else {
                    if self.buf.len() > 20 || self.buf.iter().any(|b| !b.is_ascii_digit()) {
                        return Err(FrameError::BadLengthPrefix);
                    }
                    return Ok(None);
                };
                let digits = &self.buf[..sp];
                if digits.is_empty() || digits.iter().any(|b| !b.is_ascii_digit()) {
                    return Err(FrameError::BadLengthPrefix);
                }
                let len: usize = std::str::from_utf8(digits)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(FrameError::BadLengthPrefix)?;
                if len > MAX_FRAME_LEN {
                    return Err(FrameError::FrameTooLarge { len, max: MAX_FRAME_LEN });
                }
                if self.buf.len() < sp + 1 + len {
                    return Ok(None);
                }
                let mut rest = self.buf.split_off(sp + 1 + len);
                std::mem::swap(&mut self.buf, &mut rest);
                let frame = rest[sp + 1..].to_vec();
                Ok(Some(frame))
            }
        }
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
