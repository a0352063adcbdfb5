// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segmented spool files.
//!
//! One spool per queue. Records are `u32`-length-prefixed blobs appended
//! to the current write segment; when a segment reaches its size limit a
//! new one is opened. Reads consume oldest-first and delete fully-drained
//! segments. The read cursor is persisted at checkpoints, so a crash
//! re-reads at most the records since the last checkpoint (delivery is
//! at-least-once); a clean shutdown checkpoints and loses nothing.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("spool io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("spool directory {0} is locked by another process")]
    Locked(PathBuf),
    #[error("spool state file is unreadable: {0}")]
    BadState(String),
}

#[derive(Debug, Clone)]
pub struct SpoolConfig {
    pub dir: PathBuf,
    pub max_segment_bytes: u64,
}

impl SpoolConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), max_segment_bytes: 8 * 1024 * 1024 }
    }

    pub fn max_segment_bytes(mut self, bytes: u64) -> Self {
        self.max_segment_bytes = bytes;
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SpoolState {
    write_seg: u64,
    read_seg: u64,
    read_off: u64,
}

/// A disk spool holding not-yet-delivered records.
pub struct Spool {
    dir: PathBuf,
    max_segment_bytes: u64,
    _lock: File,
    write_seg: u64,
    write_file: File,
    write_off: u64,
    read_seg: u64,
    read_off: u64,
    read_file: Option<File>,
    records: u64,
}

impl Spool {
    pub fn open(config: SpoolConfig) -> Result<Self, SpoolError> {
        std::fs::create_dir_all(&config.dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(config.dir.join("lock"))?;
        lock.try_lock_exclusive().map_err(|_| SpoolError::Locked(config.dir.clone()))?;

        let state = load_state(&config.dir)?;
        let write_path = segment_path(&config.dir, state.write_seg);
        let mut write_file =
            OpenOptions::new().create(true).append(true).read(true).open(&write_path)?;
        let write_off = repair_tail(&mut write_file)?;

        let mut spool = Self {
            dir: config.dir,
            max_segment_bytes: config.max_segment_bytes,
            _lock: lock,
            write_seg: state.write_seg,
            write_file,
            write_off,
            read_seg: state.read_seg,
            read_off: state.read_off,
            read_file: None,
            records: 0,
        };
        spool.records = spool.count_records()?;
        Ok(spool)
    }

    /// Records currently readable.
    pub fn len(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Append one record to the write segment, rotating first when the
    /// segment is full.
    pub fn append(&mut self, rec: &[u8]) -> Result<(), SpoolError> {
        if self.write_off >= self.max_segment_bytes {
            self.rotate()?;
        }
        let len = rec.len() as u32;
        self.write_file.write_all(&len.to_be_bytes())?;
        self.write_file.write_all(rec)?;
        self.write_file.flush()?;
        self.write_off += 4 + u64::from(len);
        self.records += 1;
        Ok(())
    }

    /// Read and consume the oldest record, or `None` when drained.
    pub fn next(&mut self) -> Result<Option<Vec<u8>>, SpoolError> {
        loop {
            if self.read_seg == self.write_seg && self.read_off >= self.write_off {
                return Ok(None);
            }

            let seg_len = std::fs::metadata(segment_path(&self.dir, self.read_seg))
                .map(|m| m.len())
                .unwrap_or(0);
            if self.read_off >= seg_len {
                if self.read_seg >= self.write_seg {
                    return Ok(None);
                }
                // segment fully drained, drop it and move on
                let drained = segment_path(&self.dir, self.read_seg);
                self.read_file = None;
                let _ = std::fs::remove_file(&drained);
                self.read_seg += 1;
                self.read_off = 0;
                self.persist_state()?;
                continue;
            }

            if self.read_file.is_none() {
                let mut f = File::open(segment_path(&self.dir, self.read_seg))?;
                f.seek(SeekFrom::Start(self.read_off))?;
                self.read_file = Some(f);
            }
            let file = match self.read_file.as_mut() {
                Some(f) => f,
                None => return Ok(None),
            };

            let mut len_buf = [0u8; 4];
            if file.read_exact(&mut len_buf).is_err() {
                // partial trailing record; nothing more to read here
                return Ok(None);
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut rec = vec![0u8; len];
            if file.read_exact(&mut rec).is_err() {
                return Ok(None);
            }
            self.read_off += 4 + len as u64;
            self.records = self.records.saturating_sub(1);
            return Ok(Some(rec));
        }
    }

    /// Persist cursors and sync the write segment. Called on clean
    /// shutdown and after drain batches.
    pub fn checkpoint(&mut self) -> Result<(), SpoolError> {
        self.write_file.sync_data()?;
        self.persist_state()
    }

    fn rotate(&mut self) -> Result<(), SpoolError> {
        self.write_file.sync_data()?;
        self.write_seg += 1;
        self.write_file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(segment_path(&self.dir, self.write_seg))?;
        self.write_off = 0;
        self.persist_state()
    }

    fn persist_state(&self) -> Result<(), SpoolError> {
        let state = SpoolState {
            write_seg: self.write_seg,
            read_seg: self.read_seg,
            read_off: self.read_off,
        };
        let tmp = self.dir.join("state.json.tmp");
        let body = serde_json::to_vec(&state).map_err(|e| SpoolError::BadState(e.to_string()))?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, self.dir.join("state.json"))?;
        Ok(())
    }

    /// Walk from the read cursor to the write cursor counting records.
    fn count_records(&mut self) -> Result<u64, SpoolError> {
        let mut count = 0u64;
        let mut seg = self.read_seg;
        let mut off = self.read_off;
        while seg <= self.write_seg {
            let path = segment_path(&self.dir, seg);
            let Ok(mut file) = File::open(&path) else {
                seg += 1;
                off = 0;
                continue;
            };
            let end = if seg == self.write_seg { self.write_off } else { file.metadata()?.len() };
            file.seek(SeekFrom::Start(off))?;
            let mut len_buf = [0u8; 4];
            while off + 4 <= end {
                if file.read_exact(&mut len_buf).is_err() {
                    break;
                }
                let len = u64::from(u32::from_be_bytes(len_buf));
                if off + 4 + len > end {
                    break;
                }
                file.seek(SeekFrom::Current(len as i64))?;
                off += 4 + len;
                count += 1;
            }
            seg += 1;
            off = 0;
        }
        Ok(count)
    }
}

impl Drop for Spool {
    fn drop(&mut self) {
        let _ = self.checkpoint();
    }
}

fn segment_path(dir: &Path, seg: u64) -> PathBuf {
    dir.join(format!("{seg:08}.spool"))
}

fn load_state(dir: &Path) -> Result<SpoolState, SpoolError> {
    let path = dir.join("state.json");
    match std::fs::read(&path) {
        Ok(body) => serde_json::from_slice(&body).map_err(|e| SpoolError::BadState(e.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SpoolState::default()),
        Err(e) => Err(e.into()),
    }
}

/// Scan the write segment and truncate a partially-written trailing
/// record left by a crash. Returns the usable length.
fn repair_tail(file: &mut File) -> Result<u64, SpoolError> {
    let end = file.metadata()?.len();
    let mut off = 0u64;
    file.seek(SeekFrom::Start(0))?;
    let mut len_buf = [0u8; 4];
    loop {
        if off + 4 > end {
            break;
        }
        if file.read_exact(&mut len_buf).is_err() {
            break;
        }
        let len = u64::from(u32::from_be_bytes(len_buf));
        if off + 4 + len > end {
            break;
        }
        file.seek(SeekFrom::Current(len as i64))?;
        off += 4 + len;
    }
    if off < end {
        tracing::warn!(usable = off, total = end, "truncating torn spool record");
        file.set_len(off)?;
        file.seek(SeekFrom::End(0))?;
    }
    Ok(off)
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
