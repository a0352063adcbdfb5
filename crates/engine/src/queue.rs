// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bounded batch queue feeding one action's workers.
//!
//! In-memory FIFO with an optional disk spool. Once spilling starts, new
//! enqueues go to the spool so everything on disk is newer than
//! everything in memory; dequeue drains memory first and refills from
//! the spool, which keeps global FIFO order across spills, restarts, and
//! requeues (requeued elements go back to the memory head).
//!
//! Dequeued batches stay in a pending set until the worker completes
//! them, so a hard shutdown can write in-flight work back to the spool.

use crate::batch::{Batch, BatchId, ElemState};
use crate::error::EngineError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use sm_core::Message;
use sm_storage::Spool;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Hard high-water mark; producers block above it (or spill when a
    /// spool is configured).
    pub capacity: usize,
    /// Maximum elements per dequeued batch.
    pub batch_size: usize,
    /// How long a dequeue waits for a fuller batch before returning what
    /// is available.
    pub linger: Duration,
    /// In-memory occupancy that starts spilling to the spool.
    pub spill_watermark: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            batch_size: 16,
            linger: Duration::from_millis(5),
            spill_watermark: 900,
        }
    }
}

struct QState {
    ready: VecDeque<Arc<Message>>,
    /// insertion order is dequeue order, which writeback relies on
    pending: IndexMap<BatchId, Vec<Arc<Message>>>,
    spool: Option<Spool>,
    closed: bool,
}

impl QState {
    fn spooled(&self) -> usize {
        self.spool.as_ref().map(|s| s.len() as usize).unwrap_or(0)
    }

    fn available(&self) -> usize {
        self.ready.len() + self.spooled()
    }
}

pub struct BatchQueue {
    cfg: QueueConfig,
    state: Mutex<QState>,
    not_empty: Notify,
    not_full: Notify,
}

impl BatchQueue {
    pub fn new(cfg: QueueConfig, spool: Option<Spool>) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            state: Mutex::new(QState {
                ready: VecDeque::new(),
                pending: IndexMap::new(),
                spool,
                closed: false,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        })
    }

    /// Queue depth: in-memory plus spooled, excluding pending batches.
    pub fn len(&self) -> usize {
        self.state.lock().available()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueue one message. Blocks above the high-water mark unless a
    /// spool is configured; fails once the queue is closed.
    pub async fn enqueue(&self, msg: Arc<Message>) -> Result<(), EngineError> {
        loop {
            let waiter = self.not_full.notified();
            tokio::pin!(waiter);
            // register before re-checking, so a wakeup between the check
            // and the await is not lost
            waiter.as_mut().enable();
            {
                let mut st = self.state.lock();
                if st.closed {
                    return Err(EngineError::QueueClosed);
                }
                let spilling = st.spooled() > 0 || st.ready.len() >= self.cfg.spill_watermark;
                if spilling && st.spool.is_some() {
                    let rec = serde_json::to_vec(&msg.to_record())
                        .map_err(|e| EngineError::Config(e.to_string()))?;
                    if let Some(spool) = st.spool.as_mut() {
                        spool.append(&rec)?;
                    }
                    self.not_empty.notify_one();
                    return Ok(());
                }
                if st.ready.len() < self.cfg.capacity {
                    st.ready.push_back(msg);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }
            waiter.await;
        }
    }

    /// Dequeue up to `batch_size` messages, waiting for data or close.
    /// Returns `None` when the queue is closed and drained, or on
    /// cancellation.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<Batch> {
        let mut lingered = false;
        loop {
            let waiter = self.not_empty.notified();
            tokio::pin!(waiter);
            waiter.as_mut().enable();

            enum Decision {
                TakeBatch,
                Closed,
                Linger,
                WaitNotify,
            }

            let decision = {
                let st = self.state.lock();
                let available = st.available();
                if available >= self.cfg.batch_size
                    || (available > 0 && (lingered || st.closed || self.cfg.linger.is_zero()))
                {
                    Decision::TakeBatch
                } else if available == 0 && st.closed {
                    Decision::Closed
                } else if available > 0 {
                    Decision::Linger
                } else {
                    Decision::WaitNotify
                }
            };

            match decision {
                Decision::TakeBatch => {
                    // a sibling worker may have raced us to the messages
                    match self.take_batch() {
                        Some(batch) => return Some(batch),
                        None => {
                            lingered = false;
                            continue;
                        }
                    }
                }
                Decision::Closed => return None,
                Decision::Linger => {
                    // partial batch: wait out the linger window once
                    tokio::select! {
                        () = tokio::time::sleep(self.cfg.linger) => {}
                        () = cancel.cancelled() => return None,
                    }
                    lingered = true;
                    continue;
                }
                Decision::WaitNotify => {
                    tokio::select! {
                        () = &mut waiter => {}
                        () = cancel.cancelled() => return None,
                    }
                }
            }
        }
    }

    fn take_batch(&self) -> Option<Batch> {
        let mut st = self.state.lock();
        let mut msgs = Vec::with_capacity(self.cfg.batch_size);
        while msgs.len() < self.cfg.batch_size {
            if let Some(msg) = st.ready.pop_front() {
                msgs.push(msg);
                continue;
            }
            let Some(spool) = st.spool.as_mut() else { break };
            match spool.next() {
                Ok(Some(rec)) => match serde_json::from_slice(&rec) {
                    Ok(record) => msgs.push(Arc::new(Message::from_record(record))),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable spool record");
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "spool read failed");
                    break;
                }
            }
        }
        if msgs.is_empty() {
            return None;
        }
        let batch = Batch::new(msgs);
        st.pending.insert(batch.id().clone(), batch.rdy_msgs());
        self.not_full.notify_waiters();
        Some(batch)
    }

    /// Report a batch's final element states. Committed and discarded
    /// elements are freed, bad ones logged, and `Rdy` leftovers requeued
    /// at the head in their original order.
    pub fn complete(&self, batch: Batch) {
        let mut st = self.state.lock();
        st.pending.shift_remove(batch.id());

        let bad = batch.count(ElemState::Bad);
        if bad > 0 {
            tracing::warn!(batch = %batch.id(), count = bad, "permanently failed batch elements");
        }

        let requeue = batch.rdy_msgs();
        let requeued = !requeue.is_empty();
        for msg in requeue.into_iter().rev() {
            st.ready.push_front(msg);
        }
        drop(st);

        self.not_full.notify_waiters();
        if requeued {
            self.not_empty.notify_one();
        }
    }

    /// Stop accepting enqueues; waiting consumers drain what remains.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    /// Write all in-memory and in-flight messages back to the spool.
    /// Called on hard shutdown; returns how many records were saved and
    /// how many were lost for lack of a spool.
    pub fn writeback(&self) -> Result<(usize, usize), EngineError> {
        let mut st = self.state.lock();

        let mut msgs: Vec<Arc<Message>> = Vec::new();
        // pending batches hold the oldest work; keep them ahead of ready
        let pending: Vec<_> = st.pending.drain(..).map(|(_, m)| m).collect();
        for batch_msgs in pending {
            msgs.extend(batch_msgs);
        }
        msgs.extend(st.ready.drain(..));

        let total = msgs.len();
        let Some(spool) = st.spool.as_mut() else {
            if total > 0 {
                tracing::warn!(lost = total, "hard shutdown without a spool drops messages");
            }
            return Ok((0, total));
        };
        for msg in &msgs {
            let rec = serde_json::to_vec(&msg.to_record())
                .map_err(|e| EngineError::Config(e.to_string()))?;
            spool.append(&rec)?;
        }
        spool.checkpoint()?;
        Ok((total, 0))
    }

    /// Persist spool cursors after a drain.
    pub fn checkpoint(&self) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        if let Some(spool) = st.spool.as_mut() {
            spool.checkpoint()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
