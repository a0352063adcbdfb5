// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batches: the unit of work handed from a queue to a worker.

use sm_core::Message;
use std::sync::Arc;

sm_core::define_id! {
    /// Identifies a dequeued batch in the queue's pending set until the
    /// worker reports completion.
    pub struct BatchId("bat-");
}

/// Per-element commit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElemState {
    /// not yet processed, or kept for retry
    #[default]
    Rdy,
    /// delivered and committed
    Committed,
    /// dropped on purpose, never retried
    Discard,
    /// permanent failure: logged, not retried
    Bad,
}

sm_core::simple_display! {
    ElemState {
        Rdy => "rdy",
        Committed => "committed",
        Discard => "discard",
        Bad => "bad",
    }
}

#[derive(Debug, Clone)]
pub struct BatchElem {
    pub msg: Arc<Message>,
    pub state: ElemState,
    /// set by ruleset evaluation; workers skip elements that failed the
    /// filter
    pub filter_ok: bool,
}

/// Fixed group of message references with per-element state.
#[derive(Debug)]
pub struct Batch {
    id: BatchId,
    elems: Vec<BatchElem>,
}

impl Batch {
    pub fn new(msgs: impl IntoIterator<Item = Arc<Message>>) -> Self {
        Self {
            id: BatchId::new(),
            elems: msgs
                .into_iter()
                .map(|msg| BatchElem { msg, state: ElemState::Rdy, filter_ok: true })
                .collect(),
        }
    }

    pub fn id(&self) -> &BatchId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn elems(&self) -> &[BatchElem] {
        &self.elems
    }

    pub fn elem(&self, idx: usize) -> &BatchElem {
        &self.elems[idx]
    }

    pub fn set_state(&mut self, idx: usize, state: ElemState) {
        self.elems[idx].state = state;
    }

    pub fn set_filter_ok(&mut self, idx: usize, ok: bool) {
        self.elems[idx].filter_ok = ok;
    }

    /// Index below which every element has left `Rdy`: partial progress
    /// survives a module return that processed a prefix.
    pub fn done_up_to(&self) -> usize {
        self.elems
            .iter()
            .position(|e| e.state == ElemState::Rdy)
            .unwrap_or(self.elems.len())
    }

    /// Messages still `Rdy`, in order, for requeueing.
    pub fn rdy_msgs(&self) -> Vec<Arc<Message>> {
        self.elems
            .iter()
            .filter(|e| e.state == ElemState::Rdy)
            .map(|e| Arc::clone(&e.msg))
            .collect()
    }

    /// Messages that passed the filter, in order.
    pub fn filter_ok_msgs(&self) -> Vec<Arc<Message>> {
        self.elems
            .iter()
            .filter(|e| e.filter_ok)
            .map(|e| Arc::clone(&e.msg))
            .collect()
    }

    pub fn count(&self, state: ElemState) -> usize {
        self.elems.iter().filter(|e| e.state == state).count()
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
