// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker loop: dequeue, render, deliver, report.
//!
//! Cancellation is cooperative and observed at batch boundaries; a batch
//! in flight is finished (or suspended) before the worker exits.

use crate::action::{ActionCore, Stopped};
use crate::batch::{Batch, ElemState};
use crate::module::{DoResult, ModuleWorker, RenderMode};
use crate::template::Template;
use std::sync::Arc;

sm_core::define_id! {
    /// Identifies one worker task in logs.
    pub struct WorkerId("wrk-");
}

pub(crate) struct Worker {
    core: Arc<ActionCore>,
    module: Box<dyn ModuleWorker>,
    template: Template,
    mode: RenderMode,
    batching: bool,
}

impl Worker {
    pub(crate) fn new(
        core: Arc<ActionCore>,
        module: Box<dyn ModuleWorker>,
        template: Template,
        mode: RenderMode,
        batching: bool,
    ) -> Self {
        Self { core, module, template, mode, batching }
    }

    pub(crate) async fn run(mut self) {
        let id = WorkerId::new();
        tracing::debug!(action = %self.core.name, worker = %id, "worker started");
        loop {
            match self.core.await_ready(&mut self.module).await {
                Ok(()) => {}
                Err(Stopped::Disabled | Stopped::Cancelled) => break,
            }
            let Some(mut batch) = self.core.queue.dequeue(&self.core.hard_cancel).await else {
                break;
            };
            self.process(&mut batch).await;
            self.tally(&batch);
            self.core.queue.complete(batch);
        }
        tracing::debug!(action = %self.core.name, worker = %id, "worker exited");
    }

    /// Deliver a batch element by element, mapping each module return
    /// into per-element state. On `Suspend` the remainder stays `Rdy`
    /// and the whole tail is requeued by `complete`.
    async fn process(&mut self, batch: &mut Batch) {
        if self.batching {
            self.module.begin_transaction().await;
        }

        for i in 0..batch.len() {
            if batch.elem(i).state != ElemState::Rdy {
                continue;
            }
            if !batch.elem(i).filter_ok {
                batch.set_state(i, ElemState::Discard);
                continue;
            }

            let rendered = match self.template.render_for(&batch.elem(i).msg, self.mode) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        action = %self.core.name,
                        error = %e,
                        "template render failed, discarding element"
                    );
                    self.core.stats.add_failed(1);
                    batch.set_state(i, ElemState::Discard);
                    continue;
                }
            };

            match self.module.do_action(rendered).await {
                DoResult::Committed => batch.set_state(i, ElemState::Committed),
                DoResult::Defer => {}
                DoResult::Suspend => {
                    self.core.note_suspend(batch.elem(i).msg.body());
                    return;
                }
                DoResult::Discard => batch.set_state(i, ElemState::Discard),
                DoResult::Disable => {
                    self.core.disable();
                    mark_rdy(batch, i, ElemState::Bad);
                    return;
                }
            }
        }

        if self.batching {
            let first = batch
                .rdy_msgs()
                .first()
                .map(|m| m.body().to_string())
                .unwrap_or_default();
            match self.module.commit_transaction().await {
                DoResult::Committed => mark_rdy(batch, 0, ElemState::Committed),
                DoResult::Defer => {}
                DoResult::Suspend => self.core.note_suspend(&first),
                DoResult::Discard => mark_rdy(batch, 0, ElemState::Discard),
                DoResult::Disable => {
                    self.core.disable();
                    mark_rdy(batch, 0, ElemState::Bad);
                }
            }
        }
    }

    fn tally(&self, batch: &Batch) {
        self.core.stats.add(
            batch.count(ElemState::Committed) as u64,
            batch.count(ElemState::Discard) as u64,
            batch.count(ElemState::Bad) as u64,
        );
    }
}

fn mark_rdy(batch: &mut Batch, from: usize, state: ElemState) {
    for i in from..batch.len() {
        if batch.elem(i).state == ElemState::Rdy {
            batch.set_state(i, state);
        }
    }
}
