// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The action: one configured output-module instance with its queue,
//! worker pool, and retry state machine.
//!
//! State transitions are serialized by the state mutex; workers read the
//! state without it only through `await_ready`, which rechecks under the
//! lock before acting. Exactly one worker probes `try_resume` per timer
//! expiry.

use crate::error::EngineError;
use crate::module::{ModuleInstance, ModuleWorker, ResumeResult};
use crate::queue::{BatchQueue, QueueConfig};
use crate::template::Template;
use crate::worker::Worker;
use parking_lot::Mutex;
use sm_core::Message;
use sm_storage::Spool;
use smol_str::SmolStr;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Ready,
    Suspended,
    /// terminal
    Disabled,
}

sm_core::simple_display! {
    ActionState {
        Ready => "rdy",
        Suspended => "suspended",
        Disabled => "disabled",
    }
}

/// Suspend/resume backoff tuning.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// first resume probe delay
    pub initial: Duration,
    /// backoff cap
    pub max: Duration,
    /// jitter applied around each delay, in percent
    pub jitter_pct: u8,
    /// failed probes before the action is disabled; 0 = never
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(30),
            max: Duration::from_secs(600),
            jitter_pct: 20,
            max_retries: 0,
        }
    }
}

impl RetryPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }

    /// Deterministic jitter: +-jitter_pct of `base`, keyed on the action
    /// name and attempt so runs are reproducible.
    fn jittered(&self, base: Duration, action: &str, attempt: u32) -> Duration {
        if self.jitter_pct == 0 {
            return base;
        }
        let span = base.as_millis() as u64 * u64::from(self.jitter_pct) / 100;
        if span == 0 {
            return base;
        }
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (action, attempt).hash(&mut hasher);
        let offset = (hasher.finish() % (2 * span + 1)) as i64 - span as i64;
        if offset >= 0 {
            base + Duration::from_millis(offset as u64)
        } else {
            base.saturating_sub(Duration::from_millis(offset.unsigned_abs()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub name: SmolStr,
    pub workers: usize,
    pub queue: QueueConfig,
    /// explicit retry tuning; falls back to the module's hint, then to
    /// [`RetryPolicy::default`]
    pub retry: Option<RetryPolicy>,
    pub template: Template,
}

impl ActionConfig {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            workers: 1,
            queue: QueueConfig::default(),
            retry: None,
            template: Template::forward_default(),
        }
    }

    sm_core::setters! {
        set {
            workers: usize,
            queue: QueueConfig,
            template: Template,
        }
        option {
            retry: RetryPolicy,
        }
    }
}

/// Delivery counters, visible through `Action::stats`.
#[derive(Debug, Default)]
pub struct ActionStats {
    committed: AtomicU64,
    discarded: AtomicU64,
    failed: AtomicU64,
    suspends: AtomicU64,
    dropped: AtomicU64,
}

impl ActionStats {
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn suspends(&self) -> u64 {
        self.suspends.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn add(&self, committed: u64, discarded: u64, failed: u64) {
        self.committed.fetch_add(committed, Ordering::Relaxed);
        self.discarded.fetch_add(discarded, Ordering::Relaxed);
        self.failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub(crate) fn add_failed(&self, n: u64) {
        self.failed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_suspend(&self) {
        self.suspends.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }
}

struct StateInner {
    state: ActionState,
    attempt: u32,
    interval: Duration,
    resume_at: Instant,
    probing: bool,
}

/// Reason a worker stopped waiting for readiness.
pub(crate) enum Stopped {
    Disabled,
    Cancelled,
}

/// Minimum spacing between suspension error events per action.
const SUSPEND_WARN_GAP: Duration = Duration::from_secs(30);

/// State shared between an action handle and its workers.
pub(crate) struct ActionCore {
    pub(crate) name: SmolStr,
    retry: RetryPolicy,
    state: Mutex<StateInner>,
    state_changed: Notify,
    suspend_warned_at: Mutex<Option<Instant>>,
    pub(crate) queue: Arc<BatchQueue>,
    pub(crate) stats: ActionStats,
    pub(crate) hard_cancel: CancellationToken,
}

impl ActionCore {
    pub(crate) fn state(&self) -> ActionState {
        self.state.lock().state
    }

    /// Block until the action is ready, driving resume probes while it
    /// is suspended. Exactly one worker probes per expiry.
    pub(crate) async fn await_ready(
        &self,
        module: &mut Box<dyn ModuleWorker>,
    ) -> Result<(), Stopped> {
        loop {
            if self.hard_cancel.is_cancelled() {
                return Err(Stopped::Cancelled);
            }
            let waiter = self.state_changed.notified();
            tokio::pin!(waiter);
            waiter.as_mut().enable();
            let (resume_at, probe) = {
                let mut inner = self.state.lock();
                match inner.state {
                    ActionState::Ready => return Ok(()),
                    ActionState::Disabled => return Err(Stopped::Disabled),
                    ActionState::Suspended => {
                        if !inner.probing && Instant::now() >= inner.resume_at {
                            inner.probing = true;
                            (inner.resume_at, true)
                        } else {
                            (inner.resume_at, false)
                        }
                    }
                }
            };

            if probe {
                let result = module.try_resume().await;
                let mut inner = self.state.lock();
                inner.probing = false;
                match result {
                    ResumeResult::Ok => {
                        inner.state = ActionState::Ready;
                        inner.attempt = 0;
                        inner.interval = self.retry.initial;
                        tracing::info!(action = %self.name, "action resumed");
                        self.state_changed.notify_waiters();
                        return Ok(());
                    }
                    ResumeResult::Suspend => {
                        inner.attempt += 1;
                        if self.retry.max_retries > 0 && inner.attempt >= self.retry.max_retries {
                            inner.state = ActionState::Disabled;
                            tracing::error!(
                                action = %self.name,
                                attempts = inner.attempt,
                                "retry cap reached, disabling action"
                            );
                            self.state_changed.notify_waiters();
                            return Err(Stopped::Disabled);
                        }
                        inner.interval = self.retry.next_interval(inner.interval);
                        inner.resume_at = Instant::now()
                            + self.retry.jittered(inner.interval, &self.name, inner.attempt);
                        tracing::warn!(
                            action = %self.name,
                            attempt = inner.attempt,
                            next_try_in = ?inner.interval,
                            "resume probe failed"
                        );
                    }
                }
                continue;
            }

            tokio::select! {
                () = tokio::time::sleep_until(resume_at) => {}
                () = &mut waiter => {}
                () = self.hard_cancel.cancelled() => return Err(Stopped::Cancelled),
            }
        }
    }

    /// Transition Ready -> Suspended after a `Suspend` module return.
    /// The structured error event carries the head of the failed batch
    /// and is throttled to avoid log storms.
    pub(crate) fn note_suspend(&self, first_msg: &str) {
        let mut inner = self.state.lock();
        if inner.state != ActionState::Ready {
            return;
        }
        inner.state = ActionState::Suspended;
        inner.attempt += 1;
        inner.interval = self.retry.initial;
        inner.resume_at =
            Instant::now() + self.retry.jittered(inner.interval, &self.name, inner.attempt);
        self.stats.add_suspend();

        let now = Instant::now();
        let mut warned = self.suspend_warned_at.lock();
        if warned.map_or(true, |at| now.duration_since(at) >= SUSPEND_WARN_GAP) {
            *warned = Some(now);
            let head: String = first_msg.chars().take(120).collect();
            tracing::warn!(
                action = %self.name,
                kind = "suspended",
                first_msg = %head,
                resume_in = ?inner.interval,
                "action suspended"
            );
        }
        self.state_changed.notify_waiters();
    }

    /// Terminal transition after a `Disable` module return.
    pub(crate) fn disable(&self) {
        let mut inner = self.state.lock();
        if inner.state == ActionState::Disabled {
            return;
        }
        inner.state = ActionState::Disabled;
        tracing::error!(action = %self.name, "action disabled");
        self.state_changed.notify_waiters();
    }
}

/// A running action: queue, state machine, and worker pool.
pub struct Action {
    core: Arc<ActionCore>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Action {
    /// Build the queue and spawn the worker pool.
    pub fn spawn(
        cfg: ActionConfig,
        instance: Arc<dyn ModuleInstance>,
        spool: Option<Spool>,
        hard_cancel: CancellationToken,
    ) -> Arc<Self> {
        let queue = BatchQueue::new(cfg.queue.clone(), spool);
        let retry = cfg
            .retry
            .clone()
            .or_else(|| instance.retry_hint())
            .unwrap_or_default();
        let core = Arc::new(ActionCore {
            name: cfg.name.clone(),
            retry: retry.clone(),
            state: Mutex::new(StateInner {
                state: ActionState::Ready,
                attempt: 0,
                interval: retry.initial,
                resume_at: Instant::now(),
                probing: false,
            }),
            state_changed: Notify::new(),
            suspend_warned_at: Mutex::new(None),
            queue,
            stats: ActionStats::default(),
            hard_cancel,
        });

        let mut handles = Vec::with_capacity(cfg.workers.max(1));
        for _ in 0..cfg.workers.max(1) {
            let worker = Worker::new(
                Arc::clone(&core),
                instance.spawn_worker(),
                cfg.template.clone(),
                instance.render_mode(),
                instance.batching(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        Arc::new(Self { core, workers: Mutex::new(handles) })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn state(&self) -> ActionState {
        self.core.state()
    }

    pub fn stats(&self) -> &ActionStats {
        &self.core.stats
    }

    pub fn queue(&self) -> &Arc<BatchQueue> {
        &self.core.queue
    }

    /// Enqueue accepted messages. A disabled action drops and counts
    /// them instead.
    pub async fn submit(
        &self,
        msgs: impl IntoIterator<Item = Arc<Message>>,
    ) -> Result<(), EngineError> {
        if self.state() == ActionState::Disabled {
            let n = msgs.into_iter().count() as u64;
            self.core.stats.add_dropped(n);
            return Ok(());
        }
        for msg in msgs {
            self.core.queue.enqueue(msg).await?;
        }
        Ok(())
    }

    /// Two-phase shutdown: close the queue, let workers drain until the
    /// grace deadline, then cancel and write in-flight work back to the
    /// spool.
    pub async fn shutdown(&self, grace: Duration) {
        self.core.queue.close();
        let deadline = Instant::now() + grace;

        let handles = std::mem::take(&mut *self.workers.lock());
        let mut stragglers = Vec::new();
        for mut handle in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(_) => {}
                Err(_) => stragglers.push(handle),
            }
        }

        if !stragglers.is_empty() {
            tracing::warn!(action = %self.core.name, "drain deadline passed, cancelling workers");
            self.core.hard_cancel.cancel();
            for mut handle in stragglers {
                if tokio::time::timeout(Duration::from_secs(1), &mut handle).await.is_err() {
                    handle.abort();
                }
            }
        }

        match self.core.queue.writeback() {
            Ok((saved, lost)) => {
                if saved > 0 || lost > 0 {
                    tracing::info!(action = %self.core.name, saved, lost, "queue written back");
                }
                self.core.stats.add_dropped(lost as u64);
            }
            Err(e) => {
                tracing::error!(action = %self.core.name, error = %e, "queue writeback failed");
            }
        }
        if let Err(e) = self.core.queue.checkpoint() {
            tracing::error!(action = %self.core.name, error = %e, "spool checkpoint failed");
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
