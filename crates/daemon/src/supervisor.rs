// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: owns the core context and serves control messages.
//!
//! Signals are translated onto the control channel rather than handled
//! in place: SIGHUP requests a reload, SIGTERM/SIGINT a shutdown. A
//! reload re-reads the configuration, keeps unchanged actions running,
//! and atomically swaps the ruleset table; a config that no longer
//! parses leaves the running configuration untouched.

use crate::config::{activate, Config, DaemonError};
use sm_core::{Message, SystemClock};
use sm_engine::{CoreContext, EngineError, ModuleRegistry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default drain window for a signal-initiated shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum Control {
    Reload,
    Shutdown { grace: Duration },
}

/// Cloneable handle for inputs and operators.
#[derive(Clone)]
pub struct DaemonHandle {
    ctx: Arc<CoreContext<SystemClock>>,
    ctl: mpsc::Sender<Control>,
}

impl DaemonHandle {
    /// Submit one parsed record to a ruleset, transferring the
    /// reference.
    pub async fn submit_message(
        &self,
        ruleset: &str,
        msg: Arc<Message>,
    ) -> Result<(), EngineError> {
        self.ctx.submit_message(ruleset, msg).await
    }

    pub fn context(&self) -> &Arc<CoreContext<SystemClock>> {
        &self.ctx
    }

    pub async fn control(&self, ctl: Control) {
        let _ = self.ctl.send(ctl).await;
    }
}

pub struct Daemon {
    ctx: Arc<CoreContext<SystemClock>>,
    config_path: PathBuf,
    fingerprint: String,
    known_actions: HashMap<String, String>,
    ctl_tx: mpsc::Sender<Control>,
    ctl_rx: Option<mpsc::Receiver<Control>>,
}

impl Daemon {
    /// Load the configuration and bring the context up with the stock
    /// module set.
    pub async fn start(config_path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        Self::start_with_modules(config_path, |registry| {
            registry.register(Arc::new(sm_fwd::FwdFactory::new()));
        })
        .await
    }

    /// Start with a caller-supplied module set (used by tests and
    /// embedders).
    pub async fn start_with_modules(
        config_path: impl Into<PathBuf>,
        register: impl FnOnce(&mut ModuleRegistry),
    ) -> Result<Self, DaemonError> {
        let config_path = config_path.into();
        let config = Config::load(&config_path)?;
        let fingerprint = Config::fingerprint(&config_path)?;

        let hostname = config
            .global
            .myhostname
            .clone()
            .unwrap_or_else(local_hostname);

        let mut ctx = CoreContext::new(SystemClock, hostname.as_str());
        register(ctx.registry_mut());
        let ctx = Arc::new(ctx);

        let mut known_actions = HashMap::new();
        let report = activate(&config, &ctx, &mut known_actions).await?;
        tracing::info!(
            actions = report.actions_started.len(),
            refused = report.actions_refused.len(),
            rulesets = report.rulesets_installed.len(),
            "configuration activated"
        );

        let (ctl_tx, ctl_rx) = mpsc::channel(16);
        Ok(Self { ctx, config_path, fingerprint, known_actions, ctl_tx, ctl_rx: Some(ctl_rx) })
    }

    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle { ctx: Arc::clone(&self.ctx), ctl: self.ctl_tx.clone() }
    }

    /// Serve control messages and signals until shutdown.
    pub async fn run(mut self) -> Result<(), DaemonError> {
        use tokio::signal::unix::{signal, SignalKind};
        let mut hup = signal(SignalKind::hangup()).map_err(DaemonError::Signals)?;
        let mut term = signal(SignalKind::terminate()).map_err(DaemonError::Signals)?;
        let mut int = signal(SignalKind::interrupt()).map_err(DaemonError::Signals)?;
        let Some(mut ctl_rx) = self.ctl_rx.take() else {
            return Ok(());
        };

        loop {
            tokio::select! {
                _ = hup.recv() => {
                    if let Err(e) = self.reload().await {
                        tracing::error!(error = %e, "reload failed, keeping running config");
                    }
                }
                _ = term.recv() => break,
                _ = int.recv() => break,
                ctl = ctl_rx.recv() => match ctl {
                    Some(Control::Reload) => {
                        if let Err(e) = self.reload().await {
                            tracing::error!(error = %e, "reload failed, keeping running config");
                        }
                    }
                    Some(Control::Shutdown { grace }) => {
                        self.ctx.shutdown(grace).await;
                        return Ok(());
                    }
                    None => break,
                },
            }
        }
        self.ctx.shutdown(SHUTDOWN_GRACE).await;
        Ok(())
    }

    /// Re-read the configuration. A byte-identical file is a no-op;
    /// unchanged actions keep their queues and state.
    pub async fn reload(&mut self) -> Result<(), DaemonError> {
        let fingerprint = Config::fingerprint(&self.config_path)?;
        if fingerprint == self.fingerprint {
            tracing::debug!("configuration unchanged, skipping reload");
            return Ok(());
        }
        let config = Config::load(&self.config_path)?;
        let report = activate(&config, &self.ctx, &mut self.known_actions).await?;
        self.fingerprint = fingerprint;
        tracing::info!(
            started = report.actions_started.len(),
            kept = report.actions_kept.len(),
            refused = report.actions_refused.len(),
            rulesets = report.rulesets_installed.len(),
            "configuration reloaded"
        );
        Ok(())
    }

    /// Shut down without going through `run`.
    pub async fn shutdown(self, grace: Duration) {
        self.ctx.shutdown(grace).await;
    }
}

fn local_hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
