// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The output-module contract.
//!
//! A module ships a [`ModuleFactory`]; activation instantiates it into a
//! [`ModuleInstance`] per action; every worker task gets its own
//! [`ModuleWorker`]. The worker's `do_action` return value is the sole
//! error signal crossing the module boundary.

use crate::error::EngineError;
use async_trait::async_trait;
use sm_core::Message;
use std::sync::Arc;

/// Current module interface version offered by the host.
pub const MODULE_IF_VERSION: u32 = 1;

/// How the action's template is rendered before `do_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// rendered text
    #[default]
    AsBytes,
    /// the message as a structured value
    AsJson,
    /// the message object itself, for modules reading many properties
    AsMsg,
}

/// One rendered message, shaped per the module's [`RenderMode`].
#[derive(Debug, Clone)]
pub enum Rendered {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Msg(Arc<Message>),
}

impl Rendered {
    /// Text view used by capture/test sinks.
    pub fn as_text(&self) -> String {
        match self {
            Rendered::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Rendered::Json(v) => v.to_string(),
            Rendered::Msg(m) => m.body().to_string(),
        }
    }
}

/// Outcome of one `do_action` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoResult {
    /// element committed
    Committed,
    /// element accepted but not yet committed; stays in the batch
    Defer,
    /// retriable failure: requeue the remaining batch, suspend the action
    Suspend,
    /// element is unprocessable, drop it
    Discard,
    /// the action is broken, stop feeding it
    Disable,
}

/// Outcome of a resume probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeResult {
    Ok,
    Suspend,
}

/// Per-action opaque parameters, name-dispatched per the module's
/// descriptor.
pub type ModuleParams = serde_json::Map<String, serde_json::Value>;

/// One recognized parameter of a module.
#[derive(Debug, Clone, Copy)]
pub struct ParamDescr {
    pub name: &'static str,
    pub required: bool,
}

impl ParamDescr {
    pub const fn required(name: &'static str) -> Self {
        Self { name, required: true }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self { name, required: false }
    }
}

/// Per-worker module state. One per worker task, never shared.
#[async_trait]
pub trait ModuleWorker: Send {
    async fn do_action(&mut self, msg: Rendered) -> DoResult;

    /// Called by the retry timer to test reactivation after a suspend.
    async fn try_resume(&mut self) -> ResumeResult {
        ResumeResult::Ok
    }

    /// Transaction hooks, used only when the instance opts into batching.
    async fn begin_transaction(&mut self) {}

    async fn commit_transaction(&mut self) -> DoResult {
        DoResult::Committed
    }
}

/// Per-action module state shared by that action's workers.
pub trait ModuleInstance: Send + Sync {
    fn render_mode(&self) -> RenderMode {
        RenderMode::AsBytes
    }

    /// Whether `do_action` calls are bracketed by transaction hooks.
    fn batching(&self) -> bool {
        false
    }

    /// Module-suggested suspend/resume tuning, used when the action's
    /// configuration does not set one.
    fn retry_hint(&self) -> Option<crate::action::RetryPolicy> {
        None
    }

    fn spawn_worker(&self) -> Box<dyn ModuleWorker>;
}

/// Module entry point held by the registry.
pub trait ModuleFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Interface version this module implements.
    fn interface_version(&self) -> u32 {
        MODULE_IF_VERSION
    }

    /// Recognized per-action parameters.
    fn params(&self) -> &'static [ParamDescr] {
        &[]
    }

    fn instantiate(&self, params: &ModuleParams) -> Result<Arc<dyn ModuleInstance>, EngineError>;
}
