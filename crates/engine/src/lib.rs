// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sm-engine: action execution.
//!
//! Messages matched by a ruleset are enqueued into per-action bounded
//! queues. Worker tasks drain batches, render them through the action's
//! template, and hand them to the output module, honoring the action's
//! ready/suspended/disabled state machine with exponential backoff
//! between resume probes.

mod action;
mod batch;
mod context;
mod error;
mod module;
mod queue;
mod registry;
mod template;
mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod testbench;

pub use action::{Action, ActionConfig, ActionState, ActionStats, RetryPolicy};
pub use batch::{Batch, BatchElem, BatchId, ElemState};
pub use context::CoreContext;
pub use error::EngineError;
pub use module::{
    DoResult, ModuleFactory, ModuleInstance, ModuleParams, ModuleWorker, ParamDescr, RenderMode,
    Rendered, ResumeResult, MODULE_IF_VERSION,
};
pub use queue::{BatchQueue, QueueConfig};
pub use registry::ModuleRegistry;
pub use template::Template;
