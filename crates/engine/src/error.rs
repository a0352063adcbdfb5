// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Transient delivery failures never surface here; they travel as
//! [`DoResult`](crate::DoResult) values through the action state
//! machine. These errors are the configuration- and submission-time
//! failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown ruleset: {0}")]
    UnknownRuleset(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("core is shutting down")]
    ShuttingDown,
    #[error("unknown module: {0}")]
    UnknownModule(String),
    #[error("module {module} requires interface v{module_version}, host offers v{requested}")]
    IncompatibleModule {
        module: String,
        module_version: u32,
        requested: u32,
    },
    #[error("module {module}: missing required parameter {param}")]
    MissingRequiredParam { module: String, param: String },
    #[error("module {module}: unknown parameter {param}")]
    UnknownParam { module: String, param: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("template error: {0}")]
    Template(String),
    #[error("queue rejected message: full")]
    QueueFull,
    #[error("queue is closed")]
    QueueClosed,
    #[error(transparent)]
    Spool(#[from] sm_storage::SpoolError),
}
