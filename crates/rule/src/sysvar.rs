// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System variables: calendar values derived from the wall clock at
//! evaluation time, plus the process hostname captured at startup.

use crate::value::Value;
use crate::vm::ExecError;
use sm_core::{Clock, Timestamp};

pub(crate) fn is_known(name: &str) -> bool {
    matches!(name, "now" | "year" | "month" | "day" | "hour" | "minute" | "myhostname")
}

pub(crate) fn get(name: &str, clock: &impl Clock, myhostname: &str) -> Result<Value, ExecError> {
    let ts = Timestamp::from_epoch_ms(clock.epoch_ms());
    let text = match name {
        "now" => format!("{:04}-{:02}-{:02}", ts.year(), ts.month(), ts.day()),
        "year" => format!("{:04}", ts.year()),
        "month" => format!("{:02}", ts.month()),
        "day" => format!("{:02}", ts.day()),
        "hour" => format!("{:02}", ts.hour()),
        "minute" => format!("{:02}", ts.minute()),
        "myhostname" => myhostname.to_string(),
        other => return Err(ExecError::InvalidVar(other.to_string())),
    };
    Ok(Value::Str(text))
}

#[cfg(test)]
#[path = "sysvar_tests.rs"]
mod tests;
