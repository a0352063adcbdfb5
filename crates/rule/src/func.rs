// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in expression functions.
//!
//! Calling convention: the VM pops the arity, then the arguments (top of
//! stack is the last argument), calls here, and pushes the single result.

use crate::value::Value;
use crate::vm::ExecError;
use parking_lot::Mutex;

/// Serializes `getenv` calls; the host environment is process-global.
static ENV_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn is_builtin(name: &str) -> bool {
    matches!(name, "strlen" | "tolower" | "getenv")
}

pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, ExecError> {
    match name {
        "strlen" => {
            let [s] = take_args::<1>(name, args)?;
            Ok(Value::Num(s.into_text().len() as i64))
        }
        "tolower" => {
            let [s] = take_args::<1>(name, args)?;
            Ok(Value::Str(s.into_text().to_ascii_lowercase()))
        }
        "getenv" => {
            let [name_arg] = take_args::<1>(name, args)?;
            let key = name_arg.into_text();
            let _guard = ENV_LOCK.lock();
            Ok(Value::Str(std::env::var(&key).unwrap_or_default()))
        }
        other => Err(ExecError::UnknownFunction(other.to_string())),
    }
}

fn take_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], ExecError> {
    let got = args.len();
    args.try_into().map_err(|_| ExecError::InvalidArgCount { func: name.to_string(), got })
}

#[cfg(test)]
#[path = "func_tests.rs"]
mod tests;
