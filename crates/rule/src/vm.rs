// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The expression stack machine.
//!
//! A `Vm` holds the evaluation clock and the process hostname; each
//! worker owns its own instance, so execution needs no locking. The
//! stack has a fixed depth; overflow is an execution error, not a panic.

use crate::func;
use crate::op::Op;
use crate::prog::Program;
use crate::sysvar;
use crate::value::{CommonPair, Value};
use sm_core::{Clock, Message};
use smol_str::SmolStr;
use thiserror::Error;

/// Fixed evaluation stack depth.
pub const STACK_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("evaluation stack overflow")]
    StackOverflow,
    #[error("evaluation stack empty")]
    StackEmpty,
    #[error("invalid variable: {0}")]
    InvalidVar(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid argument count for {func}: got {got}")]
    InvalidArgCount { func: String, got: usize },
    #[error("division by zero")]
    DivByZero,
}

/// One evaluation context. Single-threaded by design.
#[derive(Clone)]
pub struct Vm<C: Clock> {
    clock: C,
    myhostname: SmolStr,
}

impl<C: Clock> Vm<C> {
    pub fn new(clock: C, myhostname: impl Into<SmolStr>) -> Self {
        Self { clock, myhostname: myhostname.into() }
    }

    /// Run `prog` against `msg` and return the top-of-stack value.
    pub fn exec(&self, prog: &Program, msg: &Message) -> Result<Value, ExecError> {
        let mut stack = Stack::new();
        for op in prog.ops() {
            match op {
                Op::EndProg => break,

                Op::PushConstant(v) => stack.push(v.clone())?,
                Op::PushMsgVar(prop) => {
                    let text =
                        prop.resolve(msg).map(|v| v.into_owned()).unwrap_or_default();
                    stack.push(Value::Str(text))?;
                }
                Op::PushSysVar(name) => {
                    stack.push(sysvar::get(name, &self.clock, &self.myhostname)?)?;
                }
                Op::PushCeeVar(path) => {
                    let v = match msg.payload_text(path) {
                        Some(text) => Value::Str(text),
                        None => Value::None,
                    };
                    stack.push(v)?;
                }

                Op::Or => {
                    let (a, b) = stack.pop2()?;
                    stack.push(Value::from_bool(a.as_bool() || b.as_bool()))?;
                }
                Op::And => {
                    let (a, b) = stack.pop2()?;
                    stack.push(Value::from_bool(a.as_bool() && b.as_bool()))?;
                }
                Op::Not => {
                    let a = stack.pop()?;
                    stack.push(Value::from_bool(!a.as_bool()))?;
                }
                Op::UnaryMinus => {
                    let a = stack.pop()?;
                    stack.push(Value::Num(-a.to_num()))?;
                }

                Op::Plus => stack.arith(|a, b| Ok(a.wrapping_add(b)))?,
                Op::Minus => stack.arith(|a, b| Ok(a.wrapping_sub(b)))?,
                Op::Times => stack.arith(|a, b| Ok(a.wrapping_mul(b)))?,
                Op::Div => stack.arith(|a, b| {
                    if b == 0 {
                        Err(ExecError::DivByZero)
                    } else {
                        Ok(a.wrapping_div(b))
                    }
                })?,
                Op::Mod => stack.arith(|a, b| {
                    if b == 0 {
                        Err(ExecError::DivByZero)
                    } else {
                        Ok(a.wrapping_rem(b))
                    }
                })?,
                Op::StrAdd => {
                    let (a, b) = stack.pop2()?;
                    let mut s = a.into_text();
                    s.push_str(&b.into_text());
                    stack.push(Value::Str(s))?;
                }

                Op::CmpEq => stack.cmp(|ord| ord.is_eq())?,
                Op::CmpNeq => stack.cmp(|ord| ord.is_ne())?,
                Op::CmpLt => stack.cmp(|ord| ord.is_lt())?,
                Op::CmpGt => stack.cmp(|ord| ord.is_gt())?,
                Op::CmpLteq => stack.cmp(|ord| ord.is_le())?,
                Op::CmpGteq => stack.cmp(|ord| ord.is_ge())?,

                Op::CmpContains => stack.str_cmp(|a, b| a.contains(b))?,
                Op::CmpContainsI => {
                    stack.str_cmp(|a, b| a.to_ascii_lowercase().contains(&b.to_ascii_lowercase()))?;
                }
                Op::CmpStartswith => stack.str_cmp(|a, b| a.starts_with(b))?,
                Op::CmpStartswithI => stack.str_cmp(|a, b| {
                    a.to_ascii_lowercase().starts_with(&b.to_ascii_lowercase())
                })?,

                Op::FuncCall(name) => {
                    let arity = stack.pop()?.to_num();
                    if arity < 0 || arity as usize > stack.len() {
                        return Err(ExecError::InvalidArgCount {
                            func: name.to_string(),
                            got: stack.len(),
                        });
                    }
                    let mut args = Vec::with_capacity(arity as usize);
                    for _ in 0..arity {
                        args.push(stack.pop()?);
                    }
                    args.reverse(); // top of stack was the last argument
                    stack.push(func::call(name, args)?)?;
                }
            }
        }
        stack.pop()
    }

    /// Run `prog` and coerce the result to a boolean, the expression
    /// filter entry point.
    pub fn eval_bool(&self, prog: &Program, msg: &Message) -> Result<bool, ExecError> {
        Ok(self.exec(prog, msg)?.as_bool())
    }
}

struct Stack(Vec<Value>);

impl Stack {
    fn new() -> Self {
        Self(Vec::with_capacity(16))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn push(&mut self, v: Value) -> Result<(), ExecError> {
        if self.0.len() >= STACK_DEPTH {
            return Err(ExecError::StackOverflow);
        }
        self.0.push(v);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, ExecError> {
        self.0.pop().ok_or(ExecError::StackEmpty)
    }

    /// Pop two operands in program order: returns (first-pushed, second-pushed).
    fn pop2(&mut self) -> Result<(Value, Value), ExecError> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    fn arith(&mut self, f: impl Fn(i64, i64) -> Result<i64, ExecError>) -> Result<(), ExecError> {
        let (a, b) = self.pop2()?;
        let n = f(a.to_num(), b.to_num())?;
        self.push(Value::Num(n))
    }

    fn cmp(&mut self, f: impl Fn(std::cmp::Ordering) -> bool) -> Result<(), ExecError> {
        let (a, b) = self.pop2()?;
        self.push(Value::from_bool(f(Value::compare(a, b))))
    }

    fn str_cmp(&mut self, f: impl Fn(&str, &str) -> bool) -> Result<(), ExecError> {
        let (a, b) = self.pop2()?;
        let (a, b) = match Value::common(a, b) {
            CommonPair::Strs(a, b) => (a, b),
            CommonPair::Nums(a, b) => (a.to_string(), b.to_string()),
        };
        self.push(Value::from_bool(f(&a, &b)))
    }
}

#[cfg(test)]
#[path = "vm_tests.rs"]
mod tests;
