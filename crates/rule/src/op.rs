// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VM instructions.

use crate::value::Value;
use sm_core::{JsonPath, Property};
use smol_str::SmolStr;

/// One machine instruction. Operands are carried inline.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Or,
    And,
    Not,
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    UnaryMinus,
    /// string concatenation
    StrAdd,
    CmpEq,
    CmpNeq,
    CmpLt,
    CmpGt,
    CmpLteq,
    CmpGteq,
    CmpContains,
    CmpContainsI,
    CmpStartswith,
    CmpStartswithI,
    PushConstant(Value),
    PushMsgVar(Property),
    PushSysVar(SmolStr),
    PushCeeVar(JsonPath),
    FuncCall(SmolStr),
    EndProg,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Or => "or",
            Op::And => "and",
            Op::Not => "not",
            Op::Plus => "add",
            Op::Minus => "sub",
            Op::Times => "mul",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::UnaryMinus => "neg",
            Op::StrAdd => "stradd",
            Op::CmpEq => "cmp_eq",
            Op::CmpNeq => "cmp_neq",
            Op::CmpLt => "cmp_lt",
            Op::CmpGt => "cmp_gt",
            Op::CmpLteq => "cmp_lteq",
            Op::CmpGteq => "cmp_gteq",
            Op::CmpContains => "cmp_contains",
            Op::CmpContainsI => "cmp_contains_i",
            Op::CmpStartswith => "cmp_startswith",
            Op::CmpStartswithI => "cmp_startswith_i",
            Op::PushConstant(_) => "push",
            Op::PushMsgVar(_) => "push_msgvar",
            Op::PushSysVar(_) => "push_sysvar",
            Op::PushCeeVar(_) => "push_ceevar",
            Op::FuncCall(_) => "call",
            Op::EndProg => "end",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::PushConstant(v) => write!(f, "push {v}"),
            Op::PushMsgVar(p) => write!(f, "push_msgvar {p:?}"),
            Op::PushSysVar(name) => write!(f, "push_sysvar ${name}"),
            Op::PushCeeVar(path) => write!(f, "push_ceevar {path}"),
            Op::FuncCall(name) => write!(f, "call {name}"),
            other => f.write_str(other.mnemonic()),
        }
    }
}
