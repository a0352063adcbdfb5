// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter variants and their evaluation.
//!
//! A filter is one of three bodies — priority bitmap, single-property
//! comparison, or compiled expression — plus two optional pre-filters
//! on hostname and program name that run before the body.

use crate::prog::Program;
use crate::vm::{ExecError, Vm};
use sm_core::facility::FACILITY_COUNT;
use sm_core::{Clock, Facility, Message, MsgError, Property, Severity};
use smol_str::SmolStr;
use thiserror::Error;

/// Bitmap entry matching every severity.
pub const TABLE_ALLPRI: u8 = 0xFF;
/// Bitmap entry matching no severity.
pub const TABLE_NOPRI: u8 = 0;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("bad priority selector {0:?}")]
    BadSelector(String),
    #[error(transparent)]
    BadName(#[from] MsgError),
}

/// Exact match or exact non-match against a literal name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub value: SmolStr,
    pub negate: bool,
}

impl NameMatch {
    pub fn is(value: impl Into<SmolStr>) -> Self {
        Self { value: value.into(), negate: false }
    }

    pub fn is_not(value: impl Into<SmolStr>) -> Self {
        Self { value: value.into(), negate: true }
    }

    pub fn matches(&self, name: &str) -> bool {
        (name == self.value) != self.negate
    }
}

/// Comparison operations for property filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Contains,
    IsEqual,
    IsEmpty,
    StartsWith,
    /// basic regular expression
    Regex,
    /// extended regular expression
    ERegex,
}

sm_core::simple_display! {
    CompareOp {
        Contains => "contains",
        IsEqual => "isequal",
        IsEmpty => "isempty",
        StartsWith => "startswith",
        Regex => "regex",
        ERegex => "ereregex",
    }
}

/// A `(property, operation, value, negate)` comparison. Regexes are
/// compiled once here and cached for the life of the filter.
#[derive(Debug, Clone)]
pub struct PropFilter {
    prop: Property,
    op: CompareOp,
    value: String,
    negate: bool,
    regex: Option<regex::Regex>,
}

impl PropFilter {
    pub fn new(
        prop: Property,
        op: CompareOp,
        value: impl Into<String>,
        negate: bool,
    ) -> Result<Self, FilterError> {
        let value = value.into();
        let regex = match op {
            CompareOp::Regex => Some(compile_regex(&bre_to_ere(&value), &value)?),
            CompareOp::ERegex => Some(compile_regex(&value, &value)?),
            _ => None,
        };
        Ok(Self { prop, op, value, negate, regex })
    }

    pub fn matches(&self, msg: &Message) -> bool {
        let text = self.prop.resolve(msg).unwrap_or_default();
        let hit = match (&self.op, &self.regex) {
            (CompareOp::Contains, _) => text.contains(&self.value),
            (CompareOp::IsEqual, _) => text == self.value.as_str(),
            (CompareOp::IsEmpty, _) => text.is_empty(),
            (CompareOp::StartsWith, _) => text.starts_with(&self.value),
            (CompareOp::Regex | CompareOp::ERegex, Some(re)) => re.is_match(&text),
            (CompareOp::Regex | CompareOp::ERegex, None) => false,
        };
        hit != self.negate
    }
}

fn compile_regex(pattern: &str, original: &str) -> Result<regex::Regex, FilterError> {
    regex::Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
        pattern: original.to_string(),
        source: Box::new(e),
    })
}

/// Rewrite a POSIX BRE into the extended dialect: `+ ? | ( ) { }` are
/// literals unless backslash-escaped, where the escaped forms are the
/// operators.
fn bre_to_ere(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // BRE operator forms become bare ERE operators
                Some(op @ ('(' | ')' | '{' | '}' | '+' | '?' | '|')) => out.push(op),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            // bare forms are literals in a BRE
            '(' | ')' | '{' | '}' | '+' | '?' | '|' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

/// The filter body: one of the three variants.
#[derive(Debug, Clone)]
pub enum FilterBody {
    /// Per-facility severity masks.
    Prio([u8; FACILITY_COUNT]),
    Prop(Box<PropFilter>),
    Expr(Program),
}

/// A complete filter: optional host/program pre-filters plus the body.
#[derive(Debug, Clone)]
pub struct Filter {
    pub host: Option<NameMatch>,
    pub program: Option<NameMatch>,
    pub body: FilterBody,
}

impl Filter {
    pub fn new(body: FilterBody) -> Self {
        Self { host: None, program: None, body }
    }

    pub fn prio(table: [u8; FACILITY_COUNT]) -> Self {
        Self::new(FilterBody::Prio(table))
    }

    pub fn prop(filter: PropFilter) -> Self {
        Self::new(FilterBody::Prop(Box::new(filter)))
    }

    pub fn expr(prog: Program) -> Self {
        Self::new(FilterBody::Expr(prog))
    }

    pub fn with_host(mut self, m: NameMatch) -> Self {
        self.host = Some(m);
        self
    }

    pub fn with_program(mut self, m: NameMatch) -> Self {
        self.program = Some(m);
        self
    }

    /// Evaluate against a message: pre-filters first, then the body.
    pub fn matches<C: Clock>(&self, msg: &Message, vm: &Vm<C>) -> Result<bool, ExecError> {
        if let Some(host) = &self.host {
            if !host.matches(msg.hostname()) {
                return Ok(false);
            }
        }
        if let Some(program) = &self.program {
            if !program.matches(msg.progname()) {
                return Ok(false);
            }
        }
        match &self.body {
            FilterBody::Prio(table) => {
                let mask = table[usize::from(msg.facility().code())];
                Ok(mask & msg.severity().bit() != 0)
            }
            FilterBody::Prop(pf) => Ok(pf.matches(msg)),
            FilterBody::Expr(prog) => vm.eval_bool(prog, msg),
        }
    }
}

/// Parse a classic priority selector into a bitmap.
///
/// Grammar: `part (";" part)*` where `part` is `facilities "." severity`.
/// Facilities are a comma list of names or `*`; severity is a name
/// (matching that severity and anything more severe), `=name` (exactly
/// that severity), `*`, or `none`, optionally prefixed with `!` to clear
/// bits instead of setting them. Parts apply left to right.
///
/// `"mail.info;mail.!=debug"` — all mail at info or better, minus debug.
pub fn parse_selector(selector: &str) -> Result<[u8; FACILITY_COUNT], FilterError> {
    let bad = || FilterError::BadSelector(selector.to_string());
    let mut table = [TABLE_NOPRI; FACILITY_COUNT];

    for part in selector.split(';') {
        let (facs, mut sev_spec) = part.rsplit_once('.').ok_or_else(bad)?;

        let mut clear = false;
        if let Some(rest) = sev_spec.strip_prefix('!') {
            clear = true;
            sev_spec = rest;
        }
        let mut exact = false;
        if let Some(rest) = sev_spec.strip_prefix('=') {
            exact = true;
            sev_spec = rest;
        }

        enum SevBits {
            Mask(u8),
            None,
        }
        let bits = match sev_spec {
            "*" => SevBits::Mask(TABLE_ALLPRI),
            "none" => SevBits::None,
            name => {
                let sev = Severity::parse(name).map_err(|_| bad())?;
                if exact {
                    SevBits::Mask(sev.bit())
                } else {
                    // this severity and everything more severe
                    SevBits::Mask(((1u16 << (sev.code() + 1)) - 1) as u8)
                }
            }
        };

        let indices: Vec<usize> = if facs == "*" {
            (0..FACILITY_COUNT).collect()
        } else {
            let mut v = Vec::new();
            for name in facs.split(',') {
                let fac = Facility::parse(name.trim()).map_err(|_| bad())?;
                v.push(usize::from(fac.code()));
            }
            v
        };

        for idx in indices {
            match &bits {
                SevBits::None => table[idx] = TABLE_NOPRI,
                SevBits::Mask(m) if clear => table[idx] &= !m,
                SevBits::Mask(m) => table[idx] |= m,
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
