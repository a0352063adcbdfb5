// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rulesets: the ordered filter chains messages are evaluated against.
//!
//! A rule couples one filter with the ordered list of action names it
//! feeds. Rules never short-circuit: every rule of the set sees every
//! message, so one record can fan out to many actions.

use crate::filter::Filter;
use crate::vm::{ExecError, Vm};
use sm_core::{Clock, Message};
use smol_str::SmolStr;

#[derive(Debug, Clone)]
pub struct Rule {
    pub filter: Filter,
    pub actions: Vec<SmolStr>,
}

impl Rule {
    pub fn new(filter: Filter, actions: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self { filter, actions: actions.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone)]
pub struct Ruleset {
    pub name: SmolStr,
    pub rules: Vec<Rule>,
}

impl Ruleset {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self { name: name.into(), rules: Vec::new() }
    }

    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Evaluate all rules in declaration order; returns one decision per
    /// rule. A filter error counts as no-match and is reported once by
    /// the caller.
    pub fn evaluate<C: Clock>(
        &self,
        msg: &Message,
        vm: &Vm<C>,
    ) -> Vec<Result<bool, ExecError>> {
        self.rules.iter().map(|rule| rule.filter.matches(msg, vm)).collect()
    }
}

#[cfg(test)]
#[path = "ruleset_tests.rs"]
mod tests;
