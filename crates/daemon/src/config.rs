// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model and activation.
//!
//! Activation is isolating: a broken action or ruleset is refused with
//! a logged error and the rest of the configuration comes up. Each
//! action declaration carries a fingerprint so reloads can keep
//! unchanged actions running.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sm_core::{Clock, Property};
use sm_engine::{
    ActionConfig, CoreContext, EngineError, ModuleParams, QueueConfig, RetryPolicy, Template,
};
use sm_rule::{
    compile, parse_selector, CompareOp, Filter, NameMatch, PropFilter, Rule, Ruleset,
};
use sm_storage::{Spool, SpoolConfig, SpoolError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("cannot read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("rule in ruleset {ruleset:?}: {reason}")]
    BadRule { ruleset: String, reason: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Spool(#[from] SpoolError),
    #[error("signal setup failed: {0}")]
    Signals(#[source] std::io::Error),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalDecl,
    #[serde(default, rename = "ruleset")]
    pub rulesets: Vec<RulesetDecl>,
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionDecl>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GlobalDecl {
    /// overrides the system hostname used by `$myhostname`
    #[serde(default)]
    pub myhostname: Option<String>,
    /// enables disk-assisted queues for actions with `spool = true`
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesetDecl {
    pub name: String,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDecl>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleDecl {
    /// classic priority selector, e.g. `"mail.err;kern.*"`
    #[serde(default)]
    pub selector: Option<String>,
    /// single-property comparison
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub negate: bool,
    /// compiled filter expression
    #[serde(default)]
    pub expr: Option<String>,
    /// hostname pre-filter; leading `!` negates
    #[serde(default)]
    pub host: Option<String>,
    /// program-name pre-filter; leading `!` negates
    #[serde(default)]
    pub program: Option<String>,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionDecl {
    pub name: String,
    pub module: String,
    #[serde(default = "one")]
    pub workers: usize,
    #[serde(default)]
    pub template: Option<String>,
    /// spill this action's queue to `global.spool_dir`
    #[serde(default)]
    pub spool: bool,
    #[serde(default)]
    pub queue: QueueDecl,
    #[serde(default)]
    pub retry: Option<RetryDecl>,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueDecl {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
    #[serde(default)]
    pub spill_watermark: Option<usize>,
}

fn default_capacity() -> usize {
    1000
}

fn default_batch_size() -> usize {
    16
}

fn default_linger_ms() -> u64 {
    5
}

impl Default for QueueDecl {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            batch_size: default_batch_size(),
            linger_ms: default_linger_ms(),
            spill_watermark: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryDecl {
    #[serde(default = "default_retry_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_retry_max_ms")]
    pub max_ms: u64,
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: u8,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_retry_initial_ms() -> u64 {
    30_000
}

fn default_retry_max_ms() -> u64 {
    600_000
}

fn default_jitter_pct() -> u8 {
    20
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| DaemonError::Read { path: path.to_path_buf(), source })?;
        Ok(toml::from_str(&text)?)
    }

    /// Fingerprint of the raw file, for no-op reload detection.
    pub fn fingerprint(path: &Path) -> Result<String, DaemonError> {
        let bytes = std::fs::read(path)
            .map_err(|source| DaemonError::Read { path: path.to_path_buf(), source })?;
        Ok(hex_digest(&bytes))
    }
}

impl ActionDecl {
    /// Stable digest of this declaration; unchanged actions survive a
    /// reload untouched.
    pub fn fingerprint(&self) -> String {
        let body = serde_json::to_vec(self).unwrap_or_default();
        hex_digest(&body)
    }

    fn action_config(&self) -> Result<ActionConfig, DaemonError> {
        let template = match &self.template {
            Some(text) => Template::parse(text)?,
            None => Template::forward_default(),
        };
        let queue = QueueConfig {
            capacity: self.queue.capacity,
            batch_size: self.queue.batch_size,
            linger: Duration::from_millis(self.queue.linger_ms),
            spill_watermark: self
                .queue
                .spill_watermark
                .unwrap_or(self.queue.capacity * 9 / 10),
        };
        let mut cfg = ActionConfig::new(self.name.as_str())
            .workers(self.workers.max(1))
            .queue(queue)
            .template(template);
        if let Some(retry) = &self.retry {
            cfg = cfg.retry(RetryPolicy {
                initial: Duration::from_millis(retry.initial_ms),
                max: Duration::from_millis(retry.max_ms),
                jitter_pct: retry.jitter_pct,
                max_retries: retry.max_retries,
            });
        }
        Ok(cfg)
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

impl RuleDecl {
    pub fn build(&self, ruleset: &str) -> Result<Rule, DaemonError> {
        let bad = |reason: String| DaemonError::BadRule { ruleset: ruleset.to_string(), reason };

        let bodies =
            usize::from(self.selector.is_some()) + usize::from(self.property.is_some())
                + usize::from(self.expr.is_some());
        if bodies != 1 {
            return Err(bad(format!(
                "exactly one of selector/property/expr is required, found {bodies}"
            )));
        }

        let mut filter = if let Some(selector) = &self.selector {
            Filter::prio(parse_selector(selector).map_err(|e| bad(e.to_string()))?)
        } else if let Some(property) = &self.property {
            let prop = Property::parse(property).map_err(|e| bad(e.to_string()))?;
            let op = match self.op.as_deref() {
                Some("contains") => CompareOp::Contains,
                Some("isequal") => CompareOp::IsEqual,
                Some("isempty") => CompareOp::IsEmpty,
                Some("startswith") => CompareOp::StartsWith,
                Some("regex") => CompareOp::Regex,
                Some("ereregex") => CompareOp::ERegex,
                Some(other) => return Err(bad(format!("unknown compare op {other:?}"))),
                None => return Err(bad("property filter needs an op".into())),
            };
            let value = self.value.clone().unwrap_or_default();
            let pf = PropFilter::new(prop, op, value, self.negate)
                .map_err(|e| bad(e.to_string()))?;
            Filter::prop(pf)
        } else if let Some(expr) = &self.expr {
            Filter::expr(compile(expr).map_err(|e| bad(e.to_string()))?)
        } else {
            return Err(bad("empty rule".into()));
        };

        if let Some(host) = &self.host {
            filter = filter.with_host(name_match(host));
        }
        if let Some(program) = &self.program {
            filter = filter.with_program(name_match(program));
        }
        if self.actions.is_empty() {
            return Err(bad("rule feeds no actions".into()));
        }
        Ok(Rule::new(filter, self.actions.iter().map(String::as_str)))
    }
}

fn name_match(spec: &str) -> NameMatch {
    match spec.strip_prefix('!') {
        Some(rest) => NameMatch::is_not(rest),
        None => NameMatch::is(spec),
    }
}

/// Outcome of one activation pass.
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub actions_started: Vec<String>,
    pub actions_kept: Vec<String>,
    pub actions_refused: Vec<String>,
    pub rulesets_installed: Vec<String>,
    pub rulesets_refused: Vec<String>,
}

/// Bring a configuration up on the context.
///
/// `known` maps running action names to their declaration fingerprints;
/// matching actions are left running. Refused actions and rulesets are
/// logged and skipped.
pub async fn activate<C: Clock>(
    config: &Config,
    ctx: &CoreContext<C>,
    known: &mut HashMap<String, String>,
) -> Result<ActivationReport, DaemonError> {
    let mut report = ActivationReport::default();

    let declared: HashMap<&str, &ActionDecl> =
        config.actions.iter().map(|a| (a.name.as_str(), a)).collect();

    // retire actions that are gone or changed
    let running = ctx.action_names();
    for name in running {
        let keep = declared
            .get(name.as_str())
            .map(|decl| known.get(name.as_str()) == Some(&decl.fingerprint()))
            .unwrap_or(false);
        if keep {
            report.actions_kept.push(name.to_string());
        } else {
            tracing::info!(action = %name, "retiring action");
            ctx.remove_action(&name, Duration::from_secs(5)).await;
            known.remove(name.as_str());
        }
    }

    for decl in &config.actions {
        if known.contains_key(&decl.name) {
            continue;
        }
        match start_action(decl, config, ctx) {
            Ok(()) => {
                known.insert(decl.name.clone(), decl.fingerprint());
                report.actions_started.push(decl.name.clone());
            }
            Err(e) => {
                tracing::error!(action = %decl.name, error = %e, "action refused");
                report.actions_refused.push(decl.name.clone());
            }
        }
    }

    // per-ruleset isolation, then one atomic table swap with the
    // survivors; the old table stays live until the swap
    let mut rulesets = Vec::new();
    for decl in &config.rulesets {
        let built = build_ruleset(decl).and_then(|rs| {
            ctx.validate_ruleset(&rs)?;
            Ok(rs)
        });
        match built {
            Ok(rs) => {
                report.rulesets_installed.push(decl.name.clone());
                rulesets.push(rs);
            }
            Err(e) => {
                tracing::error!(ruleset = %decl.name, error = %e, "ruleset refused");
                report.rulesets_refused.push(decl.name.clone());
            }
        }
    }
    ctx.swap_rulesets(rulesets)?;

    Ok(report)
}

fn start_action<C: Clock>(
    decl: &ActionDecl,
    config: &Config,
    ctx: &CoreContext<C>,
) -> Result<(), DaemonError> {
    let cfg = decl.action_config()?;
    let spool = match (&config.global.spool_dir, decl.spool) {
        (Some(dir), true) => Some(Spool::open(SpoolConfig::new(dir.join(&decl.name)))?),
        (None, true) => {
            return Err(DaemonError::Engine(EngineError::Config(format!(
                "action {} wants a spool but global.spool_dir is unset",
                decl.name
            ))));
        }
        _ => None,
    };
    let params: ModuleParams = decl.params.clone();
    ctx.add_action(cfg, &decl.module, &params, spool)?;
    Ok(())
}

fn build_ruleset(decl: &RulesetDecl) -> Result<Ruleset, DaemonError> {
    let mut rs = Ruleset::new(decl.name.as_str());
    for rule in &decl.rules {
        rs.push_rule(rule.build(&decl.name)?);
    }
    Ok(rs)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
