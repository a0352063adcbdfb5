// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The core context: module registry, ruleset table, and running
//! actions, threaded explicitly through the system instead of living in
//! globals.

use crate::action::{Action, ActionConfig};
use crate::batch::Batch;
use crate::error::EngineError;
use crate::module::{ModuleParams, MODULE_IF_VERSION};
use crate::registry::ModuleRegistry;
use indexmap::IndexMap;
use parking_lot::RwLock;
use sm_core::{Clock, Message};
use sm_rule::{Ruleset, Vm};
use sm_storage::Spool;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct CoreContext<C: Clock> {
    registry: ModuleRegistry,
    vm: Vm<C>,
    rulesets: RwLock<HashMap<SmolStr, Arc<Ruleset>>>,
    actions: RwLock<IndexMap<SmolStr, Arc<Action>>>,
    soft_shutdown: CancellationToken,
    hard_shutdown: CancellationToken,
}

impl<C: Clock> CoreContext<C> {
    pub fn new(clock: C, myhostname: impl Into<SmolStr>) -> Self {
        Self {
            registry: ModuleRegistry::new(),
            vm: Vm::new(clock, myhostname.into()),
            rulesets: RwLock::new(HashMap::new()),
            actions: RwLock::new(IndexMap::new()),
            soft_shutdown: CancellationToken::new(),
            hard_shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Instantiate a module and spawn the action around it.
    pub fn add_action(
        &self,
        cfg: ActionConfig,
        module: &str,
        params: &ModuleParams,
        spool: Option<Spool>,
    ) -> Result<Arc<Action>, EngineError> {
        if self.actions.read().contains_key(cfg.name.as_str()) {
            return Err(EngineError::Config(format!("duplicate action name: {}", cfg.name)));
        }
        let instance = self.registry.instantiate(module, MODULE_IF_VERSION, params)?;
        let name = cfg.name.clone();
        let action = Action::spawn(cfg, instance, spool, self.hard_shutdown.child_token());
        self.actions.write().insert(name, Arc::clone(&action));
        Ok(action)
    }

    /// Remove an action from the table and shut it down.
    pub async fn remove_action(&self, name: &str, grace: Duration) {
        let removed = self.actions.write().shift_remove(name);
        if let Some(action) = removed {
            action.shutdown(grace).await;
        }
    }

    pub fn action(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.read().get(name).cloned()
    }

    pub fn action_names(&self) -> Vec<SmolStr> {
        self.actions.read().keys().cloned().collect()
    }

    /// Install one ruleset; every referenced action must exist.
    pub fn install_ruleset(&self, ruleset: Ruleset) -> Result<(), EngineError> {
        self.validate_ruleset(&ruleset)?;
        self.rulesets.write().insert(ruleset.name.clone(), Arc::new(ruleset));
        Ok(())
    }

    /// Atomically replace the whole ruleset table (configuration
    /// reload). The old table stays in place if any new set fails
    /// validation.
    pub fn swap_rulesets(&self, rulesets: Vec<Ruleset>) -> Result<(), EngineError> {
        for rs in &rulesets {
            self.validate_ruleset(rs)?;
        }
        let table = rulesets
            .into_iter()
            .map(|rs| (rs.name.clone(), Arc::new(rs)))
            .collect();
        *self.rulesets.write() = table;
        Ok(())
    }

    /// Check that every action a ruleset references is running.
    pub fn validate_ruleset(&self, ruleset: &Ruleset) -> Result<(), EngineError> {
        let actions = self.actions.read();
        for rule in &ruleset.rules {
            for name in &rule.actions {
                if !actions.contains_key(name.as_str()) {
                    return Err(EngineError::UnknownAction(name.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Submit one message to a ruleset, transferring the reference.
    pub async fn submit_message(
        &self,
        ruleset: &str,
        msg: Arc<Message>,
    ) -> Result<(), EngineError> {
        self.process_batch(ruleset, vec![msg]).await
    }

    /// Run the per-filter decision for every message, mark the
    /// per-element flags, and submit each rule's batch once to each of
    /// its actions.
    pub async fn process_batch(
        &self,
        ruleset: &str,
        msgs: Vec<Arc<Message>>,
    ) -> Result<(), EngineError> {
        if self.soft_shutdown.is_cancelled() {
            return Err(EngineError::ShuttingDown);
        }
        let rs = self
            .rulesets
            .read()
            .get(ruleset)
            .cloned()
            .ok_or_else(|| EngineError::UnknownRuleset(ruleset.to_string()))?;

        for rule in &rs.rules {
            let mut batch = Batch::new(msgs.iter().cloned());
            for i in 0..batch.len() {
                let ok = match rule.filter.matches(&batch.elem(i).msg, &self.vm) {
                    Ok(ok) => ok,
                    Err(e) => {
                        tracing::warn!(ruleset, error = %e, "filter evaluation failed");
                        false
                    }
                };
                batch.set_filter_ok(i, ok);
            }
            let matched = batch.filter_ok_msgs();
            if matched.is_empty() {
                continue;
            }
            let targets: Vec<Arc<Action>> = {
                let actions = self.actions.read();
                rule.actions
                    .iter()
                    .filter_map(|name| actions.get(name.as_str()).cloned())
                    .collect()
            };
            for action in targets {
                match action.submit(matched.iter().cloned()).await {
                    Ok(()) => {}
                    Err(EngineError::QueueClosed) => return Err(EngineError::ShuttingDown),
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Two-phase shutdown of every action: stop intake, drain until the
    /// grace deadline, then cancel and write back.
    pub async fn shutdown(&self, grace: Duration) {
        self.soft_shutdown.cancel();
        let actions: Vec<Arc<Action>> = self.actions.read().values().cloned().collect();
        let mut joins = Vec::with_capacity(actions.len());
        for action in actions {
            joins.push(tokio::spawn(async move { action.shutdown(grace).await }));
        }
        for join in joins {
            let _ = join.await;
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
