// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-module registry.

use crate::error::EngineError;
use crate::module::{ModuleFactory, ModuleInstance, ModuleParams};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;

/// Maps module names to factories and mediates the interface-version
/// negotiation: a lookup states the highest version the host speaks, and
/// a module whose version is newer is refused.
#[derive(Default)]
pub struct ModuleRegistry {
    mods: IndexMap<SmolStr, Arc<dyn ModuleFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn ModuleFactory>) {
        let name = SmolStr::new(factory.name());
        tracing::debug!(module = %name, version = factory.interface_version(), "registered module");
        self.mods.insert(name, factory);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mods.keys().map(|k| k.as_str())
    }

    /// Look up a module, negotiating the interface version.
    pub fn query(
        &self,
        name: &str,
        requested: u32,
    ) -> Result<Arc<dyn ModuleFactory>, EngineError> {
        let factory = self
            .mods
            .get(name)
            .ok_or_else(|| EngineError::UnknownModule(name.to_string()))?;
        let module_version = factory.interface_version();
        if module_version > requested {
            return Err(EngineError::IncompatibleModule {
                module: name.to_string(),
                module_version,
                requested,
            });
        }
        Ok(Arc::clone(factory))
    }

    /// Validate parameters against the module's descriptor and
    /// instantiate.
    pub fn instantiate(
        &self,
        name: &str,
        requested: u32,
        params: &ModuleParams,
    ) -> Result<Arc<dyn ModuleInstance>, EngineError> {
        let factory = self.query(name, requested)?;
        let descr = factory.params();

        for key in params.keys() {
            if !descr.iter().any(|d| d.name == key) {
                return Err(EngineError::UnknownParam {
                    module: name.to_string(),
                    param: key.clone(),
                });
            }
        }
        for d in descr.iter().filter(|d| d.required) {
            if !params.contains_key(d.name) {
                return Err(EngineError::MissingRequiredParam {
                    module: name.to_string(),
                    param: d.name.to_string(),
                });
            }
        }
        factory.instantiate(params)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
