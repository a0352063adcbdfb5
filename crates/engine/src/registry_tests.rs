// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::module::{ModuleWorker, ParamDescr, Rendered};
use crate::testbench::CaptureFactory;
use crate::DoResult;
use async_trait::async_trait;

struct VersionedFactory {
    version: u32,
}

struct NullInstance;
struct NullWorker;

#[async_trait]
impl ModuleWorker for NullWorker {
    async fn do_action(&mut self, _msg: Rendered) -> DoResult {
        DoResult::Committed
    }
}

impl ModuleInstance for NullInstance {
    fn spawn_worker(&self) -> Box<dyn ModuleWorker> {
        Box::new(NullWorker)
    }
}

impl ModuleFactory for VersionedFactory {
    fn name(&self) -> &'static str {
        "versioned"
    }

    fn interface_version(&self) -> u32 {
        self.version
    }

    fn params(&self) -> &'static [ParamDescr] {
        const PARAMS: [ParamDescr; 2] =
            [ParamDescr::required("target"), ParamDescr::optional("note")];
        &PARAMS
    }

    fn instantiate(&self, _params: &ModuleParams) -> Result<Arc<dyn ModuleInstance>, EngineError> {
        Ok(Arc::new(NullInstance))
    }
}

fn registry_with(version: u32) -> ModuleRegistry {
    let mut reg = ModuleRegistry::new();
    reg.register(Arc::new(VersionedFactory { version }));
    reg
}

fn params(pairs: &[(&str, &str)]) -> ModuleParams {
    pairs.iter().map(|(k, v)| (k.to_string(), serde_json::json!(v))).collect()
}

#[test]
fn unknown_module_is_refused() {
    let reg = registry_with(1);
    assert!(matches!(reg.query("nope", 1), Err(EngineError::UnknownModule(_))));
}

#[test]
fn version_negotiation_accepts_older_modules() {
    let reg = registry_with(1);
    assert!(reg.query("versioned", 2).is_ok());
}

#[test]
fn version_negotiation_refuses_newer_modules() {
    let reg = registry_with(3);
    assert!(matches!(
        reg.query("versioned", 2),
        Err(EngineError::IncompatibleModule { module_version: 3, requested: 2, .. })
    ));
}

#[test]
fn instantiate_checks_required_params() {
    let reg = registry_with(1);
    assert!(matches!(
        reg.instantiate("versioned", 1, &params(&[("note", "x")])),
        Err(EngineError::MissingRequiredParam { .. })
    ));
}

#[test]
fn instantiate_rejects_unknown_params() {
    let reg = registry_with(1);
    assert!(matches!(
        reg.instantiate("versioned", 1, &params(&[("target", "t"), ("bogus", "x")])),
        Err(EngineError::UnknownParam { .. })
    ));
}

#[test]
fn instantiate_with_valid_params() {
    let reg = registry_with(1);
    assert!(reg
        .instantiate("versioned", 1, &params(&[("target", "t"), ("note", "x")]))
        .is_ok());
}

#[test]
fn registration_order_is_preserved() {
    let mut reg = ModuleRegistry::new();
    reg.register(Arc::new(CaptureFactory::new()));
    reg.register(Arc::new(VersionedFactory { version: 1 }));
    let names: Vec<&str> = reg.names().collect();
    assert_eq!(names, vec!["testbench", "versioned"]);
}
