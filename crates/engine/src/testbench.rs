// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capture module: an in-memory sink with scriptable outcomes, used
//! by this crate's tests and by the workspace integration specs.

use crate::error::EngineError;
use crate::module::{
    DoResult, ModuleFactory, ModuleInstance, ModuleParams, ModuleWorker, ParamDescr, RenderMode,
    Rendered, ResumeResult,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Shared record of every `do_action` call, in delivery order.
#[derive(Clone, Default)]
pub struct CaptureLog(Arc<Mutex<Vec<String>>>);

impl CaptureLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }
}

/// Scripted `do_action` outcomes; exhausted scripts commit.
#[derive(Clone, Default)]
pub struct Script(Arc<Mutex<VecDeque<DoResult>>>);

impl Script {
    pub fn push(&self, result: DoResult) {
        self.0.lock().push_back(result);
    }

    pub fn push_n(&self, result: DoResult, n: usize) {
        let mut q = self.0.lock();
        for _ in 0..n {
            q.push_back(result);
        }
    }

    fn next(&self) -> DoResult {
        self.0.lock().pop_front().unwrap_or(DoResult::Committed)
    }
}

/// Scripted `try_resume` outcomes; exhausted scripts succeed.
#[derive(Clone, Default)]
pub struct ResumeScript(Arc<Mutex<VecDeque<ResumeResult>>>);

impl ResumeScript {
    pub fn push_n(&self, result: ResumeResult, n: usize) {
        let mut q = self.0.lock();
        for _ in 0..n {
            q.push_back(result);
        }
    }

    fn next(&self) -> ResumeResult {
        self.0.lock().pop_front().unwrap_or(ResumeResult::Ok)
    }
}

pub struct CaptureFactory {
    log: CaptureLog,
    script: Script,
    resume: ResumeScript,
    mode: RenderMode,
}

impl CaptureFactory {
    pub fn new() -> Self {
        Self {
            log: CaptureLog::default(),
            script: Script::default(),
            resume: ResumeScript::default(),
            mode: RenderMode::AsBytes,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn log(&self) -> CaptureLog {
        self.log.clone()
    }

    pub fn script(&self) -> Script {
        self.script.clone()
    }

    pub fn resume_script(&self) -> ResumeScript {
        self.resume.clone()
    }
}

impl Default for CaptureFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleFactory for CaptureFactory {
    fn name(&self) -> &'static str {
        "testbench"
    }

    fn params(&self) -> &'static [ParamDescr] {
        const PARAMS: [ParamDescr; 1] = [ParamDescr::optional("label")];
        &PARAMS
    }

    fn instantiate(&self, _params: &ModuleParams) -> Result<Arc<dyn ModuleInstance>, EngineError> {
        Ok(Arc::new(CaptureInstance {
            log: self.log.clone(),
            script: self.script.clone(),
            resume: self.resume.clone(),
            mode: self.mode,
        }))
    }
}

struct CaptureInstance {
    log: CaptureLog,
    script: Script,
    resume: ResumeScript,
    mode: RenderMode,
}

impl ModuleInstance for CaptureInstance {
    fn render_mode(&self) -> RenderMode {
        self.mode
    }

    fn spawn_worker(&self) -> Box<dyn ModuleWorker> {
        Box::new(CaptureWorker {
            log: self.log.clone(),
            script: self.script.clone(),
            resume: self.resume.clone(),
        })
    }
}

struct CaptureWorker {
    log: CaptureLog,
    script: Script,
    resume: ResumeScript,
}

#[async_trait]
impl ModuleWorker for CaptureWorker {
    async fn do_action(&mut self, msg: Rendered) -> DoResult {
        // every call is recorded, including ones answered with Suspend
        self.log.push(msg.as_text());
        self.script.next()
    }

    async fn try_resume(&mut self) -> ResumeResult {
        self.resume.next()
    }
}
