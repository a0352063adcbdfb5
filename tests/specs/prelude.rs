// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs.

use sm_core::{FakeClock, Message, MsgBuilder};
use sm_engine::testbench::{CaptureFactory, CaptureLog, ResumeScript, Script};
use sm_engine::{ActionConfig, CoreContext, ModuleParams, QueueConfig, RetryPolicy, Template};
use std::sync::Arc;
use std::time::Duration;

pub fn msg(facility: &'static str, severity: &'static str, body: &str) -> Arc<Message> {
    Arc::new(MsgBuilder::new().facility(facility).severity(severity).body(body).build())
}

pub struct Bench {
    pub ctx: CoreContext<FakeClock>,
    pub log: CaptureLog,
    pub script: Script,
    pub resume: ResumeScript,
}

/// A context with one capture action named `store` and fast retries.
pub fn bench() -> Bench {
    let mut ctx = CoreContext::new(FakeClock::new(), "testhost");
    let factory = CaptureFactory::new();
    let log = factory.log();
    let script = factory.script();
    let resume = factory.resume_script();
    ctx.registry_mut().register(Arc::new(factory));

    let cfg = ActionConfig::new("store")
        .template(body_template())
        .retry(fast_retry())
        .queue(small_queue());
    ctx.add_action(cfg, "testbench", &ModuleParams::new(), None)
        .expect("capture action starts");

    Bench { ctx, log, script, resume }
}

pub fn body_template() -> Template {
    Template::parse("%msg%").expect("template parses")
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial: Duration::from_millis(50),
        max: Duration::from_secs(1),
        jitter_pct: 0,
        max_retries: 0,
    }
}

pub fn small_queue() -> QueueConfig {
    QueueConfig {
        capacity: 100,
        batch_size: 8,
        linger: Duration::ZERO,
        spill_watermark: 90,
    }
}

pub async fn wait_for(pred: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}
