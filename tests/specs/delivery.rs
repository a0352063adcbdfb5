// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery ordering and shutdown scenarios.

use super::prelude::*;
use sm_engine::{ActionConfig, DoResult, ModuleParams};
use sm_rule::{parse_selector, Filter, Rule, Ruleset};
use sm_storage::{Spool, SpoolConfig};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn catchall(bench: &Bench) {
    let mut rs = Ruleset::new("default");
    rs.push_rule(Rule::new(Filter::prio(parse_selector("*.*").unwrap()), ["store"]));
    bench.ctx.install_ruleset(rs).unwrap();
}

#[tokio::test(start_paused = true)]
async fn fifo_delivery_without_suspends() {
    let bench = bench();
    catchall(&bench);

    for i in 0..20 {
        bench.ctx.submit_message("default", msg("user", "info", &format!("m{i:02}"))).await.unwrap();
    }
    wait_for(|| bench.log.len() == 20).await;

    let want: Vec<String> = (0..20).map(|i| format!("m{i:02}")).collect();
    assert_eq!(bench.log.entries(), want);
}

/// An action that fails retriably three times delivers the whole
/// sequence in order once it recovers, redelivering the failed head.
#[tokio::test(start_paused = true)]
async fn suspend_and_resume_preserves_order() {
    let bench = bench();
    catchall(&bench);
    bench.script.push_n(DoResult::Suspend, 3);

    for i in 1..=5 {
        bench.ctx.submit_message("default", msg("user", "info", &format!("m{i}"))).await.unwrap();
    }
    wait_for(|| bench.log.len() == 8).await;

    assert_eq!(
        bench.log.entries(),
        vec!["m1", "m1", "m1", "m1", "m2", "m3", "m4", "m5"]
    );
}

/// Soft shutdown with a spool: everything submitted is either committed
/// by the module or sitting in the spool, with no duplicates.
#[tokio::test(start_paused = true)]
async fn clean_shutdown_loses_nothing() {
    let dir = tempfile::TempDir::new().unwrap();

    let committed = {
        let mut ctx = sm_engine::CoreContext::new(sm_core::FakeClock::new(), "testhost");
        let factory = sm_engine::testbench::CaptureFactory::new();
        let log = factory.log();
        // three commits, then the sink goes away for good
        factory.script().push_n(DoResult::Committed, 3);
        factory.script().push_n(DoResult::Suspend, 1000);
        factory.resume_script().push_n(sm_engine::ResumeResult::Suspend, 1000);
        ctx.registry_mut().register(Arc::new(factory));

        let spool = Spool::open(SpoolConfig::new(dir.path())).unwrap();
        let cfg = ActionConfig::new("store")
            .template(body_template())
            .retry(fast_retry())
            .queue(small_queue());
        ctx.add_action(cfg, "testbench", &ModuleParams::new(), Some(spool)).unwrap();

        let mut rs = Ruleset::new("default");
        rs.push_rule(Rule::new(Filter::prio(parse_selector("*.*").unwrap()), ["store"]));
        ctx.install_ruleset(rs).unwrap();

        for i in 0..10 {
            ctx.submit_message("default", msg("user", "info", &format!("m{i}"))).await.unwrap();
        }
        wait_for(|| log.len() >= 4).await; // the 4th call answered Suspend
        ctx.shutdown(Duration::from_millis(500)).await;

        let mut committed: Vec<String> = log.entries();
        // the suspended delivery attempts did not commit
        committed.truncate(3);
        committed
    };

    // read back what the spool retained
    let mut spool = Spool::open(SpoolConfig::new(dir.path())).unwrap();
    let mut spooled = BTreeSet::new();
    while let Some(rec) = spool.next().unwrap() {
        let record: sm_core::MsgRecord = serde_json::from_slice(&rec).unwrap();
        spooled.insert(record.body.unwrap_or_default());
    }

    let mut all: BTreeSet<String> = committed.iter().cloned().collect();
    assert_eq!(all.len(), 3, "no duplicate commits");
    for body in &spooled {
        assert!(all.insert(body.clone()), "duplicate between committed and spooled: {body}");
    }
    let want: BTreeSet<String> = (0..10).map(|i| format!("m{i}")).collect();
    assert_eq!(all, want, "committed and spooled together cover every message");
}

/// A disabled action stops consuming; later submissions are dropped and
/// counted rather than queued forever.
#[tokio::test(start_paused = true)]
async fn disabled_action_drops_and_counts() {
    let bench = bench();
    catchall(&bench);
    bench.script.push(DoResult::Disable);

    bench.ctx.submit_message("default", msg("user", "info", "fatal")).await.unwrap();
    let action = bench.ctx.action("store").unwrap();
    wait_for(|| action.state() == sm_engine::ActionState::Disabled).await;

    bench.ctx.submit_message("default", msg("user", "info", "after")).await.unwrap();
    wait_for(|| action.stats().dropped() == 1).await;
    assert_eq!(bench.log.len(), 1);
}
