// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::module::{DoResult, ModuleFactory};
use crate::testbench::CaptureFactory;
use sm_core::MsgBuilder;
use tokio_util::sync::CancellationToken;

fn msg(body: &str) -> Arc<Message> {
    Arc::new(MsgBuilder::new().body(body).build())
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial: Duration::from_millis(100),
        max: Duration::from_secs(2),
        jitter_pct: 20,
        max_retries: 0,
    }
}

fn body_template() -> Template {
    #[allow(clippy::unwrap_used)]
    Template::parse("%msg%").unwrap()
}

fn spawn_action(factory: &CaptureFactory, retry: RetryPolicy) -> Arc<Action> {
    let instance = factory.instantiate(&crate::ModuleParams::new()).unwrap();
    let cfg = ActionConfig::new("act-test")
        .retry(retry)
        .template(body_template())
        .queue(QueueConfig {
            capacity: 100,
            batch_size: 4,
            linger: Duration::ZERO,
            spill_watermark: 90,
        });
    Action::spawn(cfg, instance, None, CancellationToken::new())
}

async fn wait_for(pred: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn delivers_in_fifo_order() {
    let factory = CaptureFactory::new();
    let log = factory.log();
    let action = spawn_action(&factory, fast_retry());

    action.submit((0..5).map(|i| msg(&format!("m{i}")))).await.unwrap();
    wait_for(|| log.len() == 5).await;

    assert_eq!(log.entries(), vec!["m0", "m1", "m2", "m3", "m4"]);
    assert_eq!(action.stats().committed(), 5);
    assert_eq!(action.state(), ActionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn suspend_requeues_and_resumes_in_order() {
    let factory = CaptureFactory::new();
    let log = factory.log();
    // first three deliveries fail retriably, then everything works
    factory.script().push_n(DoResult::Suspend, 3);
    let action = spawn_action(&factory, fast_retry());

    action.submit((1..=5).map(|i| msg(&format!("m{i}")))).await.unwrap();
    wait_for(|| log.len() == 8).await;

    assert_eq!(
        log.entries(),
        vec!["m1", "m1", "m1", "m1", "m2", "m3", "m4", "m5"]
    );
    assert_eq!(action.stats().committed(), 5);
    assert_eq!(action.stats().suspends(), 3);
    assert_eq!(action.state(), ActionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn suspended_messages_stay_ahead_of_later_enqueues() {
    let factory = CaptureFactory::new();
    let log = factory.log();
    factory.script().push_n(DoResult::Suspend, 1);
    let action = spawn_action(&factory, fast_retry());

    action.submit([msg("old1"), msg("old2")]).await.unwrap();
    wait_for(|| action.state() == ActionState::Suspended).await;
    assert_eq!(log.len(), 1);

    // enqueue while suspended; must deliver after the requeued tail
    action.submit([msg("new")]).await.unwrap();
    wait_for(|| log.len() == 4).await;

    assert_eq!(log.entries(), vec!["old1", "old1", "old2", "new"]);
}

#[tokio::test(start_paused = true)]
async fn discard_drops_only_the_bad_element() {
    let factory = CaptureFactory::new();
    let log = factory.log();
    factory.script().push(DoResult::Committed);
    factory.script().push(DoResult::Discard);
    let action = spawn_action(&factory, fast_retry());

    action.submit([msg("good"), msg("poison"), msg("fine")]).await.unwrap();
    wait_for(|| log.len() == 3).await;

    assert_eq!(action.stats().committed(), 2);
    assert_eq!(action.stats().discarded(), 1);
}

#[tokio::test(start_paused = true)]
async fn disable_is_terminal_and_drops_new_work() {
    let factory = CaptureFactory::new();
    let log = factory.log();
    factory.script().push(DoResult::Disable);
    let action = spawn_action(&factory, fast_retry());

    action.submit([msg("boom"), msg("tail")]).await.unwrap();
    wait_for(|| action.state() == ActionState::Disabled).await;

    // the element that triggered the disable and the rest of its batch
    // are permanent failures
    wait_for(|| action.stats().failed() == 2).await;

    action.submit([msg("late")]).await.unwrap();
    assert_eq!(action.stats().dropped(), 1);
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_cap_disables_the_action() {
    let factory = CaptureFactory::new();
    factory.script().push(DoResult::Suspend);
    // every resume probe fails
    factory.resume_script().push_n(crate::ResumeResult::Suspend, 10);
    let retry = RetryPolicy { max_retries: 3, ..fast_retry() };
    let action = spawn_action(&factory, retry);

    action.submit([msg("m")]).await.unwrap();
    wait_for(|| action.state() == ActionState::Disabled).await;
    assert_eq!(action.stats().suspends(), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_up_to_the_cap() {
    let retry = RetryPolicy {
        initial: Duration::from_secs(2),
        max: Duration::from_secs(5),
        jitter_pct: 0,
        max_retries: 0,
    };
    let mut interval = retry.initial;
    interval = retry.next_interval(interval);
    assert_eq!(interval, Duration::from_secs(4));
    interval = retry.next_interval(interval);
    assert_eq!(interval, Duration::from_secs(5));
    interval = retry.next_interval(interval);
    assert_eq!(interval, Duration::from_secs(5));
}

#[test]
fn jitter_stays_within_the_band() {
    let retry = RetryPolicy {
        initial: Duration::from_secs(10),
        max: Duration::from_secs(600),
        jitter_pct: 20,
        max_retries: 0,
    };
    for attempt in 0..50 {
        let d = retry.jittered(Duration::from_secs(10), "act", attempt);
        assert!(d >= Duration::from_secs(8), "{d:?}");
        assert!(d <= Duration::from_secs(12), "{d:?}");
    }
    // deterministic for a given key
    assert_eq!(
        retry.jittered(Duration::from_secs(10), "act", 7),
        retry.jittered(Duration::from_secs(10), "act", 7)
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_drains_before_the_deadline() {
    let factory = CaptureFactory::new();
    let log = factory.log();
    let action = spawn_action(&factory, fast_retry());

    action.submit((0..10).map(|i| msg(&format!("m{i}")))).await.unwrap();
    action.shutdown(Duration::from_secs(5)).await;

    assert_eq!(log.len(), 10);
    assert_eq!(action.stats().committed(), 10);
    assert_eq!(action.stats().dropped(), 0);
}
