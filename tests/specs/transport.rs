// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding transport scenarios against live loopback sockets.

use sm_core::{MsgBuilder, SystemClock};
use sm_engine::{ActionConfig, CoreContext, QueueConfig, RetryPolicy, Template};
use sm_rule::{parse_selector, Filter, Rule, Ruleset};
use sm_wire::{decompress_payload, is_compressed, FrameDecoder, Framing};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

fn fwd_params(pairs: &[(&str, serde_json::Value)]) -> sm_engine::ModuleParams {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn fwd_ctx() -> CoreContext<SystemClock> {
    let mut ctx = CoreContext::new(SystemClock, "testhost");
    ctx.registry_mut().register(Arc::new(sm_fwd::FwdFactory::new()));
    ctx
}

fn body_action(name: &str) -> ActionConfig {
    ActionConfig::new(name)
        .template(Template::parse("%msg%").expect("template parses"))
        .retry(RetryPolicy {
            initial: Duration::from_millis(50),
            max: Duration::from_millis(200),
            jitter_pct: 0,
            max_retries: 0,
        })
        .queue(QueueConfig {
            capacity: 100,
            batch_size: 4,
            linger: Duration::ZERO,
            spill_watermark: 90,
        })
}

fn catchall(ctx: &CoreContext<SystemClock>, action: &str) {
    let mut rs = Ruleset::new("default");
    rs.push_rule(Rule::new(
        Filter::prio(parse_selector("*.*").expect("selector parses")),
        [action],
    ));
    ctx.install_ruleset(rs).expect("ruleset installs");
}

fn record(body: &str) -> Arc<sm_core::Message> {
    Arc::new(MsgBuilder::new().body(body).build())
}

async fn read_until_close(listener: TcpListener) -> Vec<u8> {
    let (mut sock, _) = listener.accept().await.expect("accept");
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match tokio::time::timeout(Duration::from_secs(5), sock.read(&mut chunk)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    buf
}

/// A body with an embedded LF goes out octet-counted as
/// `len SP payload`, and comes back intact.
#[tokio::test]
async fn octet_counting_round_trip_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let reader = tokio::spawn(read_until_close(listener));

    let ctx = fwd_ctx();
    ctx.add_action(
        body_action("fwd-out"),
        "fwd",
        &fwd_params(&[
            ("target", "127.0.0.1".into()),
            ("port", port.into()),
            ("protocol", "tcp".into()),
            ("framing", "octet-counting".into()),
        ]),
        None,
    )
    .expect("action starts");
    catchall(&ctx, "fwd-out");

    ctx.submit_message("default", record("hello\nworld")).await.expect("submit");
    // let the handshake finish so the next record takes the ready path
    tokio::time::sleep(Duration::from_millis(200)).await;
    // second frame proves the first did not eat trailing bytes
    ctx.submit_message("default", record("second")).await.expect("submit");

    tokio::time::sleep(Duration::from_millis(300)).await;
    ctx.shutdown(Duration::from_secs(2)).await;
    let bytes = reader.await.expect("reader");

    assert!(bytes.starts_with(b"11 hello\nworld"));
    let mut dec = FrameDecoder::new(Framing::OctetCounting);
    dec.push(&bytes);
    assert_eq!(dec.next_frame().expect("frame"), Some(b"hello\nworld".to_vec()));
    assert_eq!(dec.next_frame().expect("frame"), Some(b"second".to_vec()));
}

/// Large compressible payloads arrive as `z`-marked octet-counted
/// frames even on an octet-stuffing session; small ones stay plain.
#[tokio::test]
async fn compressed_frames_force_octet_counting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let reader = tokio::spawn(read_until_close(listener));

    let ctx = fwd_ctx();
    ctx.add_action(
        body_action("fwd-out"),
        "fwd",
        &fwd_params(&[
            ("target", "127.0.0.1".into()),
            ("port", port.into()),
            ("protocol", "tcp".into()),
            ("framing", "octet-stuffing".into()),
            ("compression-level", 6.into()),
        ]),
        None,
    )
    .expect("action starts");
    catchall(&ctx, "fwd-out");

    let big: String = "repetitive log line ".repeat(90); // ~1800 bytes
    ctx.submit_message("default", record(&big)).await.expect("submit");

    tokio::time::sleep(Duration::from_millis(300)).await;
    ctx.shutdown(Duration::from_secs(2)).await;
    let bytes = reader.await.expect("reader");

    // the frame is length-prefixed although the session is stuffing
    let mut dec = FrameDecoder::new(Framing::OctetCounting);
    dec.push(&bytes);
    let frame = dec.next_frame().expect("frame").expect("one frame");
    assert!(is_compressed(&frame));
    assert_eq!(decompress_payload(&frame).expect("inflates"), big.as_bytes());
}

/// An unresolvable UDP target suspends the action and keeps the queue
/// intact: nothing is lost while the transport is down.
#[tokio::test]
async fn unresolvable_udp_target_suspends_without_loss() {
    let ctx = fwd_ctx();
    ctx.add_action(
        body_action("fwd-udp"),
        "fwd",
        &fwd_params(&[
            ("target", "does-not-exist.invalid".into()),
            ("protocol", "udp".into()),
            ("compression-level", 6.into()),
        ]),
        None,
    )
    .expect("action starts");
    catchall(&ctx, "fwd-udp");

    let action = ctx.action("fwd-udp").expect("action");
    let payload = "x".repeat(2000);
    for _ in 0..3 {
        ctx.submit_message("default", record(&payload)).await.expect("submit");
    }

    for _ in 0..100 {
        if action.state() == sm_engine::ActionState::Suspended {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(action.state(), sm_engine::ActionState::Suspended);

    // every message is still queued or held in the pending batch
    assert_eq!(action.stats().committed(), 0);
    assert_eq!(action.stats().discarded(), 0);
    assert_eq!(action.stats().dropped(), 0);
}
