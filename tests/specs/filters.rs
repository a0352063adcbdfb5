// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter routing scenarios.

use super::prelude::*;
use sm_rule::{compile, parse_selector, Filter, Rule, Ruleset};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn pri_filter_routes_only_matching_pairs() {
    let bench = bench();

    // facility user, severity warning (4) and more severe
    let mut rs = Ruleset::new("default");
    rs.push_rule(Rule::new(Filter::prio(parse_selector("user.warning").unwrap()), ["store"]));
    bench.ctx.install_ruleset(rs).unwrap();

    bench.ctx.submit_message("default", msg("user", "err", "in-range")).await.unwrap();
    bench.ctx.submit_message("default", msg("user", "notice", "too-low")).await.unwrap();
    bench.ctx.submit_message("default", msg("mail", "err", "wrong-facility")).await.unwrap();

    wait_for(|| bench.log.len() == 1).await;
    assert_eq!(bench.log.entries(), vec!["in-range"]);
}

#[tokio::test(start_paused = true)]
async fn expression_filter_reads_body_and_payload() {
    let bench = bench();

    let mut rs = Ruleset::new("default");
    rs.push_rule(Rule::new(
        Filter::expr(compile("$msg contains 'ERROR' and $!app == 'nginx'").unwrap()),
        ["store"],
    ));
    bench.ctx.install_ruleset(rs).unwrap();

    let with_app = |body: &str, app: &str| {
        Arc::new(
            sm_core::MsgBuilder::new()
                .body(body)
                .payload_entry("app", serde_json::json!(app))
                .build(),
        )
    };

    bench.ctx.submit_message("default", with_app("ERROR 500", "nginx")).await.unwrap();
    bench.ctx.submit_message("default", with_app("ERROR 500", "apache")).await.unwrap();
    bench.ctx.submit_message("default", with_app("OK 200", "nginx")).await.unwrap();

    wait_for(|| bench.log.len() == 1).await;
    assert_eq!(bench.log.entries(), vec!["ERROR 500"]);
}

#[tokio::test(start_paused = true)]
async fn rules_fan_out_without_short_circuit() {
    let bench = bench();

    let mut rs = Ruleset::new("default");
    rs.push_rule(Rule::new(
        Filter::expr(compile("$syslogseverity <= 3").unwrap()),
        ["store"],
    ));
    rs.push_rule(Rule::new(Filter::prio(parse_selector("*.*").unwrap()), ["store"]));
    bench.ctx.install_ruleset(rs).unwrap();

    // err matches both rules, info only the catch-all
    bench.ctx.submit_message("default", msg("user", "err", "loud")).await.unwrap();
    wait_for(|| bench.log.len() == 2).await;

    bench.ctx.submit_message("default", msg("user", "info", "quiet")).await.unwrap();
    wait_for(|| bench.log.len() == 3).await;

    assert_eq!(bench.log.entries(), vec!["loud", "loud", "quiet"]);
}
