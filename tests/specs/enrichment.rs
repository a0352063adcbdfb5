// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured-payload enrichment scenarios.

use super::prelude::*;
use serde_json::json;
use sm_core::JsonPath;
use sm_rule::{compile, Filter, Rule, Ruleset};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn de_dot_rewrites_enriched_keys() {
    let m = sm_core::MsgBuilder::new().body("x").build();
    m.merge_subtree(&JsonPath::parse("$!labels").unwrap(), json!({"a.b": "v"}));
    m.de_dot_payload("_");

    let snapshot = m.payload_snapshot();
    assert_eq!(snapshot, json!({"labels": {"a_b": "v"}}));
    assert!(snapshot["labels"].get("a.b").is_none());
}

/// Enrichment lands mid-pipeline: a subtree merged after submission is
/// visible to a later filter evaluation of the same shared message.
#[tokio::test(start_paused = true)]
async fn merged_subtree_is_visible_to_filters() {
    let bench = bench();

    let mut rs = Ruleset::new("default");
    rs.push_rule(Rule::new(
        Filter::expr(compile("$!k8s!namespace == 'prod'").unwrap()),
        ["store"],
    ));
    bench.ctx.install_ruleset(rs).unwrap();

    let m = Arc::new(sm_core::MsgBuilder::new().body("enriched").build());
    m.merge_subtree(
        &JsonPath::parse("$!k8s").unwrap(),
        json!({"namespace": "prod", "pod": "api-1"}),
    );

    bench.ctx.submit_message("default", m).await.unwrap();
    wait_for(|| bench.log.len() == 1).await;
    assert_eq!(bench.log.entries(), vec!["enriched"]);
}

#[tokio::test(start_paused = true)]
async fn replacing_a_subtree_drops_the_old_one() {
    let m = sm_core::MsgBuilder::new().build();
    let path = JsonPath::parse("$!meta").unwrap();
    m.merge_subtree(&path, json!({"stale": true}));
    m.merge_subtree(&path, json!({"fresh": 1}));

    assert_eq!(m.payload_snapshot(), json!({"meta": {"fresh": 1}}));
}
