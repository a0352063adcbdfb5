// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parse::compile;
use sm_core::{FakeClock, MsgBuilder, PropId};
use yare::parameterized;

fn vm() -> Vm<FakeClock> {
    Vm::new(FakeClock::new(), "testhost")
}

#[test]
fn prio_bitmap_matches_exact_bit_rule() {
    // facility mail, severity err and better
    let table = parse_selector("mail.err").unwrap();
    let filter = Filter::prio(table);
    let vm = vm();

    for fac in 0..24u8 {
        for sev in 0..8u8 {
            let msg = MsgBuilder::new()
                .facility(facility_name(fac))
                .severity(severity_name(sev))
                .build();
            let want = table[usize::from(fac)] & (1 << sev) != 0;
            assert_eq!(
                filter.matches(&msg, &vm).unwrap(),
                want,
                "facility {fac} severity {sev}"
            );
        }
    }
}

fn facility_name(code: u8) -> &'static str {
    [
        "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news", "uucp", "cron",
        "authpriv", "ftp", "ntp", "audit", "alert", "clock", "local0", "local1", "local2",
        "local3", "local4", "local5", "local6", "local7",
    ][usize::from(code)]
}

fn severity_name(code: u8) -> &'static str {
    ["emerg", "alert", "crit", "err", "warning", "notice", "info", "debug"][usize::from(code)]
}

#[parameterized(
    exact_severity = { "mail.=info", 2, 6, true },
    exact_excludes_better = { "mail.=info", 2, 3, false },
    range_includes_better = { "mail.err", 2, 0, true },
    range_excludes_worse = { "mail.err", 2, 4, false },
    star_facility = { "*.err", 9, 3, true },
    star_severity = { "mail.*", 2, 7, true },
    other_facility_unmatched = { "mail.*", 3, 3, false },
    comma_list = { "mail,news.err", 7, 3, true },
)]
fn selector_semantics(selector: &str, fac: u8, sev: u8, want: bool) {
    let table = parse_selector(selector).unwrap();
    let msg = MsgBuilder::new()
        .facility(facility_name(fac))
        .severity(severity_name(sev))
        .build();
    let got = Filter::prio(table).matches(&msg, &vm()).unwrap();
    assert_eq!(got, want);
}

#[test]
fn selector_none_clears_facility() {
    let table = parse_selector("*.err;mail.none").unwrap();
    assert_eq!(table[2], TABLE_NOPRI);
    assert_ne!(table[3], TABLE_NOPRI);
}

#[test]
fn selector_negation_clears_bits() {
    // info and better, then remove exactly info
    let table = parse_selector("mail.info;mail.!=info").unwrap();
    assert_eq!(table[2] & (1 << 6), 0);
    assert_ne!(table[2] & (1 << 3), 0);
}

#[test]
fn selector_rejects_garbage() {
    assert!(parse_selector("mail").is_err());
    assert!(parse_selector("nosuchfac.err").is_err());
    assert!(parse_selector("mail.nosuchsev").is_err());
}

#[parameterized(
    contains_hit = { CompareOp::Contains, "time", false, true },
    contains_miss = { CompareOp::Contains, "nope", false, false },
    contains_negated = { CompareOp::Contains, "nope", true, true },
    isequal_hit = { CompareOp::IsEqual, "connection timed out", false, true },
    isequal_miss = { CompareOp::IsEqual, "connection", false, false },
    startswith_hit = { CompareOp::StartsWith, "connection", false, true },
    startswith_miss = { CompareOp::StartsWith, "timed", false, false },
)]
fn prop_filter_ops(op: CompareOp, value: &str, negate: bool, want: bool) {
    let msg = MsgBuilder::new().body("connection timed out").build();
    let pf = PropFilter::new(Property::from_id(PropId::Msg), op, value, negate).unwrap();
    assert_eq!(pf.matches(&msg), want);
}

#[test]
fn prop_filter_isempty() {
    let empty = MsgBuilder::new().build();
    let full = MsgBuilder::new().body("x").build();
    let pf =
        PropFilter::new(Property::from_id(PropId::Msg), CompareOp::IsEmpty, "", false).unwrap();
    assert!(pf.matches(&empty));
    assert!(!pf.matches(&full));
}

#[test]
fn regex_anchored_prefix() {
    let pf =
        PropFilter::new(Property::from_id(PropId::Msg), CompareOp::Regex, "^foo", false).unwrap();
    assert!(pf.matches(&MsgBuilder::new().body("foobar").build()));
    assert!(!pf.matches(&MsgBuilder::new().body("barfoo").build()));
}

#[test]
fn regex_bre_treats_group_chars_as_literals() {
    let pf =
        PropFilter::new(Property::from_id(PropId::Msg), CompareOp::Regex, "(a|b)+", false)
            .unwrap();
    assert!(pf.matches(&MsgBuilder::new().body("literal (a|b)+ here").build()));
    assert!(!pf.matches(&MsgBuilder::new().body("ab").build()));
}

#[test]
fn eregex_alternation() {
    let pf =
        PropFilter::new(Property::from_id(PropId::Msg), CompareOp::ERegex, "(a|b)+", false)
            .unwrap();
    assert!(pf.matches(&MsgBuilder::new().body("ab").build()));
    assert!(!pf.matches(&MsgBuilder::new().body("cd").build()));
}

#[test]
fn invalid_regex_is_a_config_error() {
    assert!(matches!(
        PropFilter::new(Property::from_id(PropId::Msg), CompareOp::ERegex, "(unclosed", false),
        Err(FilterError::InvalidRegex { .. })
    ));
}

#[test]
fn host_prefilter_gates_the_body() {
    let filter = Filter::prio(parse_selector("*.*").unwrap()).with_host(NameMatch::is("web1"));
    let hit = MsgBuilder::new().hostname("web1").build();
    let miss = MsgBuilder::new().hostname("web2").build();
    assert!(filter.matches(&hit, &vm()).unwrap());
    assert!(!filter.matches(&miss, &vm()).unwrap());
}

#[test]
fn negated_host_prefilter() {
    let filter = Filter::prio(parse_selector("*.*").unwrap()).with_host(NameMatch::is_not("web1"));
    assert!(!filter.matches(&MsgBuilder::new().hostname("web1").build(), &vm()).unwrap());
    assert!(filter.matches(&MsgBuilder::new().hostname("web2").build(), &vm()).unwrap());
}

#[test]
fn program_prefilter_uses_progname() {
    let filter =
        Filter::prio(parse_selector("*.*").unwrap()).with_program(NameMatch::is("nginx"));
    assert!(filter.matches(&MsgBuilder::new().tag("nginx[12]").build(), &vm()).unwrap());
    assert!(!filter.matches(&MsgBuilder::new().tag("apache[1]").build(), &vm()).unwrap());
}

#[test]
fn expr_filter_body() {
    let filter = Filter::expr(compile("$msg contains 'ERROR'").unwrap());
    assert!(filter.matches(&MsgBuilder::new().body("ERROR 500").build(), &vm()).unwrap());
    assert!(!filter.matches(&MsgBuilder::new().body("OK 200").build(), &vm()).unwrap());
}
