// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// 2023-03-05T14:07:09.250Z
const EPOCH_MS: u64 = 1_678_025_229_250;

#[test]
fn rfc3164_shape() {
    let ts = Timestamp::from_epoch_ms(EPOCH_MS);
    assert_eq!(ts.rfc3164(), "Mar  5 14:07:09");
}

#[test]
fn rfc3339_shape() {
    let ts = Timestamp::from_epoch_ms(EPOCH_MS);
    assert_eq!(ts.rfc3339(), "2023-03-05T14:07:09.250+00:00");
}

#[test]
fn sql_shape() {
    let ts = Timestamp::from_epoch_ms(EPOCH_MS);
    assert_eq!(ts.sql(), "2023-03-05 14:07:09");
}

#[test]
fn parse_rfc3339_keeps_offset() {
    let ts = Timestamp::parse_rfc3339("2023-03-05T15:07:09.250+01:00").unwrap();
    assert_eq!(ts.epoch_ms(), EPOCH_MS);
    assert_eq!(ts.hour(), 15);
}

#[test]
fn parse_rfc3339_rejects_garbage() {
    assert!(matches!(
        Timestamp::parse_rfc3339("yesterday"),
        Err(MsgError::BadTimestamp(_))
    ));
}

#[test]
fn calendar_fields() {
    let ts = Timestamp::from_epoch_ms(EPOCH_MS);
    assert_eq!(ts.year(), 2023);
    assert_eq!(ts.month(), 3);
    assert_eq!(ts.day(), 5);
    assert_eq!(ts.hour(), 14);
    assert_eq!(ts.minute(), 7);
}

#[test]
fn round_trips_epoch_ms() {
    let ts = Timestamp::from_epoch_ms(EPOCH_MS);
    assert_eq!(ts.epoch_ms(), EPOCH_MS);
}
