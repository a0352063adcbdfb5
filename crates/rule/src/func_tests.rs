// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
fn strlen_counts_bytes() {
    assert_eq!(call("strlen", vec![Value::Str("hello".into())]).unwrap(), Value::Num(5));
    assert_eq!(call("strlen", vec![Value::Num(1234)]).unwrap(), Value::Num(4));
    assert_eq!(call("strlen", vec![Value::Str(String::new())]).unwrap(), Value::Num(0));
}

#[test]
fn tolower_is_ascii_only() {
    assert_eq!(
        call("tolower", vec![Value::Str("HeLLo".into())]).unwrap(),
        Value::Str("hello".into())
    );
}

#[test]
fn arity_mismatch_is_rejected() {
    let err = call("strlen", vec![]).unwrap_err();
    assert!(matches!(err, ExecError::InvalidArgCount { got: 0, .. }));

    let err = call("tolower", vec![Value::Num(1), Value::Num(2)]).unwrap_err();
    assert!(matches!(err, ExecError::InvalidArgCount { got: 2, .. }));
}

#[test]
fn unknown_function_is_rejected() {
    assert!(matches!(
        call("frobnicate", vec![]),
        Err(ExecError::UnknownFunction(_))
    ));
}

#[test]
#[serial(process_env)]
fn getenv_reads_the_environment() {
    std::env::set_var("SM_RULE_FUNC_TEST", "forty-two");
    let got = call("getenv", vec![Value::Str("SM_RULE_FUNC_TEST".into())]).unwrap();
    assert_eq!(got, Value::Str("forty-two".into()));
    std::env::remove_var("SM_RULE_FUNC_TEST");
}

#[test]
#[serial(process_env)]
fn getenv_missing_is_empty() {
    std::env::remove_var("SM_RULE_FUNC_NO_SUCH");
    let got = call("getenv", vec![Value::Str("SM_RULE_FUNC_NO_SUCH".into())]).unwrap();
    assert_eq!(got, Value::Str(String::new()));
}
