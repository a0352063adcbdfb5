// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::op::Op;
use crate::value::Value;

fn ops(expr: &str) -> Vec<Op> {
    compile(expr).unwrap().ops().to_vec()
}

#[test]
fn literal_is_pushed() {
    assert_eq!(
        ops("42"),
        vec![Op::PushConstant(Value::Num(42)), Op::EndProg]
    );
}

#[test]
fn postfix_order_for_binary_ops() {
    assert_eq!(
        ops("1 + 2"),
        vec![
            Op::PushConstant(Value::Num(1)),
            Op::PushConstant(Value::Num(2)),
            Op::Plus,
            Op::EndProg,
        ]
    );
}

#[test]
fn precedence_times_over_plus() {
    assert_eq!(
        ops("1 + 2 * 3"),
        vec![
            Op::PushConstant(Value::Num(1)),
            Op::PushConstant(Value::Num(2)),
            Op::PushConstant(Value::Num(3)),
            Op::Times,
            Op::Plus,
            Op::EndProg,
        ]
    );
}

#[test]
fn parens_override_precedence() {
    assert_eq!(
        ops("(1 + 2) * 3"),
        vec![
            Op::PushConstant(Value::Num(1)),
            Op::PushConstant(Value::Num(2)),
            Op::Plus,
            Op::PushConstant(Value::Num(3)),
            Op::Times,
            Op::EndProg,
        ]
    );
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(
        ops("1 or 2 and 3"),
        vec![
            Op::PushConstant(Value::Num(1)),
            Op::PushConstant(Value::Num(2)),
            Op::PushConstant(Value::Num(3)),
            Op::And,
            Op::Or,
            Op::EndProg,
        ]
    );
}

#[test]
fn unary_minus_emitted_before_not() {
    assert_eq!(
        ops("! -1"),
        vec![
            Op::PushConstant(Value::Num(1)),
            Op::UnaryMinus,
            Op::Not,
            Op::EndProg,
        ]
    );
}

#[test]
fn function_call_pushes_arity_last() {
    assert_eq!(
        ops("strlen('ab')"),
        vec![
            Op::PushConstant(Value::Str("ab".into())),
            Op::PushConstant(Value::Num(1)),
            Op::FuncCall("strlen".into()),
            Op::EndProg,
        ]
    );
}

#[test]
fn expression_may_end_at_then() {
    let prog = compile("$msg contains 'x' then").unwrap();
    assert_eq!(prog.ops().last(), Some(&Op::EndProg));
}

#[test]
fn trailing_input_is_rejected() {
    assert!(matches!(compile("1 2"), Err(ParseError::TrailingInput(_))));
}

#[test]
fn unbalanced_paren_is_rejected() {
    assert!(matches!(compile("(1 + 2"), Err(ParseError::UnexpectedToken(_))));
}

#[test]
fn unknown_function_is_rejected_at_compile_time() {
    assert!(matches!(
        compile("frobnicate(1)"),
        Err(ParseError::UnknownFunction(_))
    ));
}

#[test]
fn unknown_property_is_rejected_at_compile_time() {
    assert!(matches!(compile("$nosuchprop == 1"), Err(ParseError::BadProperty(_))));
}

#[test]
fn unknown_sysvar_is_rejected_at_compile_time() {
    assert!(matches!(compile("$$uptime == 1"), Err(ParseError::UnknownSysVar(_))));
}

#[test]
fn empty_expression_is_rejected() {
    assert!(matches!(compile(""), Err(ParseError::UnexpectedEof)));
}

#[test]
fn cmp_is_non_associative() {
    // a == b == c does not parse: the second == is trailing input
    assert!(compile("1 == 2 == 3").is_err());
}
