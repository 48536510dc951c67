#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Property-based tests for the compiler.
//!
//! Generated integer expressions must always compile to bytecode the
//! verifier accepts, and arbitrary text must never panic the compiler.

use devvm_compile::Compiler;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..200).prop_map(|n| n.to_string()),
        (0u32..=u32::MAX).prop_map(|n| n.to_string()),
        (0u32..0x1_0000).prop_map(|n| format!("${n:X}")),
        Just("true".to_owned()),
        Just("false".to_owned()),
        Just("g".to_owned()),
        Just("a".to_owned()),
        Just("b".to_owned()),
    ]
}

fn arb_binop() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("/"),
        Just("%"),
        Just("<<"),
        Just(">>"),
        Just("&"),
        Just("|"),
        Just("^"),
        Just("=="),
        Just("!="),
        Just("<"),
        Just("<="),
        Just(">"),
        Just(">="),
        Just("&&"),
        Just("||"),
    ]
}

fn arb_unop() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("-"), Just("~"), Just("!"), Just("+")]
}

/// Integer expressions; every operand is parenthesized so no two operator
/// characters ever touch.
fn arb_int_expr() -> impl Strategy<Value = String> {
    arb_leaf().prop_recursive(6, 48, 2, |inner| {
        prop_oneof![
            (inner.clone(), arb_binop(), inner.clone())
                .prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            (arb_unop(), inner).prop_map(|(op, e)| format!("{op}({e})")),
        ]
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Well-typed integer expressions compile and pass verification.
    #[test]
    fn int_expressions_compile(expr in arb_int_expr()) {
        let source = format!(
            "int g;\nfunction int f() {{ int a = 1; int b = {expr}; return {expr} + b; }}"
        );
        let mut c = Compiler::new();
        let result = c.compile_file(&source).and_then(|()| c.compile_deferred());
        prop_assert!(result.is_ok(), "{source}: {:?}", result);

        let body = c.domain().functions[0].body.as_ref().unwrap();
        prop_assert_eq!(body.local_slots, 2);
        prop_assert!(body.stack_slots >= 3);
    }

    /// Conditions and loops built from generated expressions stay balanced.
    #[test]
    fn control_flow_compiles(cond in arb_int_expr(), value in arb_int_expr()) {
        let source = format!(
            "int g;\nfunction void f() {{ \
                while ({cond}) {{ if ({value}) break; else g = {value}; }} \
                do g = g - 1; while (g && {cond}); \
                loop {{ if ({cond}) break; }} }}"
        );
        let mut c = Compiler::new();
        let result = c.compile_file(&source).and_then(|()| c.compile_deferred());
        prop_assert!(result.is_ok(), "{source}: {:?}", result);
    }

    /// Arbitrary text ends in success or a latched error, never a panic.
    #[test]
    fn arbitrary_input_does_not_panic(input in ".{0,120}") {
        let mut c = Compiler::new();
        let result = c.compile_file(&input).and_then(|()| c.compile_deferred());
        if let Err(err) = result {
            prop_assert_eq!(c.error(), Some(&err));
        }
    }

    /// Token soup built from the language's own vocabulary.
    #[test]
    fn token_soup_does_not_panic(tokens in prop::collection::vec(prop_oneof![
        Just("function"), Just("int"), Just("void"), Just("if"), Just("else"),
        Just("loop"), Just("while"), Just("do"), Just("break"), Just("return"),
        Just("event"), Just("option"), Just("f"), Just("x"), Just("\"s\""),
        Just("1"), Just("("), Just(")"), Just("{"), Just("}"), Just("["),
        Just("]"), Just(";"), Just(","), Just(":"), Just("."), Just("="),
        Just("+"), Just("!"), Just("debug"), Just("$x"),
    ], 0..60)) {
        let source = tokens.join(" ");
        let mut c = Compiler::new();
        let _ = c.compile_file(&source).and_then(|()| c.compile_deferred());
    }
}
