//! Property-style checks over the type lattice, the evaluator, and the
//! expression printer.

use wdlfront::env::Bindings;
use wdlfront::parser::Version;
use wdlfront::stdlib::StdLib;
use wdlfront::types::{unify_types, Type};
use wdlfront::value::Value;

fn sample_types() -> Vec<Type> {
    vec![
        Type::boolean(false),
        Type::int(false),
        Type::float(false),
        Type::string(false),
        Type::file(false),
        Type::directory(false),
        Type::int(true),
        Type::array(Type::int(false), false, false),
        Type::array(Type::int(false), false, true),
        Type::array(Type::string(false), false, false),
        Type::map(Type::string(false), Type::int(false), false),
        Type::pair(Type::int(false), Type::float(false), false),
        Type::any(),
        Type::none(),
    ]
}

#[test]
fn coercion_is_reflexive() {
    for ty in sample_types() {
        assert!(ty.coerces(&ty, true), "{} does not coerce to itself", ty);
    }
}

#[test]
fn coercion_is_transitive() {
    // Over the proper lattice: Any short-circuits both directions, and the
    // questionable String -> File/Directory edge is deliberately not
    // closed under composition (Int -> String does not grant Int -> File).
    let excluded = |ty: &Type| {
        matches!(
            ty,
            Type::Any { .. } | Type::File { .. } | Type::Directory { .. }
        )
    };
    let types: Vec<Type> = sample_types().into_iter().filter(|t| !excluded(t)).collect();
    for a in &types {
        for b in &types {
            for c in &types {
                if a.coerces(b, true) && b.coerces(c, true) {
                    assert!(
                        a.coerces(c, true),
                        "transitivity broken: {} -> {} -> {} but not {} -> {}",
                        a,
                        b,
                        c,
                        a,
                        c
                    );
                }
            }
        }
    }
}

#[test]
fn unify_is_symmetric() {
    let types = sample_types();
    for a in &types {
        for b in &types {
            let ab = unify_types(vec![a, b], true, false);
            let ba = unify_types(vec![b, a], true, false);
            assert_eq!(ab, ba, "unify({}, {}) differs from unify({}, {})", a, b, b, a);
        }
    }
}

#[test]
fn unified_type_is_upper_bound() {
    let types = sample_types();
    for a in &types {
        for b in &types {
            let unified = unify_types(vec![a, b], true, false);
            if matches!(unified, Type::Any { .. }) {
                continue;
            }
            assert!(
                a.coerces(&unified, true) && b.coerces(&unified, true),
                "unify({}, {}) = {} is not an upper bound",
                a,
                b,
                unified
            );
        }
    }
}

fn eval_expression(source: &str) -> Value {
    let mut stream = wdlfront::parser::token_stream::TokenStream::new(
        source,
        "prop.wdl",
        "/prop.wdl",
        Version::V1_0,
    );
    let cst = wdlfront::parser::expressions::parse_expression(&mut stream).unwrap();
    let mut expr = wdlfront::tree::lower::lower_expr(cst, Version::V1_0).unwrap();
    let stdlib = StdLib::new(Version::V1_0);
    expr.infer_type(&Bindings::new(), &stdlib, &Default::default())
        .unwrap();
    expr.eval(&Bindings::new(), &stdlib).unwrap()
}

#[test]
fn pure_evaluation_is_deterministic() {
    let expressions = [
        "1 + 2 * 3",
        "[1, 2, 3][2] % 2",
        "if 3 > 2 then \"yes\" else \"no\"",
        "length(flatten([[1], [2, 3]]))",
        "select_first([None, 41]) + 1",
        "\"n=~{1 + 1}\"",
        "(zip([1, 2], [\"a\", \"b\"]))[1].right",
    ];
    for source in expressions {
        let first = eval_expression(source);
        let second = eval_expression(source);
        assert!(
            first.equals(&second).unwrap(),
            "{} evaluated differently",
            source
        );
    }
}

#[test]
fn expression_display_round_trips() {
    // Printing a typed expression and re-parsing it reproduces the same
    // inferred type and value.
    let expressions = [
        "1 + 2 * 3",
        "if true then 1 else 2",
        "[1, 2, 3][0]",
        "length([\"a\", \"b\"])",
        "(1, \"x\").left",
        "!false",
    ];
    for source in expressions {
        let mut stream = wdlfront::parser::token_stream::TokenStream::new(
            source,
            "prop.wdl",
            "/prop.wdl",
            Version::V1_0,
        );
        let cst = wdlfront::parser::expressions::parse_expression(&mut stream).unwrap();
        let mut expr = wdlfront::tree::lower::lower_expr(cst, Version::V1_0).unwrap();
        let stdlib = StdLib::new(Version::V1_0);
        let ty = expr
            .infer_type(&Bindings::new(), &stdlib, &Default::default())
            .unwrap();
        let printed = expr.to_string();

        let reparsed_value = eval_expression(&printed);
        let original_value = eval_expression(source);
        assert!(
            reparsed_value.equals(&original_value).unwrap(),
            "{} -> {} changed value",
            source,
            printed
        );

        let mut stream = wdlfront::parser::token_stream::TokenStream::new(
            &printed,
            "prop.wdl",
            "/prop.wdl",
            Version::V1_0,
        );
        let cst = wdlfront::parser::expressions::parse_expression(&mut stream).unwrap();
        let mut reparsed = wdlfront::tree::lower::lower_expr(cst, Version::V1_0).unwrap();
        let ty2 = reparsed
            .infer_type(&Bindings::new(), &stdlib, &Default::default())
            .unwrap();
        assert_eq!(ty, ty2, "{} -> {} changed type", source, printed);
    }
}

#[test]
fn map_equality_is_order_independent() {
    let forward = Value::map(
        Type::string(false),
        Type::int(false),
        vec![
            (Value::string("x".to_string()), Value::int(1)),
            (Value::string("y".to_string()), Value::int(2)),
        ],
    );
    let backward = Value::map(
        Type::string(false),
        Type::int(false),
        vec![
            (Value::string("y".to_string()), Value::int(2)),
            (Value::string("x".to_string()), Value::int(1)),
        ],
    );
    assert!(forward.equals(&backward).unwrap());
    assert!(backward.equals(&forward).unwrap());
}
