#![allow(clippy::unwrap_used)]

use gi_diagnostic::CompileError;
use gi_ir::ast::{self, Expr as Ast, Item, MatchCase, Pattern, Stmt};
use gi_ir::{ExprKind, MatchEnum, MatchInt, Module, TypeKind};
use pretty_assertions::assert_eq;

use crate::test_helpers::{analyze_until, body, func, function, option_enum, ty, type_named};

fn specialized(items: Vec<Item>) -> Module {
    analyze_until(items, "specialize_matches").unwrap()
}

fn case(pattern: Pattern, value: i64) -> MatchCase {
    MatchCase::new(pattern, vec![Stmt::ret(Ast::int(value))])
}

fn enum_match(module: &Module, name: &str) -> MatchEnum {
    match &body(module, name)[0].kind {
        ExprKind::MatchEnum(m) => m.clone(),
        other => panic!("expected a jump table, got {other:?}"),
    }
}

fn int_match(module: &Module, name: &str) -> MatchInt {
    match &body(module, name)[0].kind {
        ExprKind::MatchInt(m) => m.clone(),
        other => panic!("expected an equality cascade, got {other:?}"),
    }
}

fn color() -> Item {
    Item::enum_def(
        "Color",
        vec![
            ast::Variant::new("Red", vec![]),
            ast::Variant::new("Green", vec![]),
            ast::Variant::new("Blue", vec![]),
        ],
    )
}

#[test]
fn enum_match_builds_one_entry_per_variant() {
    let module = specialized(vec![
        option_enum(),
        function(
            "f",
            &[("o", ty("Option"))],
            Some(ty("i32")),
            vec![Stmt::match_(
                Ast::ident("o"),
                vec![
                    MatchCase::new(
                        Pattern::variant("Some", &[Some("x")]),
                        vec![Stmt::ret(Ast::ident("x"))],
                    ),
                    case(Pattern::variant("None", &[]), 0),
                ],
            )],
        ),
    ]);
    let m = enum_match(&module, "f");
    assert_eq!(m.table, vec![Some(0), Some(1)]);
    assert_eq!(m.enum_, type_named(&module, "Option"));

    let x = module.funcs[func(&module, "f")]
        .locals
        .iter()
        .copied()
        .find(|&var| module.vars[var].name == "x")
        .unwrap();
    assert_eq!(m.arms[0].bindings, vec![(x, 1)]);
    assert!(m.arms[1].bindings.is_empty());

    let tmp = &module.vars[m.tmp];
    assert_eq!(tmp.name, "__match");
    assert_eq!(tmp.ty, m.enum_);
    assert!(module.funcs[func(&module, "f")].locals.contains(&m.tmp));
    assert_ne!(m.label, m.default_label);
}

#[test]
fn wildcard_fills_uncovered_variants() {
    let module = specialized(vec![
        color(),
        function(
            "f",
            &[("c", ty("Color"))],
            Some(ty("i32")),
            vec![Stmt::match_(
                Ast::ident("c"),
                vec![
                    case(Pattern::variant("Green", &[]), 1),
                    case(Pattern::Wildcard, 0),
                ],
            )],
        ),
    ]);
    assert_eq!(enum_match(&module, "f").table, vec![Some(1), Some(0), Some(1)]);
}

#[test]
fn void_match_may_leave_variants_uncovered() {
    let module = specialized(vec![
        color(),
        function(
            "f",
            &[("c", ty("Color"))],
            None,
            vec![Stmt::match_(
                Ast::ident("c"),
                vec![MatchCase::new(Pattern::variant("Blue", &[]), vec![])],
            )],
        ),
    ]);
    assert_eq!(enum_match(&module, "f").table, vec![None, None, Some(0)]);
}

#[test]
fn value_match_must_cover_every_variant() {
    let err = analyze_until(
        vec![
            option_enum(),
            function(
                "f",
                &[("o", ty("Option"))],
                Some(ty("i32")),
                vec![Stmt::match_(
                    Ast::ident("o"),
                    vec![MatchCase::new(
                        Pattern::variant("Some", &[Some("x")]),
                        vec![Stmt::expr(Ast::ident("x"))],
                    )],
                )],
            ),
        ],
        "specialize_matches",
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::NonExhaustiveMatch {
            ty: "Option".to_string(),
            missing: "Option.None".to_string(),
            span: Some(gi_ir::Span::DUMMY),
        }
    );
}

#[test]
fn integer_match_evaluates_case_values() {
    let module = specialized(vec![
        Item::constant("TWO", None, Ast::int(2)),
        function(
            "f",
            &[("n", ty("i32"))],
            Some(ty("i32")),
            vec![Stmt::match_(
                Ast::ident("n"),
                vec![
                    case(Pattern::value(Ast::int(1)), 10),
                    case(Pattern::value(Ast::ident("TWO")), 20),
                    case(Pattern::value(Ast::binary("+", Ast::int(1), Ast::int(2))), 30),
                    case(Pattern::Wildcard, 0),
                    case(Pattern::Wildcard, 99),
                ],
            )],
        ),
    ]);
    let m = int_match(&module, "f");
    let values: Vec<i64> = m.arms.iter().map(|arm| arm.value).collect();
    assert_eq!(values, vec![1, 2, 3]);
    let fallback = m.fallback.unwrap();
    let ExprKind::Return(Some(value)) = &fallback[0].kind else {
        panic!("expected the first wildcard's body");
    };
    assert_eq!(value.kind, ExprKind::Int(0));
    assert_eq!(module.vars[m.tmp].ty, type_named(&module, "i32"));
}

#[test]
fn integer_value_match_needs_a_wildcard() {
    let err = analyze_until(
        vec![function(
            "f",
            &[("n", ty("i32"))],
            Some(ty("i32")),
            vec![Stmt::match_(
                Ast::ident("n"),
                vec![MatchCase::new(
                    Pattern::value(Ast::int(1)),
                    vec![Stmt::expr(Ast::int(5))],
                )],
            )],
        )],
        "specialize_matches",
    )
    .unwrap_err();
    assert!(
        matches!(err, CompileError::NonExhaustiveMatch { ref missing, .. } if missing == "values without a case"),
        "{err:?}"
    );
}

#[test]
fn value_pattern_on_enum_is_a_mismatch() {
    let err = analyze_until(
        vec![
            option_enum(),
            function(
                "f",
                &[("o", ty("Option"))],
                None,
                vec![Stmt::match_(
                    Ast::ident("o"),
                    vec![MatchCase::new(Pattern::value(Ast::int(0)), vec![])],
                )],
            ),
        ],
        "specialize_matches",
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err:?}");
}

#[test]
fn array_scrutinee_is_rejected() {
    let err = analyze_until(
        vec![function(
            "f",
            &[("s", ty("bytes"))],
            None,
            vec![Stmt::match_(
                Ast::ident("s"),
                vec![MatchCase::new(Pattern::Wildcard, vec![])],
            )],
        )],
        "specialize_matches",
    )
    .unwrap_err();
    assert!(
        matches!(err, CompileError::TypeMismatch { ref expected, .. } if expected == "an enum or integer scrutinee"),
        "{err:?}"
    );
}

#[test]
fn variant_scrutinee_dispatches_on_its_enum() {
    let module = specialized(vec![
        option_enum(),
        function(
            "f",
            &[],
            Some(ty("i32")),
            vec![Stmt::match_(
                Ast::call(Ast::attr(Ast::ident("Option"), "Some"), vec![Ast::int(3)]),
                vec![
                    MatchCase::new(
                        Pattern::variant("Some", &[Some("x")]),
                        vec![Stmt::ret(Ast::ident("x"))],
                    ),
                    case(Pattern::Wildcard, 0),
                ],
            )],
        ),
    ]);
    let m = enum_match(&module, "f");
    let option = type_named(&module, "Option");
    assert_eq!(m.enum_, option);
    assert!(matches!(module.kind(m.scrutinee.ty), TypeKind::EnumValue(_)));
}
