//! `CompileOptions` seen from the outside.

use gi_ir::ast::{Expr, Item, Stmt};
use gic::{CompileError, CompileOptions, ErrorCode, OverloadPolicy};
use pretty_assertions::assert_eq;

use crate::common::{export, function, source, ty, validate, Interpreter, Value, Wasm};

/// Two `pick(i32)` overloads returning 1 and 2, and a caller.
fn twin_overloads() -> Vec<Item> {
    vec![
        function("pick", &[("a", ty("i32"))], Some(ty("i32")), vec![Stmt::ret(Expr::int(1))]),
        function("pick", &[("b", ty("i32"))], Some(ty("i32")), vec![Stmt::ret(Expr::int(2))]),
        function(
            "caller",
            &[],
            Some(ty("i32")),
            vec![Stmt::ret(Expr::call(Expr::ident("pick"), vec![Expr::int(0)]))],
        ),
    ]
}

#[test]
fn strict_overloads_reject_ties() {
    let err = gic::compile(&source(twin_overloads()), &CompileOptions::default()).unwrap_err();
    assert!(
        matches!(err, CompileError::AmbiguousReference { ref name, .. } if name == "pick"),
        "{err:?}"
    );
    assert_eq!(err.code(), ErrorCode::E1002);
}

#[test]
fn first_declared_overload_wins() {
    let options = CompileOptions::default().with_overload_policy(OverloadPolicy::FirstDeclared);
    let module = gic::analyze(&source(twin_overloads()), &options).unwrap();
    assert_eq!(Interpreter::new(&module).call("caller", vec![]), Value::Int(1));

    let mut items = twin_overloads();
    items.push(export("caller"));
    let text = gic::compile(&source(items), &options).unwrap();
    assert_eq!(Wasm::new(&text).call_i32("caller", &[]), 1);
}

#[test]
fn default_integer_type_is_configurable() {
    let items = || {
        vec![function(
            "wide",
            &[],
            None,
            vec![Stmt::let_("x", None, Some(Expr::int(5)))],
        )]
    };
    let options = CompileOptions::default().with_default_int_type("i64");
    let text = gic::compile(&source(items()), &options).unwrap();
    validate(&text);
    assert!(text.contains("(local $x i64)"), "{text}");
    assert!(text.contains("(local.set $x (i64.const 5))"), "{text}");

    let text = gic::compile(&source(items()), &CompileOptions::default()).unwrap();
    assert!(text.contains("(local $x i32)"), "{text}");
}

#[test]
fn line_width_controls_layout() {
    let items = || {
        vec![function(
            "add3",
            &[("a", ty("i32")), ("b", ty("i32")), ("c", ty("i32"))],
            Some(ty("i32")),
            vec![Stmt::ret(Expr::binary(
                "+",
                Expr::binary("+", Expr::ident("a"), Expr::ident("b")),
                Expr::ident("c"),
            ))],
        )]
    };
    let compile_at = |width| {
        gic::compile(
            &source(items()),
            &CompileOptions::default().with_max_line_width(width),
        )
        .unwrap()
    };
    let wide = compile_at(1000);
    let narrow = compile_at(30);
    assert_eq!(validate(&wide), validate(&narrow));
    assert!(narrow.lines().count() > wide.lines().count());
    assert!(
        wide.lines()
            .any(|line| line.trim().starts_with("(func $add3 ") && line.ends_with(')')),
        "{wide}"
    );
}

#[test]
fn tracing_setup_is_repeatable() {
    gic::init_tracing();
    gic::init_tracing();
}
