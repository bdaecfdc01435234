//! Small whole programs.

use gi_ir::ast::{AsmTerm, Expr, Item, MatchCase, Pattern, Stmt, TypeExpr};
use gic::CompileError;
use pretty_assertions::assert_eq;

use crate::common::{
    analyze, compile, export, function, instantiate, macro_item, option, option_enum, ty,
    type_decls, Interpreter, Value,
};

fn pair_type() -> Item {
    Item::type_def("Pair", Some(TypeExpr::tuple(vec![ty("i32"), ty("i32")])))
}

#[test]
fn tuple_field_read() {
    let items = || {
        vec![
            pair_type(),
            function(
                "first",
                &[],
                Some(ty("i32")),
                vec![Stmt::ret(Expr::attr(
                    Expr::call(Expr::ident("Pair"), vec![Expr::int(1), Expr::int(2)]),
                    "0",
                ))],
            ),
        ]
    };

    let module = analyze(items()).unwrap();
    assert_eq!(Interpreter::new(&module).call("first", vec![]), Value::Int(1));

    let text = compile(items()).unwrap();
    assert!(
        text.contains("(struct.get $Pair 0 (struct.new $Pair (i32.const 1) (i32.const 2)))"),
        "{text}"
    );

    let mut program = items();
    program.push(export("first"));
    assert_eq!(instantiate(program).call_i32("first", &[]), 1);
}

fn unwrap_cases(scrutinee: Expr) -> Stmt {
    Stmt::match_(
        scrutinee,
        vec![
            MatchCase::new(
                Pattern::variant("Some", &[Some("x")]),
                vec![Stmt::ret(Expr::ident("x"))],
            ),
            MatchCase::new(Pattern::variant("None", &[]), vec![Stmt::ret(Expr::int(0))]),
        ],
    )
}

#[test]
fn enum_match_through_jump_table() {
    let items = || {
        vec![
            option_enum(),
            function(
                "three",
                &[],
                Some(ty("i32")),
                vec![unwrap_cases(option("Some", vec![Expr::int(3)]))],
            ),
            function(
                "unwrap",
                &[("o", ty("Option"))],
                Some(ty("i32")),
                vec![unwrap_cases(Expr::ident("o"))],
            ),
            function(
                "some",
                &[("x", ty("i32"))],
                Some(ty("Option")),
                vec![Stmt::ret(option("Some", vec![Expr::ident("x")]))],
            ),
            function(
                "none",
                &[],
                Some(ty("Option")),
                vec![Stmt::ret(Expr::attr(Expr::ident("Option"), "None"))],
            ),
        ]
    };

    let text = compile(items()).unwrap();
    assert!(text.contains("br_table"), "{text}");
    assert!(text.contains("(i32.const 2)"), "{text}");

    let mut program = items();
    program.extend(["three", "unwrap", "some", "none"].map(export));
    let mut wasm = instantiate(program);
    assert_eq!(wasm.call_i32("three", &[]), 3);
    // Discriminant 0 is `Some`, 1 is `None`.
    let some = wasm.call("some", &[wasmtime::Val::I32(3)]);
    assert_eq!(wasm.call("unwrap", &[some]).unwrap_i32(), 3);
    let none = wasm.call("none", &[]);
    assert_eq!(wasm.call("unwrap", &[none]).unwrap_i32(), 0);

    let module = analyze(items()).unwrap();
    let discriminant = |name: &str, args| Interpreter::new(&module).call(name, args).field(0);
    assert_eq!(discriminant("some", vec![Value::Int(3)]), Value::Int(0));
    assert_eq!(discriminant("none", vec![]), Value::Int(1));
}

#[test]
fn template_instances_share_declarations() {
    let boxed = |arg: &str| TypeExpr::apply("Box", vec![ty(arg)]);
    let read = |name: &str, arg: &str| {
        function(
            name,
            &[("b", boxed(arg))],
            Some(ty(arg)),
            vec![Stmt::ret(Expr::attr(Expr::ident("b"), "0"))],
        )
    };
    let text = compile(vec![
        Item::template("Box", &["T"], Some(TypeExpr::tuple(vec![ty("T")]))),
        read("a", "i32"),
        read("b", "i32"),
        read("c", "bool"),
    ])
    .unwrap();

    let mut boxes: Vec<&str> = type_decls(&text)
        .into_iter()
        .filter(|decl| decl.starts_with("(type $Box<"))
        .collect();
    boxes.sort_unstable();
    assert_eq!(
        boxes,
        vec![
            "(type $Box<bool> (struct (field (mut i32))))",
            "(type $Box<i32> (struct (field (mut i32))))",
        ]
    );
}

#[test]
fn undeclared_method_names_receiver_and_member() {
    let err = analyze(vec![
        pair_type(),
        function(
            "poke",
            &[("p", ty("Pair"))],
            None,
            vec![Stmt::expr(Expr::method(Expr::ident("p"), "frobnicate", vec![]))],
        ),
    ])
    .unwrap_err();

    let CompileError::UnimplementedMember { ty, member, .. } = &err else {
        panic!("expected an unimplemented member, got {err:?}");
    };
    assert!(ty.contains("Pair"), "{ty}");
    assert_eq!(member, "frobnicate");
    assert_eq!(err.code().to_string(), "E2002");
}

#[test]
fn loops_and_locals_run() {
    // let total = 0; let i = 0; while i < n: total = total + i; i = i + 1
    let module = analyze(vec![function(
        "triangle",
        &[("n", ty("i32"))],
        Some(ty("i32")),
        vec![
            Stmt::let_("total", Some(ty("i32")), Some(Expr::int(0))),
            Stmt::let_("i", Some(ty("i32")), Some(Expr::int(0))),
            Stmt::while_loop(
                Expr::binary("<", Expr::ident("i"), Expr::ident("n")),
                vec![
                    Stmt::assign(
                        Expr::ident("total"),
                        Expr::binary("+", Expr::ident("total"), Expr::ident("i")),
                    ),
                    Stmt::assign(
                        Expr::ident("i"),
                        Expr::binary("+", Expr::ident("i"), Expr::int(1)),
                    ),
                ],
            ),
            Stmt::ret(Expr::ident("total")),
        ],
    )])
    .unwrap();
    let interp = Interpreter::new(&module);
    assert_eq!(interp.call("triangle", vec![Value::Int(5)]), Value::Int(10));
    assert_eq!(interp.call("triangle", vec![Value::Int(0)]), Value::Int(0));
}

#[test]
fn integer_match_with_fallback() {
    let module = analyze(vec![function(
        "name_len",
        &[("n", ty("i32"))],
        Some(ty("i32")),
        vec![Stmt::match_(
            Expr::ident("n"),
            vec![
                MatchCase::new(Pattern::value(Expr::int(1)), vec![Stmt::ret(Expr::int(3))]),
                MatchCase::new(Pattern::value(Expr::int(2)), vec![Stmt::ret(Expr::int(3))]),
                MatchCase::new(Pattern::value(Expr::int(3)), vec![Stmt::ret(Expr::int(5))]),
                MatchCase::new(Pattern::Wildcard, vec![Stmt::ret(Expr::int(0))]),
            ],
        )],
    )])
    .unwrap();
    let interp = Interpreter::new(&module);
    let run = |n| interp.call("name_len", vec![Value::Int(n)]).int();
    assert_eq!([run(1), run(2), run(3), run(4)], [3, 3, 5, 0]);
}

#[test]
fn case_values_computed_by_macros() {
    // macro clz(a: i32) -> i32: return asm (i32.clz {a})
    // fn classify(n: i32) -> i32: match n: case clz(16): return 1; case _: return 0
    let mut wasm = instantiate(vec![
        macro_item(
            "clz",
            &[("a", ty("i32"))],
            Some(ty("i32")),
            vec![Stmt::ret(Expr::asm(vec![AsmTerm::instr(
                "i32.clz",
                vec![Expr::ident("a")],
            )]))],
        ),
        function(
            "classify",
            &[("n", ty("i32"))],
            Some(ty("i32")),
            vec![Stmt::match_(
                Expr::ident("n"),
                vec![
                    MatchCase::new(
                        Pattern::value(Expr::call(Expr::ident("clz"), vec![Expr::int(16)])),
                        vec![Stmt::ret(Expr::int(1))],
                    ),
                    MatchCase::new(Pattern::Wildcard, vec![Stmt::ret(Expr::int(0))]),
                ],
            )],
        ),
        export("classify"),
    ]);
    assert_eq!(wasm.call_i32("classify", &[27]), 1);
    assert_eq!(wasm.call_i32("classify", &[16]), 0);
}
