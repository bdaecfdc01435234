//! Pipeline-wide properties: template memoization, jump-table dispatch,
//! enum payload round trips, macro hygiene and typing idempotence.

use gi_ir::ast::{Expr, Item, MatchCase, Pattern, Stmt, TypeExpr, Variant};
use gi_ir::{Binding, Expr as IrExpr, FuncId, Module};
use gic::CompileOptions;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use wasmtime::Val;

use crate::common::{
    analyze, export, function, instantiate, macro_item, option_enum, source, ty, validate,
    Interpreter, Value,
};

fn func(module: &Module, name: &str) -> FuncId {
    match module.scopes[module.root].value(name) {
        Some(Binding::Func(func)) => *func,
        other => panic!("`{name}` is not a single function: {other:?}"),
    }
}

fn param_type(module: &Module, name: &str) -> gi_ir::TypeId {
    let def = &module.funcs[func(module, name)];
    module.vars[def.params[0]].ty
}

#[test]
fn template_instances_are_memoized() {
    let boxed = |arg: &str| TypeExpr::apply("Box", vec![ty(arg)]);
    let module = analyze(vec![
        Item::template("Box", &["T"], Some(TypeExpr::tuple(vec![ty("T")]))),
        function("a", &[("b", boxed("i32"))], None, vec![]),
        function("b", &[("b", boxed("i32"))], None, vec![]),
        function("c", &[("b", boxed("bool"))], None, vec![]),
    ])
    .unwrap();
    assert_eq!(param_type(&module, "a"), param_type(&module, "b"));
    assert_ne!(param_type(&module, "a"), param_type(&module, "c"));

    let text = gi_wasm::emit(&module, gic::PrintConfig::default()).unwrap();
    validate(&text);
    assert_eq!(text.matches("(type $Box<i32> ").count(), 1, "{text}");
}

/// `enum E: V0(i32), ..., V{k-1}(i32)`, a `make{i}` constructor per
/// variant and `pick(e)`, which returns the payload plus the variant index.
fn dispatch_program(k: usize) -> Vec<Item> {
    let name = |i: usize| format!("V{i}");
    let mut items = vec![Item::enum_def(
        "E",
        (0..k).map(|i| Variant::new(name(i), vec![ty("i32")])).collect(),
    )];
    for i in 0..k {
        items.push(function(
            &format!("make{i}"),
            &[("x", ty("i32"))],
            Some(ty("E")),
            vec![Stmt::ret(Expr::call(
                Expr::attr(Expr::ident("E"), name(i)),
                vec![Expr::ident("x")],
            ))],
        ));
    }
    let cases = (0..k)
        .map(|i| {
            MatchCase::new(
                Pattern::variant(name(i), &[Some("y")]),
                vec![Stmt::ret(Expr::binary(
                    "+",
                    Expr::ident("y"),
                    Expr::int(i64::try_from(i).unwrap()),
                ))],
            )
        })
        .collect();
    items.push(function(
        "pick",
        &[("e", ty("E"))],
        Some(ty("i32")),
        vec![Stmt::match_(Expr::ident("e"), cases)],
    ));
    items
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn jump_table_selects_constructed_variant(k in 1usize..8, x in -1000i64..1000) {
        let module = analyze(dispatch_program(k)).unwrap();

        let flat = gi_wasm::generate(&module).unwrap().to_string();
        let start = flat.find("(br_table").unwrap();
        let table = &flat[start..];
        let table = &table[..table.find(" (i32.rem_u").unwrap()];
        // One entry per variant plus the default.
        prop_assert_eq!(table.split(' ').count() - 1, k + 1);

        let interp = Interpreter::new(&module);
        for i in 0..k {
            let value = interp.call(&format!("make{i}"), vec![Value::Int(x)]);
            prop_assert_eq!(value.field(0), Value::Int(i64::try_from(i).unwrap()));
        }

        let mut program = dispatch_program(k);
        program.extend((0..k).map(|i| export(&format!("make{i}"))));
        program.push(export("pick"));
        let mut wasm = instantiate(program);
        let x = i32::try_from(x).unwrap();
        for i in 0..k {
            let value = wasm.call(&format!("make{i}"), &[Val::I32(x)]);
            let picked = wasm.call("pick", &[value]).unwrap_i32();
            prop_assert_eq!(picked, x + i32::try_from(i).unwrap());
        }
    }

    #[test]
    fn payload_fields_round_trip_in_order(a in -100i64..100, b in -100i64..100, c in -100i64..100) {
        // enum Shape: Triple(i32, i32, i32), Empty
        // fn digits(a, b, c) -> i32:
        //     match Shape.Triple(a, b, c): case Triple(p, q, r): return p * 100 + q * 10 + r
        let items = vec![
            Item::enum_def(
                "Shape",
                vec![
                    Variant::new("Triple", vec![ty("i32"), ty("i32"), ty("i32")]),
                    Variant::new("Empty", vec![]),
                ],
            ),
            function(
                "digits",
                &[("a", ty("i32")), ("b", ty("i32")), ("c", ty("i32"))],
                Some(ty("i32")),
                vec![Stmt::match_(
                    Expr::call(
                        Expr::attr(Expr::ident("Shape"), "Triple"),
                        vec![Expr::ident("a"), Expr::ident("b"), Expr::ident("c")],
                    ),
                    vec![
                        MatchCase::new(
                            Pattern::variant("Triple", &[Some("p"), Some("q"), Some("r")]),
                            vec![Stmt::ret(Expr::binary(
                                "+",
                                Expr::binary(
                                    "+",
                                    Expr::binary("*", Expr::ident("p"), Expr::int(100)),
                                    Expr::binary("*", Expr::ident("q"), Expr::int(10)),
                                ),
                                Expr::ident("r"),
                            ))],
                        ),
                        MatchCase::new(Pattern::Wildcard, vec![Stmt::ret(Expr::int(0))]),
                    ],
                )],
            ),
        ];
        let module = analyze(items.clone()).unwrap();
        let result = Interpreter::new(&module)
            .call("digits", vec![Value::Int(a), Value::Int(b), Value::Int(c)]);
        prop_assert_eq!(result, Value::Int(a * 100 + b * 10 + c));

        let mut program = items;
        program.push(export("digits"));
        let args = [a, b, c].map(|v| i32::try_from(v).unwrap());
        let result = instantiate(program).call_i32("digits", &args);
        prop_assert_eq!(i64::from(result), a * 100 + b * 10 + c);
    }

    #[test]
    fn inlined_macro_locals_stay_apart(a in -1000i64..1000, b in -1000i64..1000) {
        // macro sq(x: i32) -> i32: let t: i32 = x * x; return t
        // fn sum_sq(a, b) -> i32: return sq(a) + sq(b)
        let items = vec![
            macro_item(
                "sq",
                &[("x", ty("i32"))],
                Some(ty("i32")),
                vec![
                    Stmt::let_(
                        "t",
                        Some(ty("i32")),
                        Some(Expr::binary("*", Expr::ident("x"), Expr::ident("x"))),
                    ),
                    Stmt::ret(Expr::ident("t")),
                ],
            ),
            function(
                "sum_sq",
                &[("a", ty("i32")), ("b", ty("i32"))],
                Some(ty("i32")),
                vec![Stmt::ret(Expr::binary(
                    "+",
                    Expr::call(Expr::ident("sq"), vec![Expr::ident("a")]),
                    Expr::call(Expr::ident("sq"), vec![Expr::ident("b")]),
                ))],
            ),
        ];
        let module = analyze(items.clone()).unwrap();

        let def = &module.funcs[func(&module, "sum_sq")];
        let mut names: Vec<&str> = def
            .params
            .iter()
            .chain(&def.locals)
            .map(|&var| module.vars[var].local_name.as_str())
            .collect();
        let temporaries = names.iter().filter(|name| name.contains("sq.t")).count();
        prop_assert_eq!(temporaries, 2);
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), total);

        let result = Interpreter::new(&module)
            .call("sum_sq", vec![Value::Int(a), Value::Int(b)]);
        prop_assert_eq!(result, Value::Int(a * a + b * b));

        let mut program = items;
        program.push(export("sum_sq"));
        let args = [a, b].map(|v| i32::try_from(v).unwrap());
        let result = instantiate(program).call_i32("sum_sq", &args);
        prop_assert_eq!(i64::from(result), a * a + b * b);
    }
}

#[test]
fn typing_twice_changes_nothing() {
    let boxed = TypeExpr::apply("Box", vec![ty("i32")]);
    let items = vec![
        option_enum(),
        Item::template("Box", &["T"], Some(TypeExpr::tuple(vec![ty("T")]))),
        function(
            "f",
            &[("b", boxed), ("o", ty("Option"))],
            Some(ty("i32")),
            vec![
                Stmt::let_("n", None, Some(Expr::attr(Expr::ident("b"), "0"))),
                Stmt::match_(
                    Expr::ident("o"),
                    vec![
                        MatchCase::new(
                            Pattern::variant("Some", &[Some("x")]),
                            vec![Stmt::ret(Expr::binary("+", Expr::ident("x"), Expr::ident("n")))],
                        ),
                        MatchCase::new(Pattern::Wildcard, vec![Stmt::ret(Expr::ident("n"))]),
                    ],
                ),
            ],
        ),
    ];
    let options = CompileOptions::default();
    let once = gic::analyze_until(&source(items), &options, Some("propagate_types")).unwrap();
    let bodies = |module: &Module| -> Vec<Vec<IrExpr>> {
        module
            .funcs
            .iter()
            .filter_map(|(_, def)| def.lowered_body().map(<[IrExpr]>::to_vec))
            .collect()
    };
    let before = bodies(&once);
    let type_count = once.types.len();

    let twice = gi_sema::propagate_types(once, &options).unwrap();
    assert_eq!(bodies(&twice), before);
    assert_eq!(twice.types.len(), type_count);
}
