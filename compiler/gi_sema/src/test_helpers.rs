//! Shared test utilities for the semantic passes.
//!
//! Builds source modules through the syntax-tree builders on top of a small
//! prelude (native scalars and operator macros written in inline assembly)
//! and looks declarations up by name in the analyzed result. Only compiled
//! in test builds.

use gi_diagnostic::Result;
use gi_ir::ast::{self, AsmTerm, FunctionDecl, Item, Param, Stmt, TypeExpr};
use gi_ir::{Binding, Expr, FuncId, Module, TypeBinding, TypeId};

use crate::CompileOptions;

/// `i32`, `i64`, `bool` and `bytes`, plus `+ - * == < !=` on `i32` and
/// unary `-`.
pub(crate) fn prelude() -> Vec<Item> {
    let mut items = vec![
        Item::type_def("i32", Some(TypeExpr::native("i32"))),
        Item::type_def("i64", Some(TypeExpr::native("i64"))),
        Item::type_def("bool", Some(TypeExpr::native("i32"))),
        Item::type_def(
            "bytes",
            Some(TypeExpr::native_array(TypeExpr::native_packed(
                "i32", "i8", false,
            ))),
        ),
    ];
    for (op, instr, ret) in [
        ("+", "i32.add", "i32"),
        ("-", "i32.sub", "i32"),
        ("*", "i32.mul", "i32"),
        ("==", "i32.eq", "bool"),
        ("!=", "i32.ne", "bool"),
        ("<", "i32.lt_s", "bool"),
    ] {
        items.push(binary_op(op, instr, ret));
    }
    items.push(Item::macro_def(FunctionDecl::new(
        "-",
        vec![Param::new("a", ty("i32"))],
        Some(ty("i32")),
        vec![Stmt::ret(ast::Expr::asm(vec![AsmTerm::list(vec![
            AsmTerm::atom("i32.sub"),
            AsmTerm::list(vec![AsmTerm::atom("i32.const"), AsmTerm::Int(0)]),
            AsmTerm::Expr(ast::Expr::ident("a")),
        ])]))],
    )));
    items
}

/// `macro op(a: i32, b: i32) -> ret: return asm (instr {a} {b})`
pub(crate) fn binary_op(op: &str, instr: &str, ret: &str) -> Item {
    Item::macro_def(FunctionDecl::new(
        op,
        vec![Param::new("a", ty("i32")), Param::new("b", ty("i32"))],
        Some(ty(ret)),
        vec![Stmt::ret(ast::Expr::asm(vec![AsmTerm::instr(
            instr,
            vec![ast::Expr::ident("a"), ast::Expr::ident("b")],
        )]))],
    ))
}

/// Shorthand for a named type expression.
pub(crate) fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

/// A function item with typed parameters.
pub(crate) fn function(
    name: &str,
    params: &[(&str, TypeExpr)],
    ret: Option<TypeExpr>,
    body: Vec<Stmt>,
) -> Item {
    Item::function(FunctionDecl::new(name, params_of(params), ret, body))
}

/// A macro item with typed parameters.
pub(crate) fn macro_item(
    name: &str,
    params: &[(&str, TypeExpr)],
    ret: Option<TypeExpr>,
    body: Vec<Stmt>,
) -> Item {
    Item::macro_def(FunctionDecl::new(name, params_of(params), ret, body))
}

fn params_of(params: &[(&str, TypeExpr)]) -> Vec<Param> {
    params
        .iter()
        .map(|(name, ty)| Param::new(*name, ty.clone()))
        .collect()
}

/// The prelude followed by `items`.
pub(crate) fn source(items: Vec<Item>) -> ast::Module {
    let mut all = prelude();
    all.extend(items);
    ast::Module { items: all }
}

/// Run the whole pipeline over the prelude and `items`.
pub(crate) fn analyze(items: Vec<Item>) -> Result<Module> {
    crate::analyze(&source(items), &CompileOptions::default())
}

/// Run the pipeline up to and including the pass named `last`.
pub(crate) fn analyze_until(items: Vec<Item>, last: &str) -> Result<Module> {
    crate::analyze_until(&source(items), &CompileOptions::default(), Some(last))
}

/// The root-scope function named `name`. Panics if there is none, or if
/// the name is overloaded.
pub(crate) fn func(module: &Module, name: &str) -> FuncId {
    match module.scopes[module.root].value(name) {
        Some(Binding::Func(func)) => *func,
        other => panic!("`{name}` is not a single function: {other:?}"),
    }
}

/// The lowered body of the root-scope function `name`.
pub(crate) fn body<'m>(module: &'m Module, name: &str) -> &'m [Expr] {
    module.funcs[func(module, name)]
        .lowered_body()
        .unwrap_or_else(|| panic!("`{name}` has no lowered body"))
}

/// The root-scope type named `name`.
pub(crate) fn type_named(module: &Module, name: &str) -> TypeId {
    match module.scopes[module.root].type_(name) {
        Some(TypeBinding::Type(ty)) => ty,
        other => panic!("`{name}` is not a type: {other:?}"),
    }
}

/// `enum Option: Some(i32), None`
pub(crate) fn option_enum() -> Item {
    Item::enum_def(
        "Option",
        vec![
            ast::Variant::new("Some", vec![ty("i32")]),
            ast::Variant::new("None", vec![]),
        ],
    )
}

/// `Option.<variant>` in value position.
pub(crate) fn variant(name: &str) -> ast::Expr {
    ast::Expr::attr(ast::Expr::ident("Option"), name)
}
