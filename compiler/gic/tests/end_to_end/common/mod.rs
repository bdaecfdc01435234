//! Shared utilities for the end-to-end tests.
//!
//! Source modules are built on a small prelude: native scalars, a byte
//! string type, and integer operators written as inline-assembly macros the
//! way a standard library would declare them.

mod interp;
mod wasm;

pub use interp::{Interpreter, Value};
pub use wasm::{validate, Wasm};

use gi_ir::ast::{self, AsmTerm, Expr, FunctionDecl, Item, Param, Stmt, TypeExpr, Variant};
use gic::{CompileError, CompileOptions, Module};

/// `i32`, `i64`, `bool`, `bytes` and `+ - * == != <` on `i32`.
pub fn prelude() -> Vec<Item> {
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
        items.push(Item::macro_def(FunctionDecl::new(
            op,
            vec![Param::new("a", ty("i32")), Param::new("b", ty("i32"))],
            Some(ty(ret)),
            vec![Stmt::ret(Expr::asm(vec![AsmTerm::instr(
                instr,
                vec![Expr::ident("a"), Expr::ident("b")],
            )]))],
        )));
    }
    items
}

pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

pub fn function(
    name: &str,
    params: &[(&str, TypeExpr)],
    ret: Option<TypeExpr>,
    body: Vec<Stmt>,
) -> Item {
    Item::function(FunctionDecl::new(name, params_of(params), ret, body))
}

pub fn macro_item(
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

/// `enum Option: Some(i32), None`
pub fn option_enum() -> Item {
    Item::enum_def(
        "Option",
        vec![
            Variant::new("Some", vec![ty("i32")]),
            Variant::new("None", vec![]),
        ],
    )
}

/// `Option.<variant>(args...)`
pub fn option(variant: &str, args: Vec<Expr>) -> Expr {
    Expr::call(Expr::attr(Expr::ident("Option"), variant), args)
}

pub fn source(items: Vec<Item>) -> ast::Module {
    let mut all = prelude();
    all.extend(items);
    ast::Module { items: all }
}

pub fn analyze(items: Vec<Item>) -> Result<Module, CompileError> {
    gic::analyze(&source(items), &CompileOptions::default())
}

/// Compile the prelude and `items`, validating the emitted module.
pub fn compile(items: Vec<Item>) -> Result<String, CompileError> {
    let text = gic::compile(&source(items), &CompileOptions::default())?;
    validate(&text);
    Ok(text)
}

/// Compile and instantiate. Panics if compilation fails.
pub fn instantiate(items: Vec<Item>) -> Wasm {
    let text = compile(items).unwrap_or_else(|err| panic!("{err}"));
    Wasm::new(&text)
}

/// Top-level `(export "name" (func $name))`.
pub fn export(name: &str) -> Item {
    Item::asm(vec![AsmTerm::list(vec![
        AsmTerm::atom("export"),
        AsmTerm::Str(name.to_string()),
        AsmTerm::list(vec![AsmTerm::atom("func"), AsmTerm::atom(format!("${name}"))]),
    ])])
}

/// The emitted lines that declare a type, trimmed.
pub fn type_decls(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("(type $") && !line.starts_with("(type $__fn."))
        .collect()
}
