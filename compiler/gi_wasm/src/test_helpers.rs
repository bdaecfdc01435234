//! Analyzed modules for code generation tests.

use gi_ir::ast::{self, AsmTerm, FunctionDecl, Item, Param, Stmt, TypeExpr};
use gi_ir::Module;
use gi_sema::CompileOptions;

use crate::term::Term;

pub(crate) fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

fn binary_op(op: &str, instr: &str, ret: &str) -> Item {
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

/// Scalars, `bytes` and a few operators.
fn prelude() -> Vec<Item> {
    vec![
        Item::type_def("i32", Some(TypeExpr::native("i32"))),
        Item::type_def("i64", Some(TypeExpr::native("i64"))),
        Item::type_def("bool", Some(TypeExpr::native("i32"))),
        Item::type_def(
            "bytes",
            Some(TypeExpr::native_array(TypeExpr::native_packed(
                "i32", "i8", false,
            ))),
        ),
        binary_op("+", "i32.add", "i32"),
        binary_op("==", "i32.eq", "bool"),
    ]
}

pub(crate) fn function(
    name: &str,
    params: &[(&str, TypeExpr)],
    ret: Option<TypeExpr>,
    body: Vec<Stmt>,
) -> Item {
    let params = params
        .iter()
        .map(|(name, ty)| Param::new(*name, ty.clone()))
        .collect();
    Item::function(FunctionDecl::new(name, params, ret, body))
}

pub(crate) fn source(items: Vec<Item>) -> ast::Module {
    let mut all = prelude();
    all.extend(items);
    ast::Module { items: all }
}

/// Analyze the prelude and `items`; panics on a compile error.
pub(crate) fn analyzed(items: Vec<Item>) -> Module {
    gi_sema::analyze(&source(items), &CompileOptions::default())
        .unwrap_or_else(|err| panic!("analysis failed: {err}"))
}

pub(crate) fn generated(items: Vec<Item>) -> Term {
    crate::generate(&analyzed(items)).unwrap_or_else(|err| panic!("generation failed: {err}"))
}

/// The module field `(head $name ...)`.
pub(crate) fn field<'t>(module: &'t Term, head: &str, name: &str) -> &'t Term {
    let Term::List(items) = module else {
        panic!("not a module: {module}");
    };
    let ident = format!("${name}");
    items
        .iter()
        .find(|item| match item {
            Term::List(parts) => {
                item.head() == Some(head)
                    && matches!(parts.get(1), Some(Term::Atom(atom)) if *atom == ident)
            }
            _ => false,
        })
        .unwrap_or_else(|| panic!("no ({head} {ident} ...) in\n{module}"))
}

/// Heads of the module's fields, in order.
pub(crate) fn field_heads(module: &Term) -> Vec<String> {
    let Term::List(items) = module else {
        panic!("not a module: {module}");
    };
    items
        .iter()
        .skip(1)
        .filter_map(|item| item.head().map(str::to_string))
        .collect()
}
