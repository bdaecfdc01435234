use gi_ir::ast::{AsmTerm, Expr as Ast, FunctionDecl, Item, Param, Stmt};
use pretty_assertions::assert_eq;

use crate::printer::{print, PrintConfig};
use crate::term::Term;
use crate::test_helpers::{analyzed, field, field_heads, function, generated, ty};

fn log_import() -> Item {
    Item::function(FunctionDecl::import(
        "log",
        vec![Param::new("value", ty("i32"))],
        None,
    ))
}

fn export(name: &str) -> Item {
    Item::asm(vec![AsmTerm::list(vec![
        AsmTerm::atom("export"),
        AsmTerm::Str(name.to_string()),
        AsmTerm::list(vec![AsmTerm::atom("func"), AsmTerm::atom(format!("${name}"))]),
    ])])
}

fn main_calling_log() -> Item {
    function(
        "main",
        &[],
        None,
        vec![Stmt::expr(Ast::call(Ast::ident("log"), vec![Ast::int(7)]))],
    )
}

#[test]
fn sections_follow_module_order() {
    let module = generated(vec![
        Item::constant("N", Some(ty("i32")), Ast::int(5)),
        main_calling_log(),
        log_import(),
        export("main"),
    ]);
    let heads = field_heads(&module);
    let first = |head: &str| heads.iter().position(|h| h == head).unwrap_or(usize::MAX);
    let last = |head: &str| heads.iter().rposition(|h| h == head).unwrap_or(usize::MAX);
    assert!(last("import") < first("type"), "{heads:?}");
    assert!(last("type") < first("global"), "{heads:?}");
    assert!(last("global") < first("func"), "{heads:?}");
    assert_eq!(heads.last().map(String::as_str), Some("export"));
}

#[test]
fn host_imports_come_from_env() {
    let module = generated(vec![log_import(), main_calling_log()]);
    let Term::List(items) = &module else {
        panic!("not a module");
    };
    let import = items
        .iter()
        .find(|item| item.head() == Some("import"))
        .map(ToString::to_string)
        .unwrap_or_else(|| panic!("no import in {module}"));
    assert_eq!(
        import,
        "(import \"env\" \"log\" (func $log (type $__fn.log) (param i32)))"
    );
    assert_eq!(
        field(&module, "type", "__fn.log").to_string(),
        "(type $__fn.log (func (param i32)))"
    );
    assert!(field(&module, "func", "main")
        .to_string()
        .contains("(call $log (i32.const 7))"));
}

#[test]
fn constants_become_globals() {
    let module = generated(vec![
        Item::constant("N", Some(ty("i32")), Ast::binary("+", Ast::int(2), Ast::int(3))),
        function("get", &[], Some(ty("i32")), vec![Stmt::ret(Ast::ident("N"))]),
    ]);
    assert_eq!(
        field(&module, "global", "N").to_string(),
        "(global $N i32 (i32.const 5))"
    );
    assert!(field(&module, "func", "get")
        .to_string()
        .contains("(return (global.get $N))"));
}

#[test]
fn macros_are_not_emitted() {
    let module = generated(vec![]);
    let text = module.to_string();
    assert!(!text.contains("(func"), "{text}");
}

#[test]
fn emitted_text_is_laid_out_by_width() {
    let module = analyzed(vec![
        function(
            "add",
            &[("a", ty("i32")), ("b", ty("i32"))],
            Some(ty("i32")),
            vec![Stmt::ret(Ast::binary("+", Ast::ident("a"), Ast::ident("b")))],
        ),
        export("add"),
    ]);
    let text = crate::emit(&module, PrintConfig::default()).unwrap_or_else(|err| panic!("{err}"));
    assert!(text.starts_with("(module\n"), "{text}");
    assert!(text.ends_with(")\n"), "{text}");
    assert!(
        text.contains("\n    (export \"add\" (func $add))\n"),
        "{text}"
    );

    let narrow = print(
        &crate::generate(&module).unwrap_or_else(|err| panic!("{err}")),
        PrintConfig::with_max_width(20),
    );
    assert!(narrow.lines().count() > text.lines().count());
}
