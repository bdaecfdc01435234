#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn get(name: &str) -> Term {
    Term::instr("local.get", [Term::ident(name)])
}

#[test]
fn short_lists_stay_flat() {
    let term = Term::instr("i32.add", [get("a"), get("b")]);
    assert_eq!(
        print(&term, PrintConfig::default()),
        "(i32.add (local.get $a) (local.get $b))\n"
    );
}

#[test]
fn long_lists_break_with_name_on_head_line() {
    let term = Term::instr(
        "func",
        [
            Term::ident("module.add"),
            Term::instr("param", [Term::ident("a"), Term::atom("i32")]),
            Term::instr("i32.add", [get("a"), get("a")]),
        ],
    );
    let expected = "\
(func $module.add
    (param $a i32)
    (i32.add (local.get $a) (local.get $a))
)
";
    assert_eq!(print(&term, PrintConfig::with_max_width(40)), expected);
}

#[test]
fn nested_lists_break_independently() {
    let term = Term::instr(
        "block",
        [
            Term::ident("l0"),
            Term::instr("br_if", [Term::ident("l0"), get("condition")]),
            Term::instr("drop", [get("x")]),
        ],
    );
    let expected = "\
(block $l0
    (br_if $l0
        (local.get $condition)
    )
    (drop (local.get $x))
)
";
    assert_eq!(print(&term, PrintConfig::with_max_width(30)), expected);
}

#[test]
fn elem_keeps_its_operands_on_separate_lines() {
    let term = Term::instr(
        "elem",
        [Term::ident("table"), Term::atom("func"), Term::ident("f")],
    );
    let expected = "\
(elem
    $table
    func
    $f
)
";
    assert_eq!(print(&term, PrintConfig::with_max_width(10)), expected);
}

fn term_strategy() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![
        "[a-z][a-z0-9.]{0,8}".prop_map(Term::Atom),
        "[a-z]{1,6}".prop_map(|name| Term::Atom(format!("${name}"))),
        any::<i32>().prop_map(|n| Term::Int(i64::from(n))),
        "[a-z]{0,6}".prop_map(Term::Str),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop::collection::vec(inner, 0..6).prop_map(Term::List)
    })
}

/// Collapse line breaks and indentation back into single spaces.
fn collapse(printed: &str) -> String {
    printed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" )", ")")
        .replace("( ", "(")
}

proptest! {
    #[test]
    fn breaking_only_changes_whitespace(term in term_strategy(), width in 1usize..60) {
        let printed = print(&term, PrintConfig::with_max_width(width));
        prop_assert_eq!(collapse(&printed), term.to_string());
    }

    #[test]
    fn wide_enough_output_is_one_line(term in term_strategy()) {
        let flat = term.to_string();
        let printed = print(&term, PrintConfig::with_max_width(flat.len() + 1));
        prop_assert_eq!(printed, format!("{flat}\n"));
    }
}
