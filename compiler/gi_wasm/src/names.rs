//! Identifiers in the emitted module.
//!
//! Declaration symbols are dotted scope names rooted at `module.`; the root
//! prefix is dropped and any character the text format does not allow in an
//! identifier is replaced. Template brackets survive as angle brackets, so
//! `module.Pair[i32, i64]` becomes `$Pair<i32|i64>`.

use gi_ir::{LabelId, ROOT_SCOPE_NAME};

use crate::term::Term;

/// A text-format identifier for `symbol`, without the leading `$`.
pub fn mangle(symbol: &str) -> String {
    let symbol = symbol
        .strip_prefix(ROOT_SCOPE_NAME)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(symbol);
    let mut out = String::with_capacity(symbol.len());
    for c in symbol.chars() {
        match c {
            '[' => out.push('<'),
            ']' => out.push('>'),
            ',' => out.push('|'),
            ' ' => {}
            c if is_idchar(c) => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

fn is_idchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '.'
                | '/'
                | ':'
                | '<'
                | '='
                | '>'
                | '?'
                | '@'
                | '\\'
                | '^'
                | '_'
                | '`'
                | '|'
                | '~'
        )
}

/// `$symbol`, mangled.
pub(crate) fn symbol(symbol: &str) -> Term {
    Term::ident(&mangle(symbol))
}

pub(crate) fn label(label: LabelId) -> Term {
    Term::Atom(format!("$l{}", label.raw()))
}

/// The inner `loop` label of a `while`.
pub(crate) fn loop_label(label: LabelId) -> Term {
    Term::Atom(format!("$l{}.loop", label.raw()))
}

/// Type of a function's signature entry.
pub(crate) fn signature(func_symbol: &str) -> Term {
    Term::Atom(format!("$__fn.{}", mangle(func_symbol)))
}
