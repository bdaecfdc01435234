//! The WebAssembly text term tree.
//!
//! Code generation builds a tree of s-expressions; [`crate::printer`]
//! renders it. Instructions are emitted in folded form, so an instruction
//! and its operands are one [`Term::List`].

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// A keyword, identifier (`$name`) or any other bare token.
    Atom(String),
    Int(i64),
    /// A quoted string literal.
    Str(String),
    List(Vec<Term>),
}

impl Term {
    pub fn atom(text: impl Into<String>) -> Self {
        Term::Atom(text.into())
    }

    pub fn list(items: Vec<Term>) -> Self {
        Term::List(items)
    }

    /// `$name`.
    pub fn ident(name: &str) -> Self {
        Term::Atom(format!("${name}"))
    }

    /// `(op operand...)`.
    pub fn instr(op: &str, operands: impl IntoIterator<Item = Term>) -> Self {
        let mut items = vec![Term::atom(op)];
        items.extend(operands);
        Term::List(items)
    }

    /// `(i32.const value)` and friends.
    pub fn constant(native: &str, value: i64) -> Self {
        Term::List(vec![Term::Atom(format!("{native}.const")), Term::Int(value)])
    }

    /// The leading keyword of a list.
    pub fn head(&self) -> Option<&str> {
        match self {
            Term::List(items) => match items.first() {
                Some(Term::Atom(head)) => Some(head),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Quote `text` as a text-format string, escaping anything outside
/// printable ASCII as `\hh`.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\{byte:02x}")),
        }
    }
    out.push('"');
    out
}

/// Flat, single-line rendering.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(atom) => f.write_str(atom),
            Term::Int(value) => write!(f, "{value}"),
            Term::Str(text) => f.write_str(&quote(text)),
            Term::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}
