//! Width-based pretty-printer for the term tree.
//!
//! A list whose flat rendering is shorter than the configured width stays
//! on one line. A longer list is broken: its head keyword (and a `$name`
//! directly after it) stays on the opening line, every other item goes on
//! its own line one level deeper, and the closing parenthesis gets a line
//! of its own.

use gi_stack::ensure_sufficient_stack;

use crate::term::Term;

/// Default maximum width of a flat subtree.
pub const MAX_LINE_WIDTH: usize = 100;

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PrintConfig {
    pub max_width: usize,
    pub indent_width: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        PrintConfig {
            max_width: MAX_LINE_WIDTH,
            indent_width: INDENT_WIDTH,
        }
    }
}

impl PrintConfig {
    pub fn with_max_width(max_width: usize) -> Self {
        PrintConfig {
            max_width,
            ..Default::default()
        }
    }
}

/// Render `term` followed by a newline.
pub fn print(term: &Term, config: PrintConfig) -> String {
    let mut printer = Printer {
        config,
        out: String::with_capacity(4096),
    };
    printer.term(term, 0);
    printer.out.push('\n');
    printer.out
}

struct Printer {
    config: PrintConfig,
    out: String,
}

impl Printer {
    fn indent(&mut self, level: usize) {
        for _ in 0..level * self.config.indent_width {
            self.out.push(' ');
        }
    }

    /// Render at the current position; the caller has already indented.
    fn term(&mut self, term: &Term, level: usize) {
        let flat = term.to_string();
        let items = match term {
            Term::List(items) if flat.len() >= self.config.max_width && !items.is_empty() => {
                items
            }
            _ => {
                self.out.push_str(&flat);
                return;
            }
        };
        ensure_sufficient_stack(|| self.broken(items, level));
    }

    fn broken(&mut self, items: &[Term], level: usize) {
        self.out.push('(');
        let mut rest = items;
        if let [first @ Term::Atom(head), tail @ ..] = items {
            self.out.push_str(&first.to_string());
            rest = tail;
            if let [Term::Atom(name), tail @ ..] = rest {
                if name.starts_with('$') && head != "elem" {
                    self.out.push(' ');
                    self.out.push_str(name);
                    rest = tail;
                }
            }
        } else if let [first, tail @ ..] = items {
            self.out.push('\n');
            self.indent(level + 1);
            self.term(first, level + 1);
            rest = tail;
        }
        for item in rest {
            self.out.push('\n');
            self.indent(level + 1);
            self.term(item, level + 1);
        }
        self.out.push('\n');
        self.indent(level);
        self.out.push(')');
    }
}

#[cfg(test)]
mod tests;
