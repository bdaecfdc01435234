//! WebAssembly text generation for the Gi compiler.
//!
//! Turns a fully analyzed [`gi_ir::Module`] into a module in the
//! WebAssembly text format, using the GC proposal's struct and array types
//! for tuples, arrays and enums.
//!
//! # Architecture
//!
//! ```text
//! ir::Module (after gi_sema)
//!        ↓
//!   codegen::generate   (declarations and bodies → Term tree)
//!        ↓
//!   printer::print      (width-based layout → text)
//! ```
//!
//! - [`term`]: the s-expression tree
//! - [`printer`]: flat-if-it-fits pretty-printer
//! - [`codegen`]: module layout, with `types` and `body` doing the work
//! - [`host`]: compile-time execution of instruction sequences

mod body;
pub mod codegen;
pub mod host;
mod names;
pub mod printer;
pub mod term;
#[cfg(test)]
mod test_helpers;
mod types;

pub use codegen::generate;
pub use names::mangle;
pub use printer::{print, PrintConfig, INDENT_WIDTH, MAX_LINE_WIDTH};
pub use term::Term;

/// Generate and print `module`.
pub fn emit(module: &gi_ir::Module, config: PrintConfig) -> gi_diagnostic::Result<String> {
    Ok(print(&generate(module)?, config))
}
