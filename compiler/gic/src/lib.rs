//! The Gi compiler core.
//!
//! Takes a parsed module, runs it through the semantic pipeline of
//! [`gi_sema`] and renders the result as WebAssembly text with
//! [`gi_wasm`]. Parsing, file handling and the command-line driver live
//! elsewhere.
//!
//! ```text
//! ast::Module ──analyze──▶ ir::Module ──generate──▶ Term ──print──▶ String
//! ```
//!
//! Compilation is all or nothing: the first [`CompileError`] aborts it and
//! no partial output is produced.

use std::sync::Once;

pub use gi_diagnostic::{CompileError, ErrorCode, Result};
pub use gi_ir::{ast, Module};
pub use gi_sema::{analyze, analyze_until, CompileOptions, OverloadPolicy};
pub use gi_wasm::{PrintConfig, Term};

static TRACING_INIT: Once = Once::new();

/// Compile `ast` to WebAssembly text.
#[tracing::instrument(level = "debug", skip_all, fields(items = ast.items.len()))]
pub fn compile(ast: &ast::Module, options: &CompileOptions) -> Result<String> {
    let module = analyze(ast, options)?;
    let text = gi_wasm::emit(&module, PrintConfig::with_max_width(options.max_line_width))?;
    tracing::debug!(bytes = text.len(), "compiled module");
    Ok(text)
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
/// `RUST_LOG=gi_sema=debug` shows one span per pass;
/// `RUST_LOG=gi_sema=trace` adds per-node decisions.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
