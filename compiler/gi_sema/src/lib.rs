//! Semantic analysis for the Gi compiler.
//!
//! Turns the parser's syntax tree into a fully typed, monomorphized,
//! macro-expanded [`Module`](gi_ir::Module) ready for code generation. The
//! work is a chain of whole-module passes ([`pipeline::PASSES`]):
//!
//! 1. [`register_toplevel_decls`] / [`register_toplevel_methods`]
//! 2. [`translate_toplevel_type_decls`]
//! 3. [`translate_function_defs`]
//! 4. [`instantiate_templates`]
//! 5. [`resolve_member_access`]
//! 6. [`propagate_types`]
//! 7. [`drop_unused_results`]
//! 8. [`specialize_matches`]
//! 9. [`check_no_untranslated`] / [`check_no_unknown_types`]
//! 10. [`convert_enum_inst`]
//! 11. [`inline_macros`], followed by [`check_lowered`]
//! 12. [`sort_types`]
//!
//! Every pass fails fast: the first [`CompileError`](gi_diagnostic::CompileError)
//! aborts the compilation.

mod bodies;
mod checks;
mod compat;
mod drops;
mod enums;
mod eval;
mod inline;
mod matches;
mod options;
pub mod pipeline;
mod register;
mod resolve;
mod sorting;
mod templates;
mod translate;
mod typing;

#[cfg(test)]
mod test_helpers;

pub use checks::{check_lowered, check_no_unknown_types, check_no_untranslated};
pub use drops::drop_unused_results;
pub use enums::convert_enum_inst;
pub use inline::inline_macros;
pub use matches::specialize_matches;
pub use options::{CompileOptions, OverloadPolicy};
pub use pipeline::{analyze, analyze_until};
pub use register::{register_toplevel_decls, register_toplevel_methods};
pub use resolve::resolve_member_access;
pub use sorting::sort_types;
pub use templates::instantiate_templates;
pub use translate::{translate_function_defs, translate_toplevel_type_decls};
pub use typing::propagate_types;
