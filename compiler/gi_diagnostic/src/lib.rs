//! Diagnostics for the Gi compiler.
//!
//! Every pass fails fast: the first problem found aborts compilation of the
//! whole module. A failure is a [`CompileError`] carrying a human-readable
//! message, a stable [`ErrorCode`] and, where the offending node is known,
//! its [`Span`](gi_ir::Span).
//!
//! Scope operations in `gi_ir` report [`LookupError`](gi_ir::LookupError)s,
//! which convert into the matching `CompileError` variant. Use
//! [`ResultExt::at`] to attach the span of the node being processed.

mod error;
mod error_code;

pub use error::{CompileError, Result, ResultExt};
pub use error_code::ErrorCode;
