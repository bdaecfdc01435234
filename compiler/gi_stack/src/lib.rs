//! Stack growth for deeply nested IR.
//!
//! Every semantic pass recurses over the expression tree, and macro inlining
//! nests freshly substituted bodies inside the caller. Long operator chains or
//! deeply nested blocks can therefore exceed the default thread stack.
//! Wrapping the recursive step in [`ensure_sufficient_stack`] grows the stack
//! on demand instead.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than [`RED_ZONE`] remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// On wasm hosts the engine owns the stack; call straight through.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
