//! Helpers for passes that rewrite every function body.

use gi_diagnostic::Result;
use gi_ir::{AsmBlock, AsmTerm, ConstId, ConstInit, Expr, FuncId, Module, Span};

/// Which functions a body pass visits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Bodies {
    /// Runtime functions only. Macro bodies are analyzed per call site after
    /// inlining.
    Functions,
    /// Functions and macros.
    All,
}

/// Run `f` over each lowered body, with the body moved out of the module so
/// `f` can borrow the module mutably.
pub(crate) fn for_each_body(
    module: &mut Module,
    which: Bodies,
    mut f: impl FnMut(&mut Module, FuncId, &mut Vec<Expr>) -> Result<()>,
) -> Result<()> {
    for func in module.funcs.ids() {
        let def = &module.funcs[func];
        if def.lowered_body().is_none() || (which == Bodies::Functions && def.is_macro()) {
            continue;
        }
        let mut body = module.funcs[func].take_body();
        let result = f(module, func, &mut body);
        module.funcs[func].put_body(body);
        result?;
    }
    Ok(())
}

/// Run `f` over each lowered constant initializer.
pub(crate) fn for_each_const(
    module: &mut Module,
    mut f: impl FnMut(&mut Module, ConstId, &mut Expr) -> Result<()>,
) -> Result<()> {
    for id in module.consts.ids() {
        let ConstInit::Lowered(init) = &mut module.consts[id].init else {
            continue;
        };
        let mut init = init.take();
        let result = f(module, id, &mut init);
        module.consts[id].init = ConstInit::Lowered(init);
        result?;
    }
    Ok(())
}

/// Run `f` over the terms of each lowered top-level assembly block.
pub(crate) fn for_each_asm(
    module: &mut Module,
    mut f: impl FnMut(&mut Module, &mut Vec<AsmTerm>) -> Result<()>,
) -> Result<()> {
    for index in 0..module.asm.len() {
        let AsmBlock::Lowered(terms) = &mut module.asm[index] else {
            continue;
        };
        let mut terms = std::mem::take(terms);
        let result = f(module, &mut terms);
        module.asm[index] = AsmBlock::Lowered(terms);
        result?;
    }
    Ok(())
}

/// Wrap a term list as a void expression so expression visitors can walk it.
pub(crate) fn asm_expr(terms: &mut Vec<AsmTerm>) -> Expr {
    Expr::new(
        gi_ir::ExprKind::Asm(std::mem::take(terms)),
        gi_ir::TypeId::VOID,
        Span::DUMMY,
    )
}

/// Undo [`asm_expr`].
pub(crate) fn asm_terms(expr: Expr, terms: &mut Vec<AsmTerm>) {
    if let gi_ir::ExprKind::Asm(inner) = expr.kind {
        *terms = inner;
    }
}
