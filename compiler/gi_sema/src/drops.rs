//! Pass 7: explicit drops for unused results.
//!
//! The target's operand stack must be balanced at the end of every block,
//! so a statement whose value nobody consumes is wrapped in `Drop`. That is
//! every non-final statement of a non-void type, and the final statement
//! too when the enclosing body produces nothing.

use gi_diagnostic::{CompileError, Result};
use gi_ir::visitor::{walk_expr_mut, MutVisitor};
use gi_ir::{Expr, ExprKind, Module, TypeId};

use crate::bodies::{for_each_body, Bodies};
use crate::CompileOptions;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn drop_unused_results(mut module: Module, _options: &CompileOptions) -> Result<Module> {
    for_each_body(&mut module, Bodies::Functions, |module, func, body| {
        let ret = module.funcs[func].ret;
        DropUnused { module }.body(body, ret)
    })?;
    Ok(module)
}

/// Insert drops inside one expression, such as an inlined fragment.
pub(crate) fn drop_unused(module: &Module, expr: &mut Expr) -> Result<()> {
    DropUnused { module }.visit_expr(expr)
}

struct DropUnused<'m> {
    module: &'m Module,
}

impl DropUnused<'_> {
    fn body(&mut self, body: &mut [Expr], result: TypeId) -> Result<()> {
        let produces = !self.module.is_void(result);
        let last = body.len().saturating_sub(1);
        for (index, expr) in body.iter_mut().enumerate() {
            self.visit_expr(expr)?;
            let consumed = produces && index == last;
            if !consumed && !self.module.is_void(expr.ty) && !expr.diverges() {
                let span = expr.span;
                let value = expr.take();
                *expr = Expr::new(ExprKind::Drop(Box::new(value)), TypeId::VOID, span);
            }
        }
        Ok(())
    }
}

impl MutVisitor for DropUnused<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        gi_stack::ensure_sufficient_stack(|| {
            let ty = expr.ty;
            match &mut expr.kind {
                ExprKind::Block { body, .. } => self.body(body, ty),
                ExprKind::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    self.visit_expr(cond)?;
                    self.body(then_body, ty)?;
                    self.body(else_body, ty)
                }
                ExprKind::Loop { cond, body, .. } => {
                    self.visit_expr(cond)?;
                    self.body(body, TypeId::VOID)
                }
                ExprKind::Match(m) => {
                    self.visit_expr(&mut m.scrutinee)?;
                    for case in &mut m.cases {
                        self.body(&mut case.body, ty)?;
                    }
                    Ok(())
                }
                ExprKind::MatchEnum(m) => {
                    self.visit_expr(&mut m.scrutinee)?;
                    for arm in &mut m.arms {
                        self.body(&mut arm.body, ty)?;
                    }
                    Ok(())
                }
                ExprKind::MatchInt(m) => {
                    self.visit_expr(&mut m.scrutinee)?;
                    for arm in &mut m.arms {
                        self.body(&mut arm.body, ty)?;
                    }
                    match &mut m.fallback {
                        Some(fallback) => self.body(fallback, ty),
                        None => Ok(()),
                    }
                }
                _ => walk_expr_mut(self, expr),
            }
        })
    }
}
