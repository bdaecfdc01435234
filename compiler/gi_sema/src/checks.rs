//! Pass 9: pipeline invariant checks.
//!
//! Nothing here is a user error. A node kind or type slot that an earlier
//! pass should have eliminated means a pass is missing a case, and is
//! reported as an internal error with the node's span.

use gi_diagnostic::{CompileError, Result};
use gi_ir::visitor::{walk_expr, Visitor};
use gi_ir::{AsmBlock, ConstInit, Expr, ExprKind, FunctionBody, Module, Span, TypeId, TypeKind};

use crate::CompileOptions;

/// Every body, constant and assembly block has been translated.
#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn check_no_untranslated(module: Module, _options: &CompileOptions) -> Result<Module> {
    for (_, def) in module.funcs.iter() {
        if let FunctionBody::Pending(_) = def.body {
            return Err(CompileError::internal(
                format!("body of `{}` was never translated", def.symbol),
                def.span,
            ));
        }
    }
    for (_, def) in module.consts.iter() {
        if let ConstInit::Pending(_) = def.init {
            return Err(CompileError::internal(
                format!("constant `{}` was never translated", def.symbol),
                def.span,
            ));
        }
    }
    if module.asm.iter().any(|block| matches!(block, AsmBlock::Pending(_))) {
        return Err(CompileError::internal(
            "top-level assembly was never translated",
            Span::DUMMY,
        ));
    }
    Ok(module)
}

/// Every runtime function is fully resolved and typed.
#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn check_no_unknown_types(module: Module, _options: &CompileOptions) -> Result<Module> {
    check(&module, Stage::Typed)?;
    Ok(module)
}

/// After inlining, only nodes the code generator understands remain.
#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn check_lowered(module: Module, _options: &CompileOptions) -> Result<Module> {
    check(&module, Stage::Lowered)?;
    Ok(module)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage {
    Typed,
    Lowered,
}

fn check(module: &Module, stage: Stage) -> Result<()> {
    for (_, def) in module.funcs.iter().filter(|(_, def)| !def.is_macro()) {
        for &var in def.params.iter().chain(&def.locals) {
            let decl = &module.vars[var];
            if !is_concrete(module, decl.ty) {
                return Err(CompileError::internal(
                    format!(
                        "variable `{}` of `{}` has type {}",
                        decl.name,
                        def.symbol,
                        module.display_type(decl.ty)
                    ),
                    decl.span,
                ));
            }
        }
        if !is_concrete(module, def.ret) && !module.is_void(def.ret) {
            return Err(CompileError::internal(
                format!("`{}` returns {}", def.symbol, module.display_type(def.ret)),
                def.span,
            ));
        }
        if let Some(body) = def.lowered_body() {
            let mut checker = Checker { module, stage };
            for expr in body {
                checker.visit_expr(expr)?;
            }
        }
    }
    Ok(())
}

/// A type the code generator can lay out.
fn is_concrete(module: &Module, ty: TypeId) -> bool {
    match module.kind(ty) {
        TypeKind::Unknown
        | TypeKind::IntLiteral
        | TypeKind::StrLiteral
        | TypeKind::Untranslated { .. }
        | TypeKind::TemplateParam { .. }
        | TypeKind::TemplateInst { .. } => false,
        TypeKind::Tuple(tuple) => tuple.fields.iter().all(|&field| is_concrete(module, field)),
        TypeKind::Array(elem) | TypeKind::NativeArray(elem) => is_concrete(module, *elem),
        TypeKind::Void
        | TypeKind::Native(_)
        | TypeKind::Def(_)
        | TypeKind::Enum(_)
        | TypeKind::EnumValue(_) => true,
    }
}

struct Checker<'m> {
    module: &'m Module,
    stage: Stage,
}

impl Checker<'_> {
    fn fail(&self, expr: &Expr, what: &str) -> CompileError {
        CompileError::internal(
            format!("{what} {} survived to {:?} stage", expr.kind.describe(), self.stage),
            expr.span,
        )
    }
}

impl<'ir> Visitor<'ir> for Checker<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &'ir Expr) -> Result<()> {
        if expr.kind.is_unresolved() {
            return Err(self.fail(expr, "unresolved"));
        }
        match &expr.kind {
            ExprKind::Match(_) => return Err(self.fail(expr, "unspecialized")),
            ExprKind::EnumInst { .. } | ExprKind::MacroCall { .. }
                if self.stage == Stage::Lowered =>
            {
                return Err(self.fail(expr, "unlowered"))
            }
            _ => {}
        }
        if !is_concrete(self.module, expr.ty) {
            return Err(CompileError::internal(
                format!(
                    "{} has type {}",
                    expr.kind.describe(),
                    self.module.display_type(expr.ty)
                ),
                expr.span,
            ));
        }
        walk_expr(self, expr)
    }
}
