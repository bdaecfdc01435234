//! Pass 8: match specialization.
//!
//! A generic `Match` becomes one of two dispatch forms, chosen by the
//! scrutinee's representation:
//!
//! - **Enum scrutinee**: a `MatchEnum` jump table with one entry per
//!   declared variant in discriminant order. Each entry names the first
//!   case for that variant, else the first wildcard, else falls out of the
//!   match. Pattern bindings become reads of payload fields `1..`.
//! - **Integer scrutinee**: a `MatchInt` equality cascade. Case values are
//!   evaluated at compile time, so a case may name a constant or a macro
//!   call with literal arguments.
//!
//! Either way the scrutinee is evaluated once into a fresh `__match` local.
//! A match that produces a value must cover every input.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::visitor::{walk_expr_mut, MutVisitor};
use gi_ir::{
    EnumArm, Expr, ExprKind, IntArm, Match, MatchEnum, MatchInt, Module, Pattern, ScopeId, Span,
    TypeId, TypeKind, VarKind,
};

use crate::bodies::{for_each_body, Bodies};
use crate::eval::const_value;
use crate::CompileOptions;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn specialize_matches(mut module: Module, _options: &CompileOptions) -> Result<Module> {
    for_each_body(&mut module, Bodies::Functions, |module, func, body| {
        let scope = module.funcs[func].scope;
        specialize(module, scope, body)
    })?;
    Ok(module)
}

/// Specialize every match in `body`, hoisting temporaries into the function
/// owning `scope`.
pub(crate) fn specialize(module: &mut Module, scope: ScopeId, body: &mut [Expr]) -> Result<()> {
    let mut specializer = Specializer { module, scope };
    for expr in body {
        specializer.visit_expr(expr)?;
    }
    Ok(())
}

struct Specializer<'m> {
    module: &'m mut Module,
    scope: ScopeId,
}

impl MutVisitor for Specializer<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        walk_expr_mut(self, expr)?;
        if let ExprKind::Match(_) = expr.kind {
            let ExprKind::Match(m) = std::mem::replace(&mut expr.kind, ExprKind::Nop) else {
                return Ok(());
            };
            expr.kind = self.specialize(m, expr.ty, expr.span)?;
        }
        Ok(())
    }
}

impl Specializer<'_> {
    fn specialize(&mut self, m: Match, ty: TypeId, span: Span) -> Result<ExprKind> {
        let scrutinee_ty = m.scrutinee.ty;
        if let Some(enum_) = self.module.enum_of(scrutinee_ty) {
            return self.enum_match(m, enum_, ty, span);
        }
        if self.module.native(scrutinee_ty).is_some_and(|n| n.is_integer()) {
            return self.int_match(m, ty, span);
        }
        Err(CompileError::type_mismatch(
            "an enum or integer scrutinee",
            self.module.display_type(scrutinee_ty),
            m.scrutinee.span,
        ))
    }

    /// A fresh local holding the scrutinee.
    fn temporary(&mut self, ty: TypeId, span: Span) -> Result<gi_ir::VarId> {
        let tmp = self.module.new_var("__match", ty, VarKind::Local, span);
        self.module
            .register_local(self.scope, "__match", tmp)
            .at(span)?;
        Ok(tmp)
    }

    fn enum_match(&mut self, m: Match, enum_: TypeId, ty: TypeId, span: Span) -> Result<ExprKind> {
        let TypeKind::Enum(def) = self.module.kind(enum_) else {
            return Err(CompileError::internal("enum_of returned a non-enum", span));
        };
        let variants = def.variants.clone();

        let mut arms = Vec::with_capacity(m.cases.len());
        for case in m.cases {
            let (variant, bindings) = match case.pattern {
                Pattern::Wildcard => (None, Vec::new()),
                Pattern::Variant {
                    variant: Some(variant),
                    bindings,
                    ..
                } => {
                    let bindings = bindings
                        .into_iter()
                        .zip(1u32..)
                        .filter_map(|(var, field)| var.map(|var| (var, field)))
                        .collect();
                    (Some(variant), bindings)
                }
                Pattern::Variant { name, .. } => {
                    return Err(CompileError::internal(
                        format!("variant pattern `{name}` reached specialization unresolved"),
                        case.span,
                    ))
                }
                Pattern::Value(value) => {
                    return Err(CompileError::type_mismatch(
                        "a variant pattern",
                        format!("a {} pattern", value.kind.describe()),
                        case.span,
                    ))
                }
            };
            arms.push(EnumArm {
                label: self.module.fresh_label(),
                variant,
                bindings,
                body: case.body,
            });
        }

        let wildcard = arms.iter().position(|arm| arm.variant.is_none());
        let table: Vec<Option<usize>> = variants
            .iter()
            .map(|&variant| {
                arms.iter()
                    .position(|arm| arm.variant == Some(variant))
                    .or(wildcard)
            })
            .collect();

        if !self.module.is_void(ty) {
            let missing: Vec<String> = variants
                .iter()
                .zip(&table)
                .filter(|(_, entry)| entry.is_none())
                .map(|(&variant, _)| self.module.display_type(variant))
                .collect();
            if !missing.is_empty() {
                return Err(CompileError::NonExhaustiveMatch {
                    ty: self.module.display_type(enum_),
                    missing: missing.join(", "),
                    span: Some(span),
                });
            }
        }

        let tmp = self.temporary(enum_, span)?;
        tracing::debug!(
            enum_ = %self.module.display_type(enum_),
            arms = arms.len(),
            variants = variants.len(),
            "specialized match into a jump table"
        );
        Ok(ExprKind::MatchEnum(MatchEnum {
            label: self.module.fresh_label(),
            tmp,
            scrutinee: m.scrutinee,
            enum_,
            arms,
            table,
            default_label: self.module.fresh_label(),
        }))
    }

    fn int_match(&mut self, m: Match, ty: TypeId, span: Span) -> Result<ExprKind> {
        let mut arms = Vec::new();
        let mut fallback = None;
        for case in m.cases {
            match case.pattern {
                Pattern::Value(value) => {
                    let value = const_value(self.module, &value)?;
                    arms.push(IntArm {
                        value,
                        body: case.body,
                    });
                }
                Pattern::Wildcard => {
                    if fallback.is_none() {
                        fallback = Some(case.body);
                    }
                }
                Pattern::Variant { name, .. } => {
                    return Err(CompileError::type_mismatch(
                        "a value pattern",
                        format!("variant pattern `{name}`"),
                        case.span,
                    ))
                }
            }
        }

        if fallback.is_none() && !self.module.is_void(ty) {
            return Err(CompileError::NonExhaustiveMatch {
                ty: self.module.display_type(m.scrutinee.ty),
                missing: "values without a case".to_string(),
                span: Some(span),
            });
        }

        let tmp = self.temporary(m.scrutinee.ty, span)?;
        tracing::debug!(arms = arms.len(), "specialized match into an equality cascade");
        Ok(ExprKind::MatchInt(MatchInt {
            label: self.module.fresh_label(),
            tmp,
            scrutinee: m.scrutinee,
            arms,
            fallback,
        }))
    }
}

#[cfg(test)]
mod tests;
