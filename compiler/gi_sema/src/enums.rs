//! Pass 10: enum construction lowering.
//!
//! A variant value is a tuple whose field 0 is the discriminant, so
//! `Option.Some(3)` becomes a `TupleInst` of type `Option.Some` with the
//! fields `(0, 3)`.

use gi_diagnostic::{CompileError, Result};
use gi_ir::visitor::{walk_expr_mut, MutVisitor};
use gi_ir::{Expr, ExprKind, Module, TypeId, TypeKind};

use crate::bodies::{for_each_body, Bodies};
use crate::CompileOptions;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn convert_enum_inst(mut module: Module, _options: &CompileOptions) -> Result<Module> {
    for_each_body(&mut module, Bodies::Functions, |module, _, body| {
        lower_enum_insts(module, body)
    })?;
    Ok(module)
}

pub(crate) fn lower_enum_insts(module: &Module, body: &mut [Expr]) -> Result<()> {
    let mut lowering = EnumLowering { module };
    for expr in body {
        lowering.visit_expr(expr)?;
    }
    Ok(())
}

struct EnumLowering<'m> {
    module: &'m Module,
}

impl MutVisitor for EnumLowering<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        walk_expr_mut(self, expr)?;
        let ExprKind::EnumInst { variant, args } = &mut expr.kind else {
            return Ok(());
        };
        let variant = *variant;
        let TypeKind::EnumValue(value) = self.module.kind(variant) else {
            return Err(CompileError::internal(
                format!(
                    "enum construction of non-variant {}",
                    self.module.display_type(variant)
                ),
                expr.span,
            ));
        };
        let discriminant = Expr::new(
            ExprKind::Int(i64::from(value.discriminant)),
            TypeId::DISCRIMINANT,
            expr.span,
        );
        let mut fields = Vec::with_capacity(args.len() + 1);
        fields.push(discriminant);
        fields.append(args);
        expr.kind = ExprKind::TupleInst { fields };
        expr.ty = variant;
        Ok(())
    }
}
