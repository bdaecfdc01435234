//! Generic IR traversal.
//!
//! Two traits walk expression trees: [`MutVisitor`] for passes that rewrite
//! nodes in place and [`Visitor`] for read-only analyses. Default methods
//! call the matching `walk_*` function, which recurses into every child, so
//! a pass overrides only the node kinds it cares about and delegates the
//! rest.
//!
//! Type slots (`Expr::ty` and the ids embedded in kinds such as
//! `EnumInst::variant`) are offered to `visit_type`, which does nothing by
//! default. References to declarations are ids and are never followed.
//!
//! # Example
//!
//! ```text
//! struct RenameLabels { map: FxHashMap<LabelId, LabelId> }
//!
//! impl MutVisitor for RenameLabels {
//!     type Error = Infallible;
//!     fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), Infallible> {
//!         if let ExprKind::Break { label, .. } = &mut expr.kind {
//!             *label = self.map[label];
//!         }
//!         walk_expr_mut(self, expr)
//!     }
//! }
//! ```

use gi_stack::ensure_sufficient_stack;

use crate::{AsmTerm, Expr, ExprKind, Pattern, TypeId};

/// In-place rewriting traversal.
pub trait MutVisitor {
    type Error;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), Self::Error> {
        walk_expr_mut(self, expr)
    }

    fn visit_body(&mut self, body: &mut Vec<Expr>) -> Result<(), Self::Error> {
        walk_body_mut(self, body)
    }

    fn visit_type(&mut self, ty: &mut TypeId) -> Result<(), Self::Error> {
        let _ = ty;
        Ok(())
    }

    fn visit_pattern(&mut self, pattern: &mut Pattern) -> Result<(), Self::Error> {
        walk_pattern_mut(self, pattern)
    }

    fn visit_asm_term(&mut self, term: &mut AsmTerm) -> Result<(), Self::Error> {
        walk_asm_term_mut(self, term)
    }
}

pub fn walk_body_mut<V: MutVisitor + ?Sized>(
    visitor: &mut V,
    body: &mut [Expr],
) -> Result<(), V::Error> {
    for expr in body {
        visitor.visit_expr(expr)?;
    }
    Ok(())
}

pub fn walk_pattern_mut<V: MutVisitor + ?Sized>(
    visitor: &mut V,
    pattern: &mut Pattern,
) -> Result<(), V::Error> {
    match pattern {
        Pattern::Wildcard => Ok(()),
        Pattern::Variant { variant, .. } => match variant {
            Some(ty) => visitor.visit_type(ty),
            None => Ok(()),
        },
        Pattern::Value(expr) => visitor.visit_expr(expr),
    }
}

pub fn walk_asm_term_mut<V: MutVisitor + ?Sized>(
    visitor: &mut V,
    term: &mut AsmTerm,
) -> Result<(), V::Error> {
    match term {
        AsmTerm::Atom(_) | AsmTerm::Int(_) | AsmTerm::Str(_) => Ok(()),
        AsmTerm::List(items) => {
            for item in items {
                visitor.visit_asm_term(item)?;
            }
            Ok(())
        }
        AsmTerm::Expr(expr) => visitor.visit_expr(expr),
    }
}

/// Visit the type slot and every child of `expr`.
pub fn walk_expr_mut<V: MutVisitor + ?Sized>(
    visitor: &mut V,
    expr: &mut Expr,
) -> Result<(), V::Error> {
    ensure_sufficient_stack(|| {
        visitor.visit_type(&mut expr.ty)?;
        match &mut expr.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Nop
            | ExprKind::Var(_)
            | ExprKind::Func(_)
            | ExprKind::Macro(_)
            | ExprKind::Overloads(_)
            | ExprKind::Const(_) => Ok(()),
            ExprKind::Type(ty) => visitor.visit_type(ty),
            ExprKind::Attr { obj, .. }
            | ExprKind::BoundMethod { recv: obj, .. }
            | ExprKind::GetField { obj, .. }
            | ExprKind::SetLocal { value: obj, .. }
            | ExprKind::Retag(obj)
            | ExprKind::Drop(obj) => visitor.visit_expr(obj),
            ExprKind::Call { callee, args } => {
                visitor.visit_expr(callee)?;
                walk_body_mut(visitor, args)
            }
            ExprKind::Index { obj, index } | ExprKind::GetItem { obj, index } => {
                visitor.visit_expr(obj)?;
                visitor.visit_expr(index)
            }
            ExprKind::Assign { target, value } => {
                visitor.visit_expr(target)?;
                visitor.visit_expr(value)
            }
            ExprKind::FunctionCall { args, .. }
            | ExprKind::MacroCall { args, .. }
            | ExprKind::TupleInst { fields: args } => walk_body_mut(visitor, args),
            ExprKind::EnumInst { variant, args } => {
                visitor.visit_type(variant)?;
                walk_body_mut(visitor, args)
            }
            ExprKind::SetField { obj, value, .. } => {
                visitor.visit_expr(obj)?;
                visitor.visit_expr(value)
            }
            ExprKind::SetItem { obj, index, value } => {
                visitor.visit_expr(obj)?;
                visitor.visit_expr(index)?;
                visitor.visit_expr(value)
            }
            ExprKind::Block { body, .. } => visitor.visit_body(body),
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                visitor.visit_expr(cond)?;
                visitor.visit_body(then_body)?;
                visitor.visit_body(else_body)
            }
            ExprKind::Loop { cond, body, .. } => {
                visitor.visit_expr(cond)?;
                visitor.visit_body(body)
            }
            ExprKind::Return(value) | ExprKind::Break { value, .. } => match value {
                Some(value) => visitor.visit_expr(value),
                None => Ok(()),
            },
            ExprKind::Match(m) => {
                visitor.visit_expr(&mut m.scrutinee)?;
                for case in &mut m.cases {
                    visitor.visit_pattern(&mut case.pattern)?;
                    visitor.visit_body(&mut case.body)?;
                }
                Ok(())
            }
            ExprKind::MatchEnum(m) => {
                visitor.visit_expr(&mut m.scrutinee)?;
                visitor.visit_type(&mut m.enum_)?;
                for arm in &mut m.arms {
                    if let Some(variant) = &mut arm.variant {
                        visitor.visit_type(variant)?;
                    }
                    visitor.visit_body(&mut arm.body)?;
                }
                Ok(())
            }
            ExprKind::MatchInt(m) => {
                visitor.visit_expr(&mut m.scrutinee)?;
                for arm in &mut m.arms {
                    visitor.visit_body(&mut arm.body)?;
                }
                match &mut m.fallback {
                    Some(body) => visitor.visit_body(body),
                    None => Ok(()),
                }
            }
            ExprKind::Asm(terms) => {
                for term in terms {
                    visitor.visit_asm_term(term)?;
                }
                Ok(())
            }
        }
    })
}

/// Read-only traversal.
pub trait Visitor<'ir> {
    type Error;

    fn visit_expr(&mut self, expr: &'ir Expr) -> Result<(), Self::Error> {
        walk_expr(self, expr)
    }

    fn visit_type(&mut self, ty: TypeId) -> Result<(), Self::Error> {
        let _ = ty;
        Ok(())
    }

    fn visit_pattern(&mut self, pattern: &'ir Pattern) -> Result<(), Self::Error> {
        walk_pattern(self, pattern)
    }
}

pub fn walk_body<'ir, V: Visitor<'ir> + ?Sized>(
    visitor: &mut V,
    body: &'ir [Expr],
) -> Result<(), V::Error> {
    for expr in body {
        visitor.visit_expr(expr)?;
    }
    Ok(())
}

pub fn walk_pattern<'ir, V: Visitor<'ir> + ?Sized>(
    visitor: &mut V,
    pattern: &'ir Pattern,
) -> Result<(), V::Error> {
    match pattern {
        Pattern::Wildcard => Ok(()),
        Pattern::Variant { variant, .. } => match variant {
            Some(ty) => visitor.visit_type(*ty),
            None => Ok(()),
        },
        Pattern::Value(expr) => visitor.visit_expr(expr),
    }
}

pub fn walk_asm_terms<'ir, V: Visitor<'ir> + ?Sized>(
    visitor: &mut V,
    terms: &'ir [AsmTerm],
) -> Result<(), V::Error> {
    for term in terms {
        match term {
            AsmTerm::Atom(_) | AsmTerm::Int(_) | AsmTerm::Str(_) => {}
            AsmTerm::List(items) => walk_asm_terms(visitor, items)?,
            AsmTerm::Expr(expr) => visitor.visit_expr(expr)?,
        }
    }
    Ok(())
}

pub fn walk_expr<'ir, V: Visitor<'ir> + ?Sized>(
    visitor: &mut V,
    expr: &'ir Expr,
) -> Result<(), V::Error> {
    ensure_sufficient_stack(|| {
        visitor.visit_type(expr.ty)?;
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Nop
            | ExprKind::Var(_)
            | ExprKind::Func(_)
            | ExprKind::Macro(_)
            | ExprKind::Overloads(_)
            | ExprKind::Const(_) => Ok(()),
            ExprKind::Type(ty) => visitor.visit_type(*ty),
            ExprKind::Attr { obj, .. }
            | ExprKind::BoundMethod { recv: obj, .. }
            | ExprKind::GetField { obj, .. }
            | ExprKind::SetLocal { value: obj, .. }
            | ExprKind::Retag(obj)
            | ExprKind::Drop(obj) => visitor.visit_expr(obj),
            ExprKind::Call { callee, args } => {
                visitor.visit_expr(callee)?;
                walk_body(visitor, args)
            }
            ExprKind::Index { obj, index } | ExprKind::GetItem { obj, index } => {
                visitor.visit_expr(obj)?;
                visitor.visit_expr(index)
            }
            ExprKind::Assign { target, value } => {
                visitor.visit_expr(target)?;
                visitor.visit_expr(value)
            }
            ExprKind::FunctionCall { args, .. }
            | ExprKind::MacroCall { args, .. }
            | ExprKind::TupleInst { fields: args } => walk_body(visitor, args),
            ExprKind::EnumInst { variant, args } => {
                visitor.visit_type(*variant)?;
                walk_body(visitor, args)
            }
            ExprKind::SetField { obj, value, .. } => {
                visitor.visit_expr(obj)?;
                visitor.visit_expr(value)
            }
            ExprKind::SetItem { obj, index, value } => {
                visitor.visit_expr(obj)?;
                visitor.visit_expr(index)?;
                visitor.visit_expr(value)
            }
            ExprKind::Block { body, .. } => walk_body(visitor, body),
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                visitor.visit_expr(cond)?;
                walk_body(visitor, then_body)?;
                walk_body(visitor, else_body)
            }
            ExprKind::Loop { cond, body, .. } => {
                visitor.visit_expr(cond)?;
                walk_body(visitor, body)
            }
            ExprKind::Return(value) | ExprKind::Break { value, .. } => match value {
                Some(value) => visitor.visit_expr(value),
                None => Ok(()),
            },
            ExprKind::Match(m) => {
                visitor.visit_expr(&m.scrutinee)?;
                for case in &m.cases {
                    visitor.visit_pattern(&case.pattern)?;
                    walk_body(visitor, &case.body)?;
                }
                Ok(())
            }
            ExprKind::MatchEnum(m) => {
                visitor.visit_expr(&m.scrutinee)?;
                visitor.visit_type(m.enum_)?;
                for arm in &m.arms {
                    if let Some(variant) = arm.variant {
                        visitor.visit_type(variant)?;
                    }
                    walk_body(visitor, &arm.body)?;
                }
                Ok(())
            }
            ExprKind::MatchInt(m) => {
                visitor.visit_expr(&m.scrutinee)?;
                for arm in &m.arms {
                    walk_body(visitor, &arm.body)?;
                }
                match &m.fallback {
                    Some(body) => walk_body(visitor, body),
                    None => Ok(()),
                }
            }
            ExprKind::Asm(terms) => walk_asm_terms(visitor, terms),
        }
    })
}
