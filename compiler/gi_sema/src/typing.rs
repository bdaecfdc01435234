//! Pass 6: expected-type-driven type propagation.
//!
//! Every expression is typed top-down against the type its context
//! expects: call arguments against the parameter types, a function body's
//! final value against the return type, the right side of an assignment
//! against the target. Literal placeholders settle here. A literal lands
//! directly on a type whose representation holds it; otherwise the
//! expected type's `__from_literal` hook is called on it.
//!
//! Nodes member resolution had to defer are resolved in strict mode before
//! they are typed, so anything still unresolvable is reported here.
//!
//! Only placeholder and unknown slots are ever written, so running the pass
//! over an already typed tree changes nothing.

use gi_diagnostic::{CompileError, Result};
use gi_ir::visitor::MutVisitor;
use gi_ir::{
    AsmTerm, Expr, ExprKind, FuncId, LabelId, Module, TupleType, TypeId, TypeKind,
};

use crate::bodies::{asm_expr, asm_terms, for_each_asm, for_each_body, for_each_const, Bodies};
use crate::compat::{assignable, default_literal_type, from_literal_hooks, holds_literal};
use crate::resolve::Resolver;
use crate::CompileOptions;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn propagate_types(mut module: Module, options: &CompileOptions) -> Result<Module> {
    for_each_const(&mut module, |module, id, init| {
        let declared = module.consts[id].ty;
        let expected = (!declared.is_unknown()).then_some(declared);
        TypePropagator::new(module, options, TypeId::VOID).propagate(init, expected)?;
        if declared.is_unknown() {
            module.consts[id].ty = init.ty;
        }
        let value = crate::eval::const_value(module, init)?;
        tracing::debug!(name = %module.consts[id].name, value, "evaluated constant");
        module.consts[id].value = Some(value);
        Ok(())
    })?;
    for_each_body(&mut module, Bodies::Functions, |module, func, body| {
        propagate_function(module, options, func, body)
    })?;
    for_each_asm(&mut module, |module, terms| {
        let mut expr = asm_expr(terms);
        let result = TypePropagator::new(module, options, TypeId::VOID).propagate(&mut expr, None);
        asm_terms(expr, terms);
        result
    })?;
    Ok(module)
}

/// Type one function body against its return type.
pub(crate) fn propagate_function(
    module: &mut Module,
    options: &CompileOptions,
    func: FuncId,
    body: &mut [Expr],
) -> Result<()> {
    let ret = module.funcs[func].ret;
    TypePropagator::new(module, options, ret).propagate_block(body, ret)
}

pub(crate) struct TypePropagator<'m> {
    module: &'m mut Module,
    options: &'m CompileOptions,
    /// Return type of the enclosing function.
    ret: TypeId,
    /// Result types of the blocks a `break` may target, innermost last.
    labels: Vec<(LabelId, TypeId)>,
}

impl<'m> TypePropagator<'m> {
    pub(crate) fn new(module: &'m mut Module, options: &'m CompileOptions, ret: TypeId) -> Self {
        TypePropagator {
            module,
            options,
            ret,
            labels: Vec::new(),
        }
    }

    /// A block result slot for `expected`, `None` meaning the value is
    /// discarded.
    fn wanted(&self, expected: Option<TypeId>) -> Option<TypeId> {
        expected.filter(|&ty| !ty.is_unknown() && !self.module.is_void(ty))
    }

    /// Type `body` so that its final statement yields `result`.
    pub(crate) fn propagate_block(&mut self, body: &mut [Expr], result: TypeId) -> Result<()> {
        let want = self.wanted(Some(result));
        let Some((last, init)) = body.split_last_mut() else {
            return match want {
                Some(ty) => Err(CompileError::type_mismatch(
                    self.module.display_type(ty),
                    "()",
                    gi_ir::Span::DUMMY,
                )),
                None => Ok(()),
            };
        };
        for expr in init {
            self.propagate(expr, None)?;
        }
        match want {
            Some(ty) if !matches!(last.kind, ExprKind::Return(_) | ExprKind::Break { .. }) => {
                self.propagate(last, Some(ty))
            }
            _ => self.propagate(last, None),
        }
    }

    pub(crate) fn propagate(&mut self, expr: &mut Expr, expected: Option<TypeId>) -> Result<()> {
        gi_stack::ensure_sufficient_stack(|| {
            if expr.kind.is_unresolved() {
                self.force_resolve(expr)?;
            }
            self.propagate_resolved(expr, expected)?;
            self.check(expr, expected)
        })
    }

    /// Resolve a node member resolution deferred, reporting failure.
    fn force_resolve(&mut self, expr: &mut Expr) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Call { callee, args } => {
                for arg in args.iter_mut().filter(|arg| arg.ty.is_unknown()) {
                    self.propagate(arg, None)?;
                }
                self.type_receiver(callee)?;
            }
            ExprKind::Attr { .. } | ExprKind::BoundMethod { .. } | ExprKind::Index { .. } => {
                self.type_receiver(expr)?;
            }
            ExprKind::Assign { target, value } => {
                if value.ty.is_unknown() {
                    self.propagate(value, None)?;
                }
                self.type_receiver(target)?;
            }
            _ => {}
        }
        Resolver::new(&mut *self.module, self.options, true).visit_expr(expr)?;
        if expr.kind.is_unresolved() {
            return Err(CompileError::type_mismatch(
                "a value",
                format!("an unapplied {}", expr.kind.describe()),
                expr.span,
            ));
        }
        Ok(())
    }

    /// Type the receiver operand of a member access or index node.
    fn type_receiver(&mut self, expr: &mut Expr) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Attr { obj, .. }
            | ExprKind::BoundMethod { recv: obj, .. }
            | ExprKind::Index { obj, .. }
                if obj.ty.is_unknown() && !matches!(obj.kind, ExprKind::Type(_)) =>
            {
                self.propagate(obj, None)
            }
            _ => Ok(()),
        }
    }

    fn propagate_resolved(&mut self, expr: &mut Expr, expected: Option<TypeId>) -> Result<()> {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Int(_) | ExprKind::Str(_) => return self.literal(expr, expected),
            ExprKind::Nop => expr.ty = TypeId::VOID,
            ExprKind::Var(var) => {
                let var = *var;
                let ty = self.module.vars[var].ty;
                if ty.is_unknown() {
                    return Err(CompileError::type_mismatch(
                        "a variable with a declared or inferred type",
                        format!("`{}` of unknown type", self.module.vars[var].name),
                        span,
                    ));
                }
                expr.ty = ty;
            }
            ExprKind::Const(id) => expr.ty = self.module.consts[*id].ty,
            ExprKind::FunctionCall { func: callee, args }
            | ExprKind::MacroCall { mac: callee, args } => {
                let callee = *callee;
                let params: Vec<TypeId> = self.module.funcs[callee]
                    .params
                    .iter()
                    .map(|&param| self.module.vars[param].ty)
                    .collect();
                for (arg, param) in args.iter_mut().zip(params) {
                    self.propagate(arg, Some(param))?;
                }
                expr.ty = self.module.funcs[callee].ret;
            }
            ExprKind::TupleInst { fields } => {
                if expr.ty.is_unknown() {
                    expr.ty = self.tuple_type(fields, expected)?;
                }
                let types = self
                    .module
                    .tuple_fields(expr.ty)
                    .map(<[TypeId]>::to_vec)
                    .unwrap_or_default();
                if types.len() != fields.len() {
                    return Err(CompileError::type_mismatch(
                        self.module.display_type(expr.ty),
                        format!("a tuple of {} field(s)", fields.len()),
                        span,
                    ));
                }
                for (field, ty) in fields.iter_mut().zip(types) {
                    self.propagate(field, Some(ty))?;
                }
            }
            ExprKind::EnumInst { variant, args } => {
                let variant = *variant;
                let payload = match self.module.kind(variant) {
                    TypeKind::EnumValue(value) => value.payload().to_vec(),
                    _ => Vec::new(),
                };
                for (arg, ty) in args.iter_mut().zip(payload) {
                    self.propagate(arg, Some(ty))?;
                }
                if expr.ty.is_unknown() {
                    expr.ty = variant;
                }
            }
            ExprKind::GetField { obj, index } => {
                self.propagate(obj, None)?;
                let field = self
                    .module
                    .tuple_fields(obj.ty)
                    .and_then(|fields| fields.get(*index as usize).copied());
                match field {
                    Some(field) => expr.ty = field,
                    None => {
                        return Err(CompileError::unimplemented_member(
                            self.module.display_type(obj.ty),
                            index.to_string(),
                            span,
                        ))
                    }
                }
            }
            ExprKind::SetField { obj, index, value } => {
                self.propagate(obj, None)?;
                let field = self
                    .module
                    .tuple_fields(obj.ty)
                    .and_then(|fields| fields.get(*index as usize).copied());
                let Some(field) = field else {
                    return Err(CompileError::unimplemented_member(
                        self.module.display_type(obj.ty),
                        index.to_string(),
                        span,
                    ));
                };
                self.propagate(value, Some(field))?;
                expr.ty = TypeId::VOID;
            }
            ExprKind::GetItem { obj, index } => {
                self.propagate(obj, None)?;
                self.propagate(index, None)?;
                self.require_i32(index)?;
                expr.ty = self.element(obj)?;
            }
            ExprKind::SetItem { obj, index, value } => {
                self.propagate(obj, None)?;
                self.propagate(index, None)?;
                self.require_i32(index)?;
                let elem = self.element(obj)?;
                self.propagate(value, Some(elem))?;
                expr.ty = TypeId::VOID;
            }
            ExprKind::SetLocal { var, value } => {
                let var = *var;
                let declared = self.module.vars[var].ty;
                if declared.is_unknown() {
                    self.propagate(value, None)?;
                    if self.module.is_void(value.ty) {
                        return Err(CompileError::type_mismatch(
                            "a value",
                            "()",
                            value.span,
                        ));
                    }
                    self.module.vars[var].ty = value.ty;
                } else {
                    self.propagate(value, Some(declared))?;
                }
                expr.ty = TypeId::VOID;
            }
            ExprKind::Retag(inner) => {
                let target = expr.ty;
                if self.module.kind(inner.ty).is_literal() {
                    self.propagate(inner, Some(target))?;
                } else {
                    self.propagate(inner, None)?;
                    let same = match (self.module.native(inner.ty), self.module.native(target)) {
                        (Some(a), Some(b)) => a == b,
                        _ => false,
                    };
                    if !same {
                        return Err(CompileError::type_mismatch(
                            format!(
                                "a value represented as `{}`",
                                self.module.display_type(target)
                            ),
                            self.module.display_type(inner.ty),
                            inner.span,
                        ));
                    }
                }
            }
            ExprKind::Block { label, body } => {
                let result = if expr.ty.is_unknown() {
                    self.wanted(expected).unwrap_or(TypeId::VOID)
                } else {
                    expr.ty
                };
                self.labels.push((*label, result));
                let outcome = self.propagate_block(body, result);
                self.labels.pop();
                outcome?;
                expr.ty = result;
            }
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.propagate(cond, None)?;
                self.require_i32(cond)?;
                let result = match self.result_type(expr.ty, expected) {
                    Some(ty) if !else_body.is_empty() => ty,
                    _ => TypeId::VOID,
                };
                self.propagate_block(then_body, result)?;
                self.propagate_block(else_body, result)?;
                expr.ty = result;
            }
            ExprKind::Loop { label, cond, body } => {
                self.propagate(cond, None)?;
                self.require_i32(cond)?;
                self.labels.push((*label, TypeId::VOID));
                let outcome = self.propagate_block(body, TypeId::VOID);
                self.labels.pop();
                outcome?;
                expr.ty = TypeId::VOID;
            }
            ExprKind::Return(value) => {
                let ret = self.ret;
                match (value, self.wanted(Some(ret))) {
                    (Some(value), Some(ret)) => self.propagate(value, Some(ret))?,
                    (None, None) => {}
                    (Some(value), None) => {
                        self.propagate(value, None)?;
                        return Err(CompileError::type_mismatch(
                            "no return value",
                            self.module.display_type(value.ty),
                            value.span,
                        ));
                    }
                    (None, Some(ret)) => {
                        return Err(CompileError::type_mismatch(
                            self.module.display_type(ret),
                            "()",
                            span,
                        ))
                    }
                }
                expr.ty = TypeId::VOID;
            }
            ExprKind::Break { label, value } => {
                let label = *label;
                let target = self
                    .labels
                    .iter()
                    .rev()
                    .find(|&&(l, _)| l == label)
                    .map(|&(_, ty)| ty)
                    .ok_or_else(|| CompileError::internal("break to an unknown label", span))?;
                match (value, self.wanted(Some(target))) {
                    (Some(value), Some(ty)) => self.propagate(value, Some(ty))?,
                    (Some(value), None) => self.propagate(value, None)?,
                    (None, _) => {}
                }
                expr.ty = TypeId::VOID;
            }
            ExprKind::Drop(inner) => {
                self.propagate(inner, None)?;
                expr.ty = TypeId::VOID;
            }
            ExprKind::Match(m) => {
                self.propagate(&mut m.scrutinee, None)?;
                Resolver::new(&mut *self.module, self.options, true).resolve_patterns(m)?;
                let scrutinee = m.scrutinee.ty;
                let result = self.result_type(expr.ty, expected).unwrap_or(TypeId::VOID);
                for case in &mut m.cases {
                    if let gi_ir::Pattern::Value(value) = &mut case.pattern {
                        self.propagate(value, Some(scrutinee))?;
                    }
                    self.propagate_block(&mut case.body, result)?;
                }
                expr.ty = result;
            }
            ExprKind::MatchEnum(m) => {
                self.propagate(&mut m.scrutinee, None)?;
                let result = self.result_type(expr.ty, expected).unwrap_or(TypeId::VOID);
                self.labels.push((m.label, result));
                let mut outcome = Ok(());
                for arm in &mut m.arms {
                    outcome = self.propagate_block(&mut arm.body, result);
                    if outcome.is_err() {
                        break;
                    }
                }
                self.labels.pop();
                outcome?;
                expr.ty = result;
            }
            ExprKind::MatchInt(m) => {
                self.propagate(&mut m.scrutinee, None)?;
                let result = self.result_type(expr.ty, expected).unwrap_or(TypeId::VOID);
                for arm in &mut m.arms {
                    self.propagate_block(&mut arm.body, result)?;
                }
                if let Some(fallback) = &mut m.fallback {
                    self.propagate_block(fallback, result)?;
                }
                expr.ty = result;
            }
            ExprKind::Asm(terms) => {
                self.asm_terms(terms)?;
                if expr.ty.is_unknown() {
                    expr.ty = self.wanted(expected).unwrap_or(TypeId::VOID);
                }
            }
            ExprKind::Func(_)
            | ExprKind::Macro(_)
            | ExprKind::Overloads(_)
            | ExprKind::Type(_)
            | ExprKind::BoundMethod { .. }
            | ExprKind::Attr { .. }
            | ExprKind::Call { .. }
            | ExprKind::Index { .. }
            | ExprKind::Assign { .. } => {
                return Err(CompileError::internal(
                    format!("{} survived strict resolution", expr.kind.describe()),
                    span,
                ))
            }
        }
        Ok(())
    }

    /// The value type a branching expression produces.
    fn result_type(&self, current: TypeId, expected: Option<TypeId>) -> Option<TypeId> {
        self.wanted(expected)
            .or_else(|| self.wanted(Some(current)))
    }

    fn asm_terms(&mut self, terms: &mut [AsmTerm]) -> Result<()> {
        for term in terms {
            match term {
                AsmTerm::List(items) => self.asm_terms(items)?,
                AsmTerm::Expr(expr) => self.propagate(expr, None)?,
                AsmTerm::Atom(_) | AsmTerm::Int(_) | AsmTerm::Str(_) => {}
            }
        }
        Ok(())
    }

    /// Type a literal against `expected`, or its default type.
    fn literal(&mut self, expr: &mut Expr, expected: Option<TypeId>) -> Result<()> {
        if !self.module.kind(expr.ty).is_literal() {
            return Ok(());
        }
        let target = match self.wanted(expected) {
            Some(ty) => ty,
            None => default_literal_type(self.module, self.options, expr.ty, expr.span)?,
        };
        if holds_literal(self.module, expr.ty, target) {
            expr.ty = target;
            return Ok(());
        }
        let hooks = from_literal_hooks(self.module, expr.ty, target);
        let callee = match hooks.as_slice() {
            [] => {
                return Err(CompileError::type_mismatch(
                    self.module.display_type(target),
                    self.module.display_type(expr.ty),
                    expr.span,
                ))
            }
            [hook] if self.module.funcs[*hook].is_macro() => ExprKind::Macro(*hook),
            [hook] => ExprKind::Func(*hook),
            _ => ExprKind::Overloads(hooks),
        };
        tracing::trace!(target = %self.module.display_type(target), "converting literal");
        let span = expr.span;
        let literal = expr.take();
        *expr = Expr::untyped(
            ExprKind::Call {
                callee: Box::new(Expr::untyped(callee, span)),
                args: vec![literal],
            },
            span,
        );
        self.propagate(expr, Some(target))
    }

    /// The anonymous tuple type of a tuple literal, or the expected tuple
    /// type when the shapes agree.
    fn tuple_type(&mut self, fields: &mut [Expr], expected: Option<TypeId>) -> Result<TypeId> {
        if let Some(expected) = self.wanted(expected) {
            let fits = self
                .module
                .tuple(expected)
                .is_some_and(|tuple| tuple.fields.len() == fields.len());
            if fits {
                return Ok(expected);
            }
        }
        let mut types = Vec::with_capacity(fields.len());
        for field in fields.iter_mut() {
            self.propagate(field, None)?;
            types.push(field.ty);
        }
        let span = fields.first().map_or(gi_ir::Span::DUMMY, |f| f.span);
        Ok(self
            .module
            .new_type(TypeKind::Tuple(TupleType::positional(types)), span))
    }

    fn element(&self, array: &Expr) -> Result<TypeId> {
        self.module.element_type(array.ty).ok_or_else(|| {
            CompileError::type_mismatch(
                "an array",
                self.module.display_type(array.ty),
                array.span,
            )
        })
    }

    fn require_i32(&self, expr: &Expr) -> Result<()> {
        if self.module.native(expr.ty).is_some_and(|n| n.name == "i32") {
            Ok(())
        } else {
            Err(CompileError::type_mismatch(
                "a value represented as i32",
                self.module.display_type(expr.ty),
                expr.span,
            ))
        }
    }

    /// `expr` may stand where `expected` is wanted.
    fn check(&self, expr: &Expr, expected: Option<TypeId>) -> Result<()> {
        let Some(expected) = self.wanted(expected) else {
            return Ok(());
        };
        if expr.diverges() || assignable(self.module, expected, expr.ty) {
            return Ok(());
        }
        Err(CompileError::type_mismatch(
            self.module.display_type(expected),
            self.module.display_type(expr.ty),
            expr.span,
        ))
    }
}
