//! Pass 5: member and overload resolution.
//!
//! Turns the unresolved kinds left by translation into resolved ones,
//! bottom-up, using the static type of each receiver:
//!
//! - `.0`, `.1`, ... read tuple positions (shifted past the discriminant on
//!   enum variants), and `.name` reads a named tuple field before methods
//!   are searched along the `super_` chain;
//! - a method taking `self` becomes a `BoundMethod`, and calling it
//!   prepends the receiver to the arguments;
//! - calling a type constructs it: tuples and variants build instances,
//!   native scalars retag their argument;
//! - `a[i]` and `a[i] = v` call the `[]` and `[]=` methods, or index a
//!   native array directly.
//!
//! A receiver or argument whose type is still unknown defers the node: it
//! stays unresolved and type propagation retries it in strict mode, where
//! anything still unresolvable is reported.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::visitor::{walk_body_mut, walk_expr_mut, MutVisitor};
use gi_ir::{
    Binding, Expr, ExprKind, FuncId, Match, Module, Pattern, Resolved, Span, TypeBinding, TypeId,
    TypeKind,
};

use crate::bodies::{asm_expr, asm_terms, for_each_asm, for_each_body, for_each_const, Bodies};
use crate::compat::{default_literal_type, fit};
use crate::{CompileOptions, OverloadPolicy};

#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn resolve_member_access(mut module: Module, options: &CompileOptions) -> Result<Module> {
    for_each_const(&mut module, |module, id, init| {
        Resolver::new(module, options, false).visit_expr(init)?;
        if module.consts[id].ty.is_unknown() && !init.ty.is_unknown() {
            module.consts[id].ty = default_literal_type(module, options, init.ty, init.span)?;
        }
        Ok(())
    })?;
    for_each_body(&mut module, Bodies::Functions, |module, _, body| {
        Resolver::new(module, options, false).visit_body(body)
    })?;
    for_each_asm(&mut module, |module, terms| {
        let mut expr = asm_expr(terms);
        let result = Resolver::new(module, options, false).visit_expr(&mut expr);
        asm_terms(expr, terms);
        result
    })?;
    Ok(module)
}

pub(crate) struct Resolver<'m> {
    module: &'m mut Module,
    options: &'m CompileOptions,
    /// Report what cannot be resolved instead of deferring it.
    strict: bool,
}

impl<'m> Resolver<'m> {
    pub(crate) fn new(module: &'m mut Module, options: &'m CompileOptions, strict: bool) -> Self {
        Resolver {
            module,
            options,
            strict,
        }
    }

    /// The type a receiver is looked up on, or `None` to defer.
    fn receiver_type(&self, recv: &Expr) -> Result<Option<TypeId>> {
        self.known_type(recv.ty, recv.kind.describe(), recv.span)
    }

    /// `ty` with literal placeholders replaced by their default types.
    fn known_type(&self, ty: TypeId, what: &str, span: Span) -> Result<Option<TypeId>> {
        if ty.is_unknown() {
            if self.strict {
                return Err(CompileError::type_mismatch(
                    "a receiver of known type",
                    format!("{what} of unknown type"),
                    span,
                ));
            }
            return Ok(None);
        }
        default_literal_type(self.module, self.options, ty, span).map(Some)
    }

    fn function_kind(&self, func: FuncId) -> ExprKind {
        if self.module.funcs[func].is_macro() {
            ExprKind::Macro(func)
        } else {
            ExprKind::Func(func)
        }
    }

    /// Visit the operands of an assignment target without reading it.
    fn visit_place(&mut self, place: &mut Expr) -> Result<()> {
        match &mut place.kind {
            ExprKind::Attr { obj, .. } | ExprKind::GetField { obj, .. } => self.visit_expr(obj),
            ExprKind::Index { obj, index } | ExprKind::GetItem { obj, index } => {
                self.visit_expr(obj)?;
                self.visit_expr(index)
            }
            _ => self.visit_expr(place),
        }
    }

    fn resolve_node(&mut self, expr: &mut Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Var(var) => expr.ty = self.module.vars[*var].ty,
            ExprKind::Const(id) => expr.ty = self.module.consts[*id].ty,
            ExprKind::Attr { .. } => self.resolve_attr(expr, false)?,
            ExprKind::Call { .. } => self.resolve_call(expr)?,
            ExprKind::Index { .. } => self.resolve_index(expr)?,
            ExprKind::Assign { .. } => self.resolve_assign(expr)?,
            ExprKind::SetLocal { var, value } => {
                let var = *var;
                if self.module.vars[var].ty.is_unknown() && !value.ty.is_unknown() {
                    let ty = default_literal_type(self.module, self.options, value.ty, value.span)?;
                    self.module.vars[var].ty = ty;
                }
            }
            ExprKind::FunctionCall { func, .. } => expr.ty = self.module.funcs[*func].ret,
            ExprKind::MacroCall { mac, .. } => expr.ty = self.module.funcs[*mac].ret,
            ExprKind::GetField { obj, index } => {
                let field = self
                    .module
                    .tuple_fields(obj.ty)
                    .and_then(|fields| fields.get(*index as usize).copied());
                if let Some(field) = field {
                    expr.ty = field;
                }
            }
            ExprKind::GetItem { obj, .. } => {
                if let Some(elem) = self.module.element_type(obj.ty) {
                    expr.ty = elem;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolve `obj.name`. In callee position a variant stays a type so the
    /// call can construct it.
    fn resolve_attr(&mut self, expr: &mut Expr, callee: bool) -> Result<()> {
        let span = expr.span;
        let ExprKind::Attr { obj, name } = &mut expr.kind else {
            return Ok(());
        };
        if let ExprKind::Type(owner) = obj.kind {
            let (kind, ty) = self.static_member(owner, name, callee, span)?;
            expr.kind = kind;
            expr.ty = ty;
            return Ok(());
        }

        let Some(recv_ty) = self.receiver_type(obj)? else {
            return Ok(());
        };
        if let Some(index) = self.field_index(recv_ty, name) {
            let field = self
                .module
                .tuple_fields(recv_ty)
                .and_then(|fields| fields.get(index as usize).copied())
                .unwrap_or(TypeId::UNKNOWN);
            let obj = Box::new(obj.take());
            expr.kind = ExprKind::GetField { obj, index };
            expr.ty = field;
            return Ok(());
        }

        let member = self.module.lookup_member(recv_ty, name).at(span)?;
        let candidates = match member {
            Some(Resolved::Value(Binding::Func(func))) => vec![func],
            Some(Resolved::Value(Binding::Overloads(set))) => set.to_vec(),
            _ => Vec::new(),
        };
        let methods: Vec<FuncId> = candidates
            .into_iter()
            .filter(|&func| self.module.funcs[func].takes_self(&self.module.vars))
            .collect();
        if methods.is_empty() {
            return Err(CompileError::unimplemented_member(
                self.module.display_type(recv_ty),
                name.clone(),
                span,
            ));
        }
        let recv = Box::new(obj.take());
        expr.kind = ExprKind::BoundMethod {
            candidates: methods,
            recv,
        };
        expr.ty = TypeId::UNKNOWN;
        Ok(())
    }

    /// Position of a tuple field named by index or by name.
    fn field_index(&self, recv_ty: TypeId, name: &str) -> Option<u32> {
        let prim = self.module.primitive(recv_ty);
        let fields = self.module.tuple_fields(prim)?;
        let offset = u32::from(matches!(self.module.kind(prim), TypeKind::EnumValue(_)));
        let index = match name.parse::<u32>() {
            Ok(index) => index.checked_add(offset)?,
            Err(_) => {
                let tuple = self.module.tuple(prim)?;
                u32::try_from(tuple.field_index(name)?).ok()?
            }
        };
        ((index as usize) < fields.len()).then_some(index)
    }

    fn static_member(
        &mut self,
        owner: TypeId,
        name: &str,
        callee: bool,
        span: Span,
    ) -> Result<(ExprKind, TypeId)> {
        let member = self.module.lookup_member(owner, name).at(span)?;
        Ok(match member {
            Some(Resolved::Type(TypeBinding::Type(ty))) => match self.module.kind(ty) {
                TypeKind::EnumValue(value) if !callee && value.payload().is_empty() => (
                    ExprKind::EnumInst {
                        variant: ty,
                        args: Vec::new(),
                    },
                    ty,
                ),
                _ => (ExprKind::Type(ty), TypeId::UNKNOWN),
            },
            Some(Resolved::Value(Binding::Func(func))) => (self.function_kind(func), TypeId::UNKNOWN),
            Some(Resolved::Value(Binding::Overloads(set))) => {
                (ExprKind::Overloads(set.to_vec()), TypeId::UNKNOWN)
            }
            Some(Resolved::Value(Binding::Const(id))) => {
                (ExprKind::Const(id), self.module.consts[id].ty)
            }
            Some(Resolved::Value(Binding::Var(_)) | Resolved::Type(TypeBinding::Template(_)))
            | None => {
                return Err(CompileError::unimplemented_member(
                    self.module.display_type(owner),
                    name,
                    span,
                ))
            }
        })
    }

    fn resolve_call(&mut self, expr: &mut Expr) -> Result<()> {
        let span = expr.span;
        let ExprKind::Call { callee, args } = &mut expr.kind else {
            return Ok(());
        };
        let (candidates, recv) = match &mut callee.kind {
            ExprKind::Func(func) | ExprKind::Macro(func) => (vec![*func], None),
            ExprKind::Overloads(set) => (set.clone(), None),
            ExprKind::BoundMethod { candidates, recv } => (candidates.clone(), Some(recv.take())),
            ExprKind::Type(ty) => {
                let ty = *ty;
                let (kind, result) = self.construct(ty, std::mem::take(args), span)?;
                expr.kind = kind;
                expr.ty = result;
                return Ok(());
            }
            // The callee itself was deferred.
            ExprKind::Attr { .. } | ExprKind::Index { .. } | ExprKind::Call { .. } => {
                return Ok(())
            }
            other => {
                return Err(CompileError::type_mismatch(
                    "a function",
                    other.describe(),
                    callee.span,
                ))
            }
        };

        let bound = recv.is_some();
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.extend(recv);
        full_args.append(args);
        let Some(func) = self.select(&candidates, &full_args, span)? else {
            // Put the receiver back for a later retry.
            if bound {
                if let ExprKind::BoundMethod { recv, .. } = &mut callee.kind {
                    **recv = full_args.remove(0);
                }
            }
            *args = full_args;
            return Ok(());
        };
        expr.ty = self.module.funcs[func].ret;
        expr.kind = call_kind(self.module, func, full_args);
        Ok(())
    }

    /// Pick the overload that fits `args` best. `None` defers the choice.
    fn select(&self, candidates: &[FuncId], args: &[Expr], span: Span) -> Result<Option<FuncId>> {
        let mut best: Vec<FuncId> = Vec::new();
        let mut best_score = 0;
        for &func in candidates {
            let params = &self.module.funcs[func].params;
            if params.len() != args.len() {
                continue;
            }
            let mut score = 0;
            let mut fits = true;
            for (&param, arg) in params.iter().zip(args) {
                match fit(self.module, self.options, self.module.vars[param].ty, arg.ty) {
                    Some(s) => score += s,
                    None => {
                        fits = false;
                        break;
                    }
                }
            }
            if !fits {
                continue;
            }
            if best.is_empty() || score > best_score {
                best = vec![func];
                best_score = score;
            } else if score == best_score {
                best.push(func);
            }
        }

        let pending = args.iter().any(|arg| arg.ty.is_unknown());
        let name = candidates
            .first()
            .map_or_else(String::new, |&func| self.module.funcs[func].name.clone());
        match best.as_slice() {
            [] if pending && !self.strict => {
                tracing::debug!(%name, "deferring overload resolution");
                Ok(None)
            }
            [] => Err(self.no_overload(candidates, args, &name, span)),
            [only] => Ok(Some(*only)),
            [_, ..] if pending && !self.strict => {
                tracing::debug!(%name, candidates = best.len(), "deferring ambiguous overload");
                Ok(None)
            }
            [first, ..] => match self.options.overload_policy {
                OverloadPolicy::FirstDeclared => Ok(Some(*first)),
                OverloadPolicy::Strict => Err(CompileError::AmbiguousReference {
                    name,
                    reason: format!(
                        "{} overloads accept ({})",
                        best.len(),
                        self.display_args(args)
                    ),
                    span: Some(span),
                }),
            },
        }
    }

    fn display_args(&self, args: &[Expr]) -> String {
        args.iter()
            .map(|arg| self.module.display_type(arg.ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn no_overload(&self, candidates: &[FuncId], args: &[Expr], name: &str, span: Span) -> CompileError {
        if let [func] = candidates {
            let params = &self.module.funcs[*func].params;
            if params.len() == args.len() {
                for (&param, arg) in params.iter().zip(args) {
                    let expected = self.module.vars[param].ty;
                    if fit(self.module, self.options, expected, arg.ty).is_none() {
                        return CompileError::type_mismatch(
                            self.module.display_type(expected),
                            self.module.display_type(arg.ty),
                            arg.span.or(span),
                        );
                    }
                }
            } else {
                return CompileError::type_mismatch(
                    format!("{} argument(s) for `{name}`", params.len()),
                    format!("{}", args.len()),
                    span,
                );
            }
        }
        CompileError::type_mismatch(
            format!("arguments accepted by `{name}`"),
            format!("({})", self.display_args(args)),
            span,
        )
    }

    /// `T(args)`: build a value of type `ty`.
    fn construct(&self, ty: TypeId, args: Vec<Expr>, span: Span) -> Result<(ExprKind, TypeId)> {
        let prim = self.module.primitive(ty);
        let arity = |expected: usize| -> Result<()> {
            if expected == args.len() {
                Ok(())
            } else {
                Err(CompileError::type_mismatch(
                    format!("{expected} field(s) for `{}`", self.module.display_type(ty)),
                    format!("{}", args.len()),
                    span,
                ))
            }
        };
        match self.module.kind(prim) {
            TypeKind::Tuple(tuple) => {
                arity(tuple.fields.len())?;
                Ok((ExprKind::TupleInst { fields: args }, ty))
            }
            TypeKind::EnumValue(value) => {
                arity(value.payload().len())?;
                Ok((ExprKind::EnumInst { variant: prim, args }, ty))
            }
            TypeKind::Native(_) => {
                arity(1)?;
                let mut args = args;
                let inner = args.pop().map(Box::new).ok_or_else(|| {
                    CompileError::internal("conversion without argument", span)
                })?;
                Ok((ExprKind::Retag(inner), ty))
            }
            _ => Err(CompileError::type_mismatch(
                "a constructible type",
                format!("`{}`", self.module.display_type(ty)),
                span,
            )),
        }
    }

    fn resolve_index(&mut self, expr: &mut Expr) -> Result<()> {
        let span = expr.span;
        let ExprKind::Index { obj, index } = &mut expr.kind else {
            return Ok(());
        };
        let Some(recv_ty) = self.receiver_type(obj)? else {
            return Ok(());
        };
        let mut args = vec![obj.take(), index.take()];
        match self.index_method(recv_ty, "[]", &args, span)? {
            IndexTarget::Method(func) => {
                expr.ty = self.module.funcs[func].ret;
                expr.kind = call_kind(self.module, func, args);
            }
            IndexTarget::Native(elem) => {
                let index = Box::new(args.pop().unwrap_or_else(|| Expr::nop(span)));
                let obj = Box::new(args.pop().unwrap_or_else(|| Expr::nop(span)));
                expr.kind = ExprKind::GetItem { obj, index };
                expr.ty = elem;
            }
            IndexTarget::Deferred => {
                let index = Box::new(args.pop().unwrap_or_else(|| Expr::nop(span)));
                let obj = Box::new(args.pop().unwrap_or_else(|| Expr::nop(span)));
                expr.kind = ExprKind::Index { obj, index };
            }
        }
        Ok(())
    }

    /// How `recv[..]` is implemented: by the user method `op`, or natively.
    fn index_method(
        &self,
        recv_ty: TypeId,
        op: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<IndexTarget> {
        let candidates = match self.module.lookup_member(recv_ty, op).at(span)? {
            Some(Resolved::Value(Binding::Func(func))) => vec![func],
            Some(Resolved::Value(Binding::Overloads(set))) => set.to_vec(),
            _ => Vec::new(),
        };
        if !candidates.is_empty() {
            return Ok(match self.select(&candidates, args, span)? {
                Some(func) => IndexTarget::Method(func),
                None => IndexTarget::Deferred,
            });
        }
        match self.module.kind(self.module.primitive(recv_ty)) {
            TypeKind::NativeArray(elem) => Ok(IndexTarget::Native(*elem)),
            _ => Err(CompileError::unimplemented_member(
                self.module.display_type(recv_ty),
                op,
                span,
            )),
        }
    }

    fn resolve_assign(&mut self, expr: &mut Expr) -> Result<()> {
        let span = expr.span;
        let ExprKind::Assign { target, value } = &mut expr.kind else {
            return Ok(());
        };
        match &mut target.kind {
            ExprKind::Var(var) => {
                expr.kind = ExprKind::SetLocal {
                    var: *var,
                    value: Box::new(value.take()),
                };
            }
            ExprKind::Attr { obj, name } => {
                let Some(recv_ty) = self.receiver_type(obj)? else {
                    return Ok(());
                };
                let Some(index) = self.field_index(recv_ty, name) else {
                    return Err(CompileError::unimplemented_member(
                        self.module.display_type(recv_ty),
                        name.clone(),
                        target.span,
                    ));
                };
                expr.kind = ExprKind::SetField {
                    obj: Box::new(obj.take()),
                    index,
                    value: Box::new(value.take()),
                };
            }
            ExprKind::GetField { obj, index } => {
                expr.kind = ExprKind::SetField {
                    obj: Box::new(obj.take()),
                    index: *index,
                    value: Box::new(value.take()),
                };
            }
            ExprKind::Index { obj, index } | ExprKind::GetItem { obj, index } => {
                let Some(recv_ty) = self.receiver_type(obj)? else {
                    return Ok(());
                };
                let args = vec![obj.take(), index.take(), value.take()];
                match self.index_method(recv_ty, "[]=", &args, span)? {
                    IndexTarget::Method(func) => {
                        expr.ty = self.module.funcs[func].ret;
                        expr.kind = call_kind(self.module, func, args);
                        return Ok(());
                    }
                    IndexTarget::Native(_) => {
                        let [obj, index, value] = boxed3(args, span);
                        expr.kind = ExprKind::SetItem { obj, index, value };
                    }
                    IndexTarget::Deferred => {
                        let [obj, index, value] = boxed3(args, span);
                        expr.kind = ExprKind::Assign {
                            target: Box::new(Expr::untyped(ExprKind::Index { obj, index }, target.span)),
                            value,
                        };
                        return Ok(());
                    }
                }
            }
            other => {
                return Err(CompileError::type_mismatch(
                    "an assignable place",
                    other.describe(),
                    target.span,
                ))
            }
        }
        expr.ty = TypeId::VOID;
        Ok(())
    }

    /// Bind the variant patterns of a match whose scrutinee is now typed.
    pub(crate) fn resolve_patterns(&mut self, m: &mut Match) -> Result<()> {
        let scrutinee_ty = m.scrutinee.ty;
        for case in &mut m.cases {
            if let Pattern::Variant { variant: None, .. } = case.pattern {
                self.resolve_pattern(scrutinee_ty, &mut case.pattern, case.span)?;
            }
        }
        Ok(())
    }

    /// Bind a variant pattern to the scrutinee's enum and type its variables.
    fn resolve_pattern(&mut self, scrutinee_ty: TypeId, pattern: &mut Pattern, span: Span) -> Result<()> {
        let Pattern::Variant {
            name,
            variant,
            bindings,
        } = pattern
        else {
            return self.visit_pattern(pattern);
        };
        let Some(recv_ty) = self.known_type(scrutinee_ty, "match scrutinee", span)? else {
            return Ok(());
        };
        let Some(enum_) = self.module.enum_of(recv_ty) else {
            return Err(CompileError::type_mismatch(
                "an enum scrutinee for a variant pattern",
                self.module.display_type(recv_ty),
                span,
            ));
        };
        let found = self
            .module
            .kind(enum_)
            .scope()
            .and_then(|scope| self.module.scopes[scope].type_(name));
        let Some(TypeBinding::Type(ty)) = found else {
            return Err(CompileError::unimplemented_member(
                self.module.display_type(enum_),
                name.clone(),
                span,
            ));
        };
        let TypeKind::EnumValue(value) = self.module.kind(ty) else {
            return Err(CompileError::unimplemented_member(
                self.module.display_type(enum_),
                name.clone(),
                span,
            ));
        };
        let payload = value.payload().to_vec();
        if payload.len() != bindings.len() {
            return Err(CompileError::type_mismatch(
                format!("{} binding(s) for `{}`", payload.len(), self.module.display_type(ty)),
                format!("{}", bindings.len()),
                span,
            ));
        }
        for (binding, field) in bindings.iter().zip(payload) {
            if let Some(var) = binding {
                if self.module.vars[*var].ty.is_unknown() {
                    self.module.vars[*var].ty = field;
                }
            }
        }
        *variant = Some(ty);
        Ok(())
    }
}

enum IndexTarget {
    Method(FuncId),
    Native(TypeId),
    Deferred,
}

fn call_kind(module: &Module, func: FuncId, args: Vec<Expr>) -> ExprKind {
    if module.funcs[func].is_macro() {
        ExprKind::MacroCall { mac: func, args }
    } else {
        ExprKind::FunctionCall { func, args }
    }
}

fn boxed3(args: Vec<Expr>, span: Span) -> [Box<Expr>; 3] {
    let mut it = args.into_iter().map(Box::new);
    let mut next = || it.next().unwrap_or_else(|| Box::new(Expr::nop(span)));
    [next(), next(), next()]
}

impl MutVisitor for Resolver<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        gi_stack::ensure_sufficient_stack(|| {
            match &mut expr.kind {
                ExprKind::Call { callee, args } => {
                    walk_body_mut(self, args)?;
                    if let ExprKind::Attr { obj, .. } = &mut callee.kind {
                        self.visit_expr(obj)?;
                        self.resolve_attr(callee, true)?;
                    } else {
                        self.visit_expr(callee)?;
                    }
                }
                ExprKind::Assign { target, value } => {
                    self.visit_expr(value)?;
                    self.visit_place(target)?;
                }
                ExprKind::Match(m) => {
                    self.visit_expr(&mut m.scrutinee)?;
                    let scrutinee_ty = m.scrutinee.ty;
                    for case in &mut m.cases {
                        self.resolve_pattern(scrutinee_ty, &mut case.pattern, case.span)?;
                        self.visit_body(&mut case.body)?;
                    }
                }
                _ => walk_expr_mut(self, expr)?,
            }
            self.resolve_node(expr)
        })
    }
}
