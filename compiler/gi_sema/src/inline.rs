//! Pass 11: macro inlining.
//!
//! Every `MacroCall` is replaced by a copy of the macro's body:
//!
//! - parameters are replaced by the call's arguments. An argument that is
//!   not a plain variable, constant or integer, or a parameter the body
//!   assigns to, is first stored in a local so it is evaluated once;
//! - the macro's locals are re-homed into the calling function under
//!   `macro.name` local names, fresh for every call site;
//! - every label the body defines is re-minted;
//! - `return v` becomes a `break` out of a block wrapping the copy, which
//!   is typed as the macro's return type.
//!
//! The copy is then analyzed in place with the caller's types known
//! (member resolution, type propagation, drops, match specialization and
//! enum lowering) and inlined again, since macros may call macros.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::visitor::{walk_expr, walk_expr_mut, walk_pattern_mut, MutVisitor, Visitor};
use gi_ir::{
    Expr, ExprKind, FuncId, LabelId, Module, Pattern, ScopeId, Span, TypeId, VarId, VarKind,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bodies::{for_each_body, Bodies};
use crate::resolve::Resolver;
use crate::typing::TypePropagator;
use crate::{drops, enums, matches, CompileOptions};

/// Nested expansions allowed below one call site.
const MAX_DEPTH: usize = 64;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn inline_macros(mut module: Module, options: &CompileOptions) -> Result<Module> {
    for_each_body(&mut module, Bodies::Functions, |module, func, body| {
        let mut inliner = Inliner {
            scope: module.funcs[func].scope,
            ret: module.funcs[func].ret,
            module,
            options,
            depth: 0,
        };
        inliner.visit_body(body)
    })?;
    Ok(module)
}

struct Inliner<'m> {
    module: &'m mut Module,
    options: &'m CompileOptions,
    /// Function scope of the caller, which receives re-homed locals.
    scope: ScopeId,
    ret: TypeId,
    depth: usize,
}

impl MutVisitor for Inliner<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        walk_expr_mut(self, expr)?;
        let ExprKind::MacroCall { mac, args } = &mut expr.kind else {
            return Ok(());
        };
        let (mac, args) = (*mac, std::mem::take(args));
        *expr = self.expand(mac, args, expr.ty, expr.span)?;
        Ok(())
    }
}

impl Inliner<'_> {
    fn expand(&mut self, mac: FuncId, args: Vec<Expr>, ty: TypeId, span: Span) -> Result<Expr> {
        let def = &self.module.funcs[mac];
        if self.depth >= MAX_DEPTH {
            return Err(CompileError::RecursiveMacro {
                name: def.name.clone(),
                span: Some(span),
            });
        }
        let Some(body) = def.lowered_body() else {
            return Err(CompileError::internal(
                format!("macro `{}` has no translated body", def.name),
                span,
            ));
        };
        let (name, params, locals) = (def.name.clone(), def.params.clone(), def.locals.clone());
        let mut body = body.to_vec();
        tracing::debug!(%name, depth = self.depth, "inlining macro");

        let exit = self.module.fresh_label();
        let mut substitute = Substitute {
            module: &mut *self.module,
            params: FxHashMap::default(),
            vars: FxHashMap::default(),
            labels: FxHashMap::default(),
            exit,
        };

        let assigned = assigned_vars(&body);
        let mut prelude = Vec::new();
        for (param, arg) in params.into_iter().zip(args) {
            if is_trivial(&arg) && !assigned.contains(&param) {
                substitute.params.insert(param, arg);
                continue;
            }
            let local = rehome(substitute.module, self.scope, &name, param, arg.span)?;
            substitute.vars.insert(param, local);
            prelude.push(Expr::new(
                ExprKind::SetLocal {
                    var: local,
                    value: Box::new(arg),
                },
                TypeId::VOID,
                span,
            ));
        }
        for local in locals {
            let rehomed = rehome(substitute.module, self.scope, &name, local, span)?;
            substitute.vars.insert(local, rehomed);
        }
        substitute.visit_body(&mut body)?;

        prelude.append(&mut body);
        let mut fragment = Expr::new(
            ExprKind::Block {
                label: exit,
                body: prelude,
            },
            ty,
            span,
        );
        self.analyze(&mut fragment)?;

        self.depth += 1;
        let nested = self.visit_expr(&mut fragment);
        self.depth -= 1;
        nested?;

        Ok(simplify_exit(fragment))
    }

    /// Run the body passes over a freshly substituted fragment.
    fn analyze(&mut self, fragment: &mut Expr) -> Result<()> {
        Resolver::new(&mut *self.module, self.options, true).visit_expr(fragment)?;
        let expected = fragment.ty;
        TypePropagator::new(&mut *self.module, self.options, self.ret)
            .propagate(fragment, Some(expected))?;
        drops::drop_unused(self.module, fragment)?;
        matches::specialize(self.module, self.scope, std::slice::from_mut(fragment))?;
        enums::lower_enum_insts(self.module, std::slice::from_mut(fragment))
    }
}

/// Substitutable without changing how often it is evaluated.
fn is_trivial(arg: &Expr) -> bool {
    matches!(
        arg.kind,
        ExprKind::Int(_) | ExprKind::Var(_) | ExprKind::Const(_) | ExprKind::Nop
    )
}

/// A fresh caller local standing for the macro variable `var`.
fn rehome(
    module: &mut Module,
    scope: ScopeId,
    macro_name: &str,
    var: VarId,
    span: Span,
) -> Result<VarId> {
    let decl = &module.vars[var];
    let (local_name, ty) = (format!("{macro_name}.{}", decl.name), decl.ty);
    let local = module.new_var(&local_name, ty, VarKind::Local, span);
    module.register_local(scope, &local_name, local).at(span)?;
    Ok(local)
}

/// Variables a body writes to.
fn assigned_vars(body: &[Expr]) -> FxHashSet<VarId> {
    struct Writes(FxHashSet<VarId>);

    impl<'ir> Visitor<'ir> for Writes {
        type Error = std::convert::Infallible;

        fn visit_expr(&mut self, expr: &'ir Expr) -> std::result::Result<(), Self::Error> {
            match &expr.kind {
                ExprKind::SetLocal { var, .. } => {
                    self.0.insert(*var);
                }
                ExprKind::Assign { target, .. } => {
                    if let ExprKind::Var(var) = target.kind {
                        self.0.insert(var);
                    }
                }
                _ => {}
            }
            walk_expr(self, expr)
        }
    }

    let mut writes = Writes(FxHashSet::default());
    for expr in body {
        writes.visit_expr(expr).unwrap_or_else(|never| match never {});
    }
    writes.0
}

/// Rewrites a copied macro body for one call site.
struct Substitute<'m> {
    module: &'m mut Module,
    params: FxHashMap<VarId, Expr>,
    vars: FxHashMap<VarId, VarId>,
    labels: FxHashMap<LabelId, LabelId>,
    exit: LabelId,
}

impl Substitute<'_> {
    fn label(&mut self, label: &mut LabelId) {
        let module = &mut *self.module;
        *label = *self
            .labels
            .entry(*label)
            .or_insert_with(|| module.fresh_label());
    }

    fn var(&self, var: &mut VarId) {
        if let Some(&rehomed) = self.vars.get(var) {
            *var = rehomed;
        }
    }
}

impl MutVisitor for Substitute<'_> {
    type Error = CompileError;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Var(var) => {
                if let Some(arg) = self.params.get(var) {
                    *expr = arg.clone();
                    return Ok(());
                }
                self.var(var);
            }
            ExprKind::SetLocal { var, .. } => self.var(var),
            ExprKind::Return(value) => {
                expr.kind = ExprKind::Break {
                    label: self.exit,
                    value: value.take(),
                };
            }
            ExprKind::Block { label, .. } | ExprKind::Loop { label, .. } => self.label(label),
            ExprKind::Break { label, .. } => self.label(label),
            ExprKind::MatchEnum(m) => {
                self.var(&mut m.tmp);
                self.label(&mut m.label);
                self.label(&mut m.default_label);
                for arm in &mut m.arms {
                    self.label(&mut arm.label);
                    for (var, _) in &mut arm.bindings {
                        self.var(var);
                    }
                }
            }
            ExprKind::MatchInt(m) => {
                self.var(&mut m.tmp);
                self.label(&mut m.label);
            }
            _ => {}
        }
        walk_expr_mut(self, expr)
    }

    fn visit_pattern(&mut self, pattern: &mut Pattern) -> Result<()> {
        if let Pattern::Variant { bindings, .. } = pattern {
            for var in bindings.iter_mut().flatten() {
                self.var(var);
            }
        }
        walk_pattern_mut(self, pattern)
    }
}

/// Drop the exit block when nothing needs it: a final `break` to it
/// becomes the block's value, and a block that is then a single
/// expression of its own type is replaced by that expression.
fn simplify_exit(mut fragment: Expr) -> Expr {
    let ExprKind::Block { label, body } = &mut fragment.kind else {
        return fragment;
    };
    let label = *label;
    let mut uses = count_breaks(body, label);
    if uses == 1 {
        let last = body.last_mut().map(|expr| &mut expr.kind);
        if let Some(ExprKind::Break { label: target, value }) = last {
            if *target == label && value.is_some() != (fragment.ty == TypeId::VOID) {
                match value.take() {
                    Some(value) => {
                        if let Some(last) = body.last_mut() {
                            *last = *value;
                        }
                    }
                    None => {
                        body.pop();
                    }
                }
                uses = 0;
            }
        }
    }
    if uses == 0 && body.len() == 1 && body[0].ty == fragment.ty {
        if let Some(single) = body.pop() {
            return single;
        }
    }
    fragment
}

fn count_breaks(body: &[Expr], label: LabelId) -> usize {
    struct Breaks {
        label: LabelId,
        count: usize,
    }

    impl<'ir> Visitor<'ir> for Breaks {
        type Error = std::convert::Infallible;

        fn visit_expr(&mut self, expr: &'ir Expr) -> std::result::Result<(), Self::Error> {
            if let ExprKind::Break { label, .. } = expr.kind {
                if label == self.label {
                    self.count += 1;
                }
            }
            walk_expr(self, expr)
        }
    }

    let mut breaks = Breaks { label, count: 0 };
    for expr in body {
        breaks.visit_expr(expr).unwrap_or_else(|never| match never {});
    }
    breaks.count
}
