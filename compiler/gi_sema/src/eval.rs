//! Compile-time evaluation of integer expressions.
//!
//! Constant initializers and `case` values are reduced to an `i64` here.
//! Besides literals and other constants, the evaluator runs macro calls
//! with compile-time arguments: the macro's body is executed with its
//! parameters bound. Inline assembly inside it becomes a one-function host
//! module, with every `{expr}` splice replaced by its value as a constant,
//! and runs on `wasmtime` through [`gi_wasm::host`].
//!
//! `i32` results are sign-extended, so a value computed here matches what
//! the target computes at run time.

use gi_diagnostic::{CompileError, Result};
use gi_ir::{AsmTerm, ConstInit, Expr, ExprKind, FuncId, Module, Span, TypeId, VarId};
use gi_wasm::Term;
use rustc_hash::FxHashMap;

/// Nested macro calls allowed in one evaluation.
const MAX_DEPTH: usize = 64;

/// Evaluate `expr` to an integer at compile time.
pub(crate) fn const_value(module: &Module, expr: &Expr) -> Result<i64> {
    Evaluator {
        module,
        env: FxHashMap::default(),
        result: None,
        depth: 0,
    }
    .eval(expr)
}

struct Evaluator<'m> {
    module: &'m Module,
    env: FxHashMap<VarId, i64>,
    /// Integer type the macro being evaluated returns.
    result: Option<&'static str>,
    depth: usize,
}

/// How a macro body statement left control.
enum Flow {
    Next(Option<i64>),
    Return(i64),
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> Result<i64> {
        gi_stack::ensure_sufficient_stack(|| self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<i64> {
        let module = self.module;
        match &expr.kind {
            ExprKind::Int(value) => Ok(*value),
            ExprKind::Retag(inner) => self.eval(inner),
            ExprKind::Var(var) => self.env.get(var).copied().ok_or_else(|| {
                CompileError::const_eval(
                    format!("`{}` is not known at compile time", module.vars[*var].name),
                    expr.span,
                )
            }),
            ExprKind::Const(id) => {
                let def = &module.consts[*id];
                match (&def.value, &def.init) {
                    (Some(value), _) => Ok(*value),
                    (None, ConstInit::Lowered(init)) => {
                        self.nested(|this| this.eval(init), expr.span)
                    }
                    (None, ConstInit::Pending(_)) => Err(CompileError::const_eval(
                        format!("constant `{}` is not translated yet", def.name),
                        expr.span,
                    )),
                }
            }
            ExprKind::MacroCall { mac, args } => self.call(*mac, args, expr.span),
            ExprKind::Call { callee, args } => {
                let mac = self.callee_macro(callee, args.len())?;
                self.call(mac, args, expr.span)
            }
            ExprKind::Block { body, .. } => match self.run(body)? {
                Flow::Next(Some(value)) | Flow::Return(value) => Ok(value),
                Flow::Next(None) => Err(self.no_value(expr)),
            },
            ExprKind::Asm(terms) => self.asm(terms, expr),
            _ => Err(self.no_value(expr)),
        }
    }

    fn no_value(&self, expr: &Expr) -> CompileError {
        CompileError::const_eval(
            format!("a {} has no compile-time value", expr.kind.describe()),
            expr.span,
        )
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>, span: Span) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(CompileError::const_eval("evaluation nests too deeply", span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// The macro an unresolved callee names, picking by arity from an
    /// overload set.
    fn callee_macro(&self, callee: &Expr, arity: usize) -> Result<FuncId> {
        let found = match &callee.kind {
            ExprKind::Macro(mac) => Some(*mac),
            ExprKind::Func(func) if self.module.funcs[*func].is_macro() => Some(*func),
            ExprKind::Overloads(set) => set.iter().copied().find(|&func| {
                let def = &self.module.funcs[func];
                def.is_macro() && def.params.len() == arity
            }),
            _ => None,
        };
        found.ok_or_else(|| {
            CompileError::const_eval(
                format!("calling a {} is not possible at compile time", callee.kind.describe()),
                callee.span,
            )
        })
    }

    fn call(&mut self, mac: FuncId, args: &[Expr], span: Span) -> Result<i64> {
        let module = self.module;
        let def = &module.funcs[mac];
        if !def.is_macro() {
            return Err(CompileError::const_eval(
                format!("`{}` is a runtime function", def.name),
                span,
            ));
        }
        let Some(body) = def.lowered_body() else {
            return Err(CompileError::const_eval(
                format!("macro `{}` has no translated body", def.name),
                span,
            ));
        };
        if args.len() != def.params.len() {
            return Err(CompileError::const_eval(
                format!("macro `{}` takes {} argument(s)", def.name, def.params.len()),
                span,
            ));
        }
        let mut frame = FxHashMap::default();
        for (&param, arg) in def.params.iter().zip(args) {
            frame.insert(param, self.eval(arg)?);
        }
        tracing::trace!(name = %def.name, "evaluating macro call");

        let saved = std::mem::replace(&mut self.env, frame);
        let saved_result = std::mem::replace(&mut self.result, int_type(module, def.ret));
        let result = self.nested(|this| this.run(body), span);
        self.env = saved;
        self.result = saved_result;
        match result? {
            Flow::Next(Some(value)) | Flow::Return(value) => Ok(value),
            Flow::Next(None) => Err(CompileError::const_eval(
                format!("macro `{}` produces no value", def.name),
                span,
            )),
        }
    }

    /// Execute a body, yielding its last value or the value it returned.
    fn run(&mut self, body: &[Expr]) -> Result<Flow> {
        let mut last = None;
        for stmt in body {
            last = match &stmt.kind {
                ExprKind::Return(Some(value)) => return Ok(Flow::Return(self.eval(value)?)),
                ExprKind::SetLocal { var, value } => {
                    let value = self.eval(value)?;
                    self.env.insert(*var, value);
                    None
                }
                ExprKind::Assign { target, value } => match &target.kind {
                    ExprKind::Var(var) => {
                        let value = self.eval(value)?;
                        self.env.insert(*var, value);
                        None
                    }
                    _ => return Err(self.no_value(stmt)),
                },
                ExprKind::Drop(inner) => {
                    self.eval(inner)?;
                    None
                }
                _ => Some(self.eval(stmt)?),
            };
        }
        Ok(Flow::Next(last))
    }

    /// Run an assembly block on the engine.
    fn asm(&mut self, terms: &[AsmTerm], expr: &Expr) -> Result<i64> {
        let Some(result) = int_type(self.module, expr.ty).or(self.result) else {
            return Err(CompileError::const_eval(
                "inline assembly must produce an i32 or i64",
                expr.span,
            ));
        };
        let mut body = Vec::with_capacity(terms.len());
        for term in terms {
            body.extend(self.host_terms(term, result)?);
        }
        gi_wasm::host::evaluate(result, body, expr.span)
    }

    /// `term` with its splices evaluated to constants. A splice whose type
    /// is not an integer native takes `fallback`.
    fn host_terms(&mut self, term: &AsmTerm, fallback: &'static str) -> Result<Vec<Term>> {
        Ok(match term {
            AsmTerm::Atom(atom) => vec![Term::atom(atom.as_str())],
            AsmTerm::Int(value) => vec![Term::Int(*value)],
            AsmTerm::Str(text) => vec![Term::Str(text.clone())],
            AsmTerm::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.extend(self.host_terms(item, fallback)?);
                }
                vec![Term::List(out)]
            }
            AsmTerm::Expr(expr) => {
                let native = self.splice_type(expr).unwrap_or(fallback);
                let value = self.eval(expr)?;
                let value = if native == "i32" {
                    i64::from(wrap32(value))
                } else {
                    value
                };
                vec![Term::constant(native, value)]
            }
        })
    }

    /// Declared type of a spliced expression, before typing has run on
    /// macro bodies.
    fn splice_type(&self, expr: &Expr) -> Option<&'static str> {
        let module = self.module;
        let declared = match &expr.kind {
            ExprKind::Var(var) => module.vars[*var].ty,
            ExprKind::Const(id) => module.consts[*id].ty,
            ExprKind::MacroCall { mac, .. } => module.funcs[*mac].ret,
            _ => expr.ty,
        };
        int_type(module, declared).or_else(|| int_type(module, expr.ty))
    }
}

/// `i32` or `i64` when `ty` is represented as that native.
fn int_type(module: &Module, ty: TypeId) -> Option<&'static str> {
    match module.native(ty)?.name.as_str() {
        "i32" => Some("i32"),
        "i64" => Some("i64"),
        _ => None,
    }
}

/// Wrap to the 32-bit two's-complement value `i32.const` accepts.
#[expect(
    clippy::cast_possible_truncation,
    reason = "i32 arithmetic wraps at 32 bits"
)]
fn wrap32(value: i64) -> i32 {
    value as i32
}
