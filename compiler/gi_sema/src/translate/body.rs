//! Statement and expression translation.
//!
//! Identifiers resolve through the scope chain into variable, function,
//! macro, constant or type references. Operators become calls of the
//! operator-named function in the root scope. A singleton tuple is just
//! grouping, and `while` becomes a `Loop` with its own exit label. Nested
//! blocks open child scopes, but every local is hoisted into the enclosing
//! function scope.
//!
//! Nothing is typed here beyond literal placeholders and declared `let`
//! types. Attribute access, calls and indexing stay unresolved for pass 5.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::ast::{self, StmtKind};
use gi_ir::{
    AsmTerm, Binding, Expr, ExprKind, Match, MatchCase, Module, Pattern, Resolved, ScopeId, Span,
    TypeBinding, TypeId, VarKind,
};

use super::translate_type_expr;

pub(crate) struct BodyTranslator<'m> {
    module: &'m mut Module,
    scope: ScopeId,
}

impl<'m> BodyTranslator<'m> {
    pub(crate) fn new(module: &'m mut Module, scope: ScopeId) -> Self {
        BodyTranslator { module, scope }
    }

    pub(crate) fn stmts(&mut self, stmts: &[ast::Stmt]) -> Result<Vec<Expr>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// Translate `stmts` in a fresh child scope named `base`.
    fn block(&mut self, base: &str, stmts: &[ast::Stmt]) -> Result<Vec<Expr>> {
        let saved = self.scope;
        self.scope = self.module.new_scope(saved, base, None);
        let result = self.stmts(stmts);
        self.scope = saved;
        result
    }

    fn stmt(&mut self, stmt: &ast::Stmt, out: &mut Vec<Expr>) -> Result<()> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Let { name, ty, init } => {
                let ty = match ty {
                    Some(ty) => translate_type_expr(self.module, self.scope, ty)?,
                    None => TypeId::UNKNOWN,
                };
                // The initializer sees the previous binding of `name`.
                let value = init.as_ref().map(|init| self.expr(init)).transpose()?;
                let var = self.module.new_var(name, ty, VarKind::Local, span);
                self.module.register_local(self.scope, name, var).at(span)?;
                if let Some(value) = value {
                    out.push(Expr::new(
                        ExprKind::SetLocal {
                            var,
                            value: Box::new(value),
                        },
                        TypeId::VOID,
                        span,
                    ));
                }
            }
            StmtKind::Assign { target, value } => {
                let target = self.expr(target)?;
                let value = Box::new(self.expr(value)?);
                let kind = match target.kind {
                    ExprKind::Var(var) => ExprKind::SetLocal { var, value },
                    _ => ExprKind::Assign {
                        target: Box::new(target),
                        value,
                    },
                };
                out.push(Expr::new(kind, TypeId::VOID, span));
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond = Box::new(self.expr(cond)?);
                let then_body = self.block("__if", then_body)?;
                let else_body = self.block("__else", else_body)?;
                out.push(Expr::untyped(
                    ExprKind::If {
                        cond,
                        then_body,
                        else_body,
                    },
                    span,
                ));
            }
            StmtKind::While { cond, body } => {
                let cond = Box::new(self.expr(cond)?);
                let body = self.block("__while", body)?;
                let label = self.module.fresh_label();
                out.push(Expr::new(
                    ExprKind::Loop { label, cond, body },
                    TypeId::VOID,
                    span,
                ));
            }
            StmtKind::Match { scrutinee, cases } => {
                let scrutinee = Box::new(self.expr(scrutinee)?);
                let mut translated = Vec::with_capacity(cases.len());
                for case in cases {
                    translated.push(self.case(case)?);
                }
                out.push(Expr::untyped(
                    ExprKind::Match(Match {
                        scrutinee,
                        cases: translated,
                    }),
                    span,
                ));
            }
            StmtKind::Return(value) => {
                let value = value
                    .as_ref()
                    .map(|value| self.expr(value).map(Box::new))
                    .transpose()?;
                out.push(Expr::new(ExprKind::Return(value), TypeId::VOID, span));
            }
            StmtKind::Expr(expr) => out.push(self.expr(expr)?),
        }
        Ok(())
    }

    fn case(&mut self, case: &ast::MatchCase) -> Result<MatchCase> {
        let saved = self.scope;
        self.scope = self.module.new_scope(saved, "__case", None);
        let result = self.case_in_scope(case);
        self.scope = saved;
        result
    }

    fn case_in_scope(&mut self, case: &ast::MatchCase) -> Result<MatchCase> {
        let pattern = match &case.pattern {
            ast::Pattern::Wildcard => Pattern::Wildcard,
            ast::Pattern::Variant { name, bindings } => {
                let mut vars = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    vars.push(match binding {
                        Some(binding) => {
                            let var = self.module.new_var(
                                binding,
                                TypeId::UNKNOWN,
                                VarKind::Local,
                                case.span,
                            );
                            self.module
                                .register_local(self.scope, binding, var)
                                .at(case.span)?;
                            Some(var)
                        }
                        None => None,
                    });
                }
                Pattern::Variant {
                    name: name.clone(),
                    variant: None,
                    bindings: vars,
                }
            }
            ast::Pattern::Value(expr) => Pattern::Value(self.expr(expr)?),
        };
        let body = self.stmts(&case.body)?;
        Ok(MatchCase {
            pattern,
            body,
            span: case.span,
        })
    }

    pub(crate) fn expr(&mut self, expr: &ast::Expr) -> Result<Expr> {
        gi_stack::ensure_sufficient_stack(|| self.expr_inner(expr))
    }

    fn expr_inner(&mut self, expr: &ast::Expr) -> Result<Expr> {
        let span = expr.span;
        let kind = match &expr.kind {
            ast::ExprKind::Int(value) => {
                return Ok(Expr::new(ExprKind::Int(*value), TypeId::INT_LITERAL, span))
            }
            ast::ExprKind::Str(value) => {
                return Ok(Expr::new(
                    ExprKind::Str(value.clone()),
                    TypeId::STR_LITERAL,
                    span,
                ))
            }
            ast::ExprKind::Ident(name) => {
                let resolved = self.module.lookup(self.scope, name).at(span)?;
                self.reference(name, resolved, span)?
            }
            ast::ExprKind::Tuple(items) => match items.as_slice() {
                [] => return Ok(Expr::nop(span)),
                [single] => return self.expr(single),
                _ => ExprKind::TupleInst {
                    fields: self.exprs(items)?,
                },
            },
            ast::ExprKind::Call { callee, args } => ExprKind::Call {
                callee: Box::new(self.expr(callee)?),
                args: self.exprs(args)?,
            },
            ast::ExprKind::Attr { obj, name } => ExprKind::Attr {
                obj: Box::new(self.expr(obj)?),
                name: name.clone(),
            },
            ast::ExprKind::Index { obj, index } => ExprKind::Index {
                obj: Box::new(self.expr(obj)?),
                index: Box::new(self.expr(index)?),
            },
            ast::ExprKind::Binary { op, lhs, rhs } => ExprKind::Call {
                callee: Box::new(self.operator(op, span)?),
                args: vec![self.expr(lhs)?, self.expr(rhs)?],
            },
            ast::ExprKind::Unary { op, operand } => ExprKind::Call {
                callee: Box::new(self.operator(op, span)?),
                args: vec![self.expr(operand)?],
            },
            ast::ExprKind::TypeApply { name, args } => {
                let apply = ast::TypeExpr {
                    kind: ast::TypeExprKind::Apply {
                        name: name.clone(),
                        args: args.clone(),
                    },
                    span,
                };
                ExprKind::Type(translate_type_expr(self.module, self.scope, &apply)?)
            }
            ast::ExprKind::Asm(asm) => ExprKind::Asm(self.asm_terms(&asm.terms)?),
        };
        Ok(Expr::untyped(kind, span))
    }

    fn exprs(&mut self, exprs: &[ast::Expr]) -> Result<Vec<Expr>> {
        exprs.iter().map(|expr| self.expr(expr)).collect()
    }

    /// The function bound to an operator in the root scope.
    fn operator(&mut self, op: &str, span: Span) -> Result<Expr> {
        let root = self.module.root;
        let resolved = self.module.lookup(root, op).at(span)?;
        let kind = self.reference(op, resolved, span)?;
        Ok(Expr::untyped(kind, span))
    }

    fn reference(&self, name: &str, resolved: Resolved, span: Span) -> Result<ExprKind> {
        Ok(match resolved {
            Resolved::Value(Binding::Var(var)) => ExprKind::Var(var),
            Resolved::Value(Binding::Func(func)) if self.module.funcs[func].is_macro() => {
                ExprKind::Macro(func)
            }
            Resolved::Value(Binding::Func(func)) => ExprKind::Func(func),
            Resolved::Value(Binding::Overloads(set)) => ExprKind::Overloads(set.to_vec()),
            Resolved::Value(Binding::Const(id)) => ExprKind::Const(id),
            Resolved::Type(TypeBinding::Type(ty)) => ExprKind::Type(ty),
            Resolved::Type(TypeBinding::Template(_)) => {
                return Err(CompileError::type_mismatch(
                    format!("type arguments for template `{name}`"),
                    "a bare template name",
                    span,
                ))
            }
        })
    }

    pub(crate) fn asm_terms(&mut self, terms: &[ast::AsmTerm]) -> Result<Vec<AsmTerm>> {
        terms
            .iter()
            .map(|term| {
                Ok(match term {
                    ast::AsmTerm::Atom(atom) => AsmTerm::Atom(atom.clone()),
                    ast::AsmTerm::Int(value) => AsmTerm::Int(*value),
                    ast::AsmTerm::Str(value) => AsmTerm::Str(value.clone()),
                    ast::AsmTerm::List(items) => AsmTerm::List(self.asm_terms(items)?),
                    ast::AsmTerm::Expr(expr) => AsmTerm::Expr(self.expr(expr)?),
                })
            })
            .collect()
    }
}
