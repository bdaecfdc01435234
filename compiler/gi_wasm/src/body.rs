//! Lowering of IR expressions to folded instructions.

use gi_diagnostic::{CompileError, Result};
use gi_ir::{AsmTerm, EnumArm, Expr, ExprKind, MatchEnum, MatchInt, Module, Span, TypeId};
use gi_stack::ensure_sufficient_stack;

use crate::names::{label, loop_label, mangle, symbol};
use crate::term::Term;
use crate::types::{reference, Types};

pub(crate) struct BodyGen<'a> {
    pub(crate) module: &'a Module,
    pub(crate) types: &'a Types<'a>,
}

impl BodyGen<'_> {
    /// A statement list whose value, if `result` is not void, is left on the
    /// stack. A list that ends without producing one (it returned or broke
    /// out on every path) is closed with `unreachable`.
    pub(crate) fn body(&self, body: &[Expr], result: TypeId, out: &mut Vec<Term>) -> Result<()> {
        for expr in body {
            self.expr(expr, out)?;
        }
        let produces = body.last().is_some_and(|last| !self.module.is_void(last.ty));
        if !self.module.is_void(result) && !produces {
            out.push(Term::instr("unreachable", []));
        }
        Ok(())
    }

    fn operands(&self, exprs: &[Expr]) -> Result<Vec<Term>> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            self.expr(expr, &mut out)?;
        }
        Ok(out)
    }

    fn operand(&self, expr: &Expr) -> Result<Vec<Term>> {
        self.operands(std::slice::from_ref(expr))
    }

    /// `(result t)` for a block-like node of type `ty`.
    fn block_type(&self, ty: TypeId, span: Span) -> Result<Option<Term>> {
        Ok(self
            .types
            .value_type(ty, span)?
            .map(|ty| Term::instr("result", [ty])))
    }

    fn local(&self, var: gi_ir::VarId) -> Term {
        Term::ident(&mangle(&self.module.vars[var].local_name))
    }

    pub(crate) fn expr(&self, expr: &Expr, out: &mut Vec<Term>) -> Result<()> {
        ensure_sufficient_stack(|| self.expr_inner(expr, out))
    }

    fn expr_inner(&self, expr: &Expr, out: &mut Vec<Term>) -> Result<()> {
        let module = self.module;
        let span = expr.span;
        let term = match &expr.kind {
            ExprKind::Int(value) => {
                let Some(native) = module.native(expr.ty) else {
                    return Err(CompileError::internal(
                        format!("integer of type {}", module.display_type(expr.ty)),
                        span,
                    ));
                };
                Term::constant(&native.name, *value)
            }
            ExprKind::Str(text) => {
                let name = self.types.representation(expr.ty, span)?;
                let mut items = vec![
                    Term::atom("array.new_fixed"),
                    Term::ident(&name),
                    Term::Int(i64::try_from(text.len()).unwrap_or(i64::MAX)),
                ];
                items.extend(text.bytes().map(|byte| Term::constant("i32", i64::from(byte))));
                Term::List(items)
            }
            ExprKind::Nop => return Ok(()),
            ExprKind::Var(var) => Term::instr("local.get", [self.local(*var)]),
            ExprKind::Const(id) => {
                Term::instr("global.get", [symbol(&module.consts[*id].symbol)])
            }
            ExprKind::FunctionCall { func, args } => {
                let mut items = vec![Term::atom("call"), symbol(&module.funcs[*func].symbol)];
                items.extend(self.operands(args)?);
                Term::List(items)
            }
            ExprKind::TupleInst { fields } => {
                let mut items = vec![
                    Term::atom("struct.new"),
                    Term::ident(&self.types.representation(expr.ty, span)?),
                ];
                items.extend(self.operands(fields)?);
                Term::List(items)
            }
            ExprKind::GetField { obj, index } => {
                let object = self.operand(obj)?;
                self.field_get(obj.ty, *index, object, span)?
            }
            ExprKind::SetField { obj, index, value } => {
                let mut items = vec![
                    Term::atom("struct.set"),
                    Term::ident(&self.types.representation(obj.ty, span)?),
                    Term::Int(i64::from(*index)),
                ];
                items.extend(self.operand(obj)?);
                items.extend(self.operand(value)?);
                Term::List(items)
            }
            ExprKind::GetItem { obj, index } => {
                let op = module
                    .element_type(obj.ty)
                    .and_then(|elem| module.native(elem))
                    .map_or("array.get", |native| packed_op(native, "array.get"));
                let mut items = vec![
                    Term::atom(op),
                    Term::ident(&self.types.representation(obj.ty, span)?),
                ];
                items.extend(self.operand(obj)?);
                items.extend(self.operand(index)?);
                Term::List(items)
            }
            ExprKind::SetItem { obj, index, value } => {
                let mut items = vec![
                    Term::atom("array.set"),
                    Term::ident(&self.types.representation(obj.ty, span)?),
                ];
                items.extend(self.operand(obj)?);
                items.extend(self.operand(index)?);
                items.extend(self.operand(value)?);
                Term::List(items)
            }
            ExprKind::SetLocal { var, value } => {
                let mut items = vec![Term::atom("local.set"), self.local(*var)];
                items.extend(self.operand(value)?);
                Term::List(items)
            }
            ExprKind::Retag(inner) => return self.expr(inner, out),
            ExprKind::Block { label: name, body } => {
                let mut items = vec![Term::atom("block"), label(*name)];
                items.extend(self.block_type(expr.ty, span)?);
                self.body(body, expr.ty, &mut items)?;
                Term::List(items)
            }
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let mut items = vec![Term::atom("if")];
                items.extend(self.block_type(expr.ty, span)?);
                items.extend(self.operand(cond)?);
                let mut then = vec![Term::atom("then")];
                self.body(then_body, expr.ty, &mut then)?;
                items.push(Term::List(then));
                if !else_body.is_empty() || !module.is_void(expr.ty) {
                    let mut else_ = vec![Term::atom("else")];
                    self.body(else_body, expr.ty, &mut else_)?;
                    items.push(Term::List(else_));
                }
                Term::List(items)
            }
            ExprKind::Loop {
                label: name,
                cond,
                body,
            } => {
                let mut exit = vec![Term::atom("br_if"), label(*name)];
                exit.push(Term::instr("i32.eqz", self.operand(cond)?));
                let mut inner = vec![Term::atom("loop"), loop_label(*name), Term::List(exit)];
                self.body(body, TypeId::VOID, &mut inner)?;
                inner.push(Term::instr("br", [loop_label(*name)]));
                Term::instr("block", [label(*name), Term::List(inner)])
            }
            ExprKind::Return(value) => {
                let mut items = vec![Term::atom("return")];
                if let Some(value) = value {
                    items.extend(self.operand(value)?);
                }
                Term::List(items)
            }
            ExprKind::Break { label: name, value } => {
                let mut items = vec![Term::atom("br"), label(*name)];
                if let Some(value) = value {
                    items.extend(self.operand(value)?);
                }
                Term::List(items)
            }
            ExprKind::Drop(inner) => {
                if module.is_void(inner.ty) {
                    return self.expr(inner, out);
                }
                Term::instr("drop", self.operand(inner)?)
            }
            ExprKind::MatchEnum(m) => self.enum_match(m, expr.ty, span)?,
            ExprKind::MatchInt(m) => self.int_match(m, expr.ty, span)?,
            ExprKind::Asm(terms) => {
                for term in terms {
                    out.extend(self.asm_term(term)?);
                }
                return Ok(());
            }
            ExprKind::Func(_)
            | ExprKind::Macro(_)
            | ExprKind::Overloads(_)
            | ExprKind::Type(_)
            | ExprKind::Attr { .. }
            | ExprKind::Call { .. }
            | ExprKind::Index { .. }
            | ExprKind::Assign { .. }
            | ExprKind::BoundMethod { .. }
            | ExprKind::MacroCall { .. }
            | ExprKind::EnumInst { .. }
            | ExprKind::Match(_) => {
                return Err(CompileError::internal(
                    format!("{} reached code generation", expr.kind.describe()),
                    span,
                ))
            }
        };
        out.push(term);
        Ok(())
    }

    /// Read field `index` of an object of static type `owner`.
    fn field_get(&self, owner: TypeId, index: u32, object: Vec<Term>, span: Span) -> Result<Term> {
        let module = self.module;
        let field = module
            .tuple_fields(owner)
            .and_then(|fields| fields.get(index as usize).copied());
        let op = field
            .and_then(|field| module.native(field))
            .map_or("struct.get", |native| packed_op(native, "struct.get"));
        let mut items = vec![
            Term::atom(op),
            Term::ident(&self.types.representation(owner, span)?),
            Term::Int(i64::from(index)),
        ];
        items.extend(object);
        Ok(Term::List(items))
    }

    /// Jump-table dispatch.
    ///
    /// ```text
    /// (block $match
    ///   (local.set $tmp scrutinee)
    ///   (block $armN ... (block $arm0
    ///       (block $default (br_table $arm.. $default (i32.rem_u tag K)))
    ///       unreachable)
    ///     bindings, arm 0 body, (br $match))
    ///   ... arm N body, (br $match))
    /// ```
    ///
    /// Variants with no case branch straight to `$match`.
    fn enum_match(&self, m: &MatchEnum, ty: TypeId, span: Span) -> Result<Term> {
        let module = self.module;
        let enum_name = self.types.representation(m.enum_, span)?;
        let tmp = self.local(m.tmp);
        let variants = m.table.len();

        let mut dispatch = vec![Term::atom("br_table")];
        for entry in &m.table {
            dispatch.push(match entry {
                Some(arm) => label(m.arms[*arm].label),
                None => label(m.label),
            });
        }
        dispatch.push(label(m.default_label));
        dispatch.push(Term::instr(
            "i32.rem_u",
            [
                Term::instr(
                    "struct.get",
                    [
                        Term::ident(&enum_name),
                        Term::Int(0),
                        Term::instr("local.get", [tmp.clone()]),
                    ],
                ),
                Term::constant("i32", i64::try_from(variants).unwrap_or(i64::MAX)),
            ],
        ));

        let mut inner = vec![
            Term::instr("block", [label(m.default_label), Term::List(dispatch)]),
            Term::instr("unreachable", []),
        ];
        for arm in &m.arms {
            let mut block = vec![Term::atom("block"), label(arm.label)];
            block.append(&mut inner);
            inner.push(Term::List(block));
            self.bindings(arm, &tmp, span, &mut inner)?;
            self.body(&arm.body, ty, &mut inner)?;
            inner.push(Term::instr("br", [label(m.label)]));
        }

        let mut outer = vec![Term::atom("block"), label(m.label)];
        outer.extend(self.block_type(ty, span)?);
        let mut set = vec![Term::atom("local.set"), tmp];
        set.extend(self.operand(&m.scrutinee)?);
        outer.push(Term::List(set));
        outer.append(&mut inner);
        tracing::trace!(
            enum_ = %module.display_type(m.enum_),
            entries = variants,
            "emitted jump table"
        );
        Ok(Term::List(outer))
    }

    /// Pattern variables read from the matched variant's payload.
    fn bindings(&self, arm: &EnumArm, tmp: &Term, span: Span, out: &mut Vec<Term>) -> Result<()> {
        let Some(variant) = arm.variant else {
            return Ok(());
        };
        if arm.bindings.is_empty() {
            return Ok(());
        }
        let variant_name = self.types.representation(variant, span)?;
        for &(var, field) in &arm.bindings {
            let cast = Term::instr(
                "ref.cast",
                [
                    reference(&variant_name),
                    Term::instr("local.get", [tmp.clone()]),
                ],
            );
            let read = self.field_get(variant, field, vec![cast], span)?;
            out.push(Term::instr("local.set", [self.local(var), read]));
        }
        Ok(())
    }

    /// Equality cascade.
    fn int_match(&self, m: &MatchInt, ty: TypeId, span: Span) -> Result<Term> {
        let module = self.module;
        let native = module
            .native(m.scrutinee.ty)
            .map_or_else(|| "i32".to_string(), |native| native.name.clone());
        let tmp = self.local(m.tmp);

        let mut outer = vec![Term::atom("block"), label(m.label)];
        outer.extend(self.block_type(ty, span)?);
        let mut set = vec![Term::atom("local.set"), tmp.clone()];
        set.extend(self.operand(&m.scrutinee)?);
        outer.push(Term::List(set));

        for arm in &m.arms {
            let test = Term::instr(
                &format!("{native}.eq"),
                [
                    Term::instr("local.get", [tmp.clone()]),
                    Term::constant(&native, arm.value),
                ],
            );
            let mut then = vec![Term::atom("then")];
            self.body(&arm.body, ty, &mut then)?;
            then.push(Term::instr("br", [label(m.label)]));
            outer.push(Term::instr("if", [test, Term::List(then)]));
        }
        if let Some(fallback) = &m.fallback {
            self.body(fallback, ty, &mut outer)?;
        }
        Ok(Term::List(outer))
    }

    /// Inline assembly, with `{expr}` splices replaced by their code.
    pub(crate) fn asm_term(&self, term: &AsmTerm) -> Result<Vec<Term>> {
        Ok(match term {
            AsmTerm::Atom(atom) => vec![Term::atom(atom.as_str())],
            AsmTerm::Int(value) => vec![Term::Int(*value)],
            AsmTerm::Str(text) => vec![Term::Str(text.clone())],
            AsmTerm::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.extend(self.asm_term(item)?);
                }
                vec![Term::List(out)]
            }
            AsmTerm::Expr(expr) => self.operand(expr)?,
        })
    }
}

/// `struct.get_s`/`_u` and `array.get_s`/`_u` for packed storage.
fn packed_op(native: &gi_ir::NativeType, op: &'static str) -> &'static str {
    if native.packed.is_none() {
        return op;
    }
    match (op, native.signed.unwrap_or(false)) {
        ("struct.get", true) => "struct.get_s",
        ("struct.get", false) => "struct.get_u",
        (_, true) => "array.get_s",
        (_, false) => "array.get_u",
    }
}
