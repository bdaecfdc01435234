//! Constructors for syntax-tree nodes.
//!
//! Parsers and tests build trees through these rather than spelling out the
//! struct literals. Every constructor uses [`Span::DUMMY`].

use super::{
    Asm, AsmTerm, ConstDecl, EnumDecl, Expr, ExprKind, FunctionDecl, ImplBlock, Item, ItemKind,
    MatchCase, Method, Param, Pattern, Stmt, StmtKind, TemplateDecl, TupleField, TypeDecl,
    TypeExpr, TypeExprKind, Variant,
};
use crate::Span;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Item {
    fn new(kind: ItemKind) -> Self {
        Item {
            kind,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn type_def(name: impl Into<String>, super_: Option<TypeExpr>) -> Self {
        Self::new(ItemKind::Type(TypeDecl {
            name: name.into(),
            super_,
        }))
    }

    pub fn template(name: impl Into<String>, params: &[&str], body: Option<TypeExpr>) -> Self {
        Self::new(ItemKind::Template(TemplateDecl {
            name: name.into(),
            params: names(params),
            body,
        }))
    }

    pub fn enum_def(name: impl Into<String>, variants: Vec<Variant>) -> Self {
        Self::new(ItemKind::Enum(EnumDecl {
            name: name.into(),
            variants,
        }))
    }

    pub fn function(decl: FunctionDecl) -> Self {
        let span = decl.span;
        Self::new(ItemKind::Function(decl)).at(span)
    }

    pub fn macro_def(decl: FunctionDecl) -> Self {
        let span = decl.span;
        Self::new(ItemKind::Macro(decl)).at(span)
    }

    pub fn constant(name: impl Into<String>, ty: Option<TypeExpr>, init: Expr) -> Self {
        Self::new(ItemKind::Const(ConstDecl {
            name: name.into(),
            ty,
            init,
        }))
    }

    pub fn impl_block(params: &[&str], target: TypeExpr, methods: Vec<Method>) -> Self {
        Self::new(ItemKind::Impl(ImplBlock {
            params: names(params),
            target,
            methods,
        }))
    }

    pub fn asm(terms: Vec<AsmTerm>) -> Self {
        Self::new(ItemKind::Asm(Asm::new(terms)))
    }
}

impl Variant {
    pub fn new(name: impl Into<String>, fields: Vec<TypeExpr>) -> Self {
        Variant {
            name: name.into(),
            fields,
            span: Span::DUMMY,
        }
    }
}

impl FunctionDecl {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Self {
        FunctionDecl {
            name: name.into(),
            params,
            ret,
            body: Some(body),
            span: Span::DUMMY,
        }
    }

    /// A body-less declaration, imported from the host.
    pub fn import(name: impl Into<String>, params: Vec<Param>, ret: Option<TypeExpr>) -> Self {
        FunctionDecl {
            name: name.into(),
            params,
            ret,
            body: None,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Param {
            name: name.into(),
            ty: Some(ty),
            span: Span::DUMMY,
        }
    }

    /// Untyped `self`.
    pub fn self_param() -> Self {
        Param {
            name: "self".to_string(),
            ty: None,
            span: Span::DUMMY,
        }
    }
}

impl TypeExpr {
    fn new(kind: TypeExprKind) -> Self {
        TypeExpr {
            kind,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(TypeExprKind::Named(name.into()))
    }

    pub fn member(base: TypeExpr, name: impl Into<String>) -> Self {
        Self::new(TypeExprKind::Member(Box::new(base), name.into()))
    }

    pub fn tuple(fields: Vec<TypeExpr>) -> Self {
        Self::new(TypeExprKind::Tuple(
            fields
                .into_iter()
                .map(|ty| TupleField { name: None, ty })
                .collect(),
        ))
    }

    pub fn named_tuple(fields: Vec<(&str, TypeExpr)>) -> Self {
        Self::new(TypeExprKind::Tuple(
            fields
                .into_iter()
                .map(|(name, ty)| TupleField {
                    name: Some(name.to_string()),
                    ty,
                })
                .collect(),
        ))
    }

    pub fn void() -> Self {
        Self::new(TypeExprKind::Tuple(Vec::new()))
    }

    pub fn array(elem: TypeExpr) -> Self {
        Self::new(TypeExprKind::Array(Box::new(elem)))
    }

    pub fn native_array(elem: TypeExpr) -> Self {
        Self::new(TypeExprKind::NativeArray(Box::new(elem)))
    }

    pub fn native(name: impl Into<String>) -> Self {
        Self::new(TypeExprKind::Native {
            name: name.into(),
            packed: None,
            signed: None,
        })
    }

    /// A native scalar stored as a narrower packed type inside arrays.
    pub fn native_packed(name: impl Into<String>, packed: impl Into<String>, signed: bool) -> Self {
        Self::new(TypeExprKind::Native {
            name: name.into(),
            packed: Some(packed.into()),
            signed: Some(signed),
        })
    }

    pub fn apply(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self::new(TypeExprKind::Apply {
            name: name.into(),
            args,
        })
    }
}

impl Stmt {
    fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn let_(name: impl Into<String>, ty: Option<TypeExpr>, init: Option<Expr>) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            ty,
            init,
        })
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(StmtKind::Assign { target, value })
    }

    pub fn if_else(cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::If {
            cond,
            then_body,
            else_body,
        })
    }

    pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::While { cond, body })
    }

    pub fn match_(scrutinee: Expr, cases: Vec<MatchCase>) -> Self {
        Self::new(StmtKind::Match { scrutinee, cases })
    }

    pub fn ret(value: Expr) -> Self {
        Self::new(StmtKind::Return(Some(value)))
    }

    pub fn ret_void() -> Self {
        Self::new(StmtKind::Return(None))
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(StmtKind::Expr(expr)).at(span)
    }
}

impl MatchCase {
    pub fn new(pattern: Pattern, body: Vec<Stmt>) -> Self {
        MatchCase {
            pattern,
            body,
            span: Span::DUMMY,
        }
    }
}

impl Pattern {
    /// `Name(a, _, c)`; `None` entries are wildcards.
    pub fn variant(name: impl Into<String>, bindings: &[Option<&str>]) -> Self {
        Pattern::Variant {
            name: name.into(),
            bindings: bindings.iter().map(|b| b.map(str::to_string)).collect(),
        }
    }

    pub fn value(expr: Expr) -> Self {
        Pattern::Value(expr)
    }
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Int(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Str(value.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Ident(name.into()))
    }

    pub fn tuple(items: Vec<Expr>) -> Self {
        Self::new(ExprKind::Tuple(items))
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn attr(obj: Expr, name: impl Into<String>) -> Self {
        Self::new(ExprKind::Attr {
            obj: Box::new(obj),
            name: name.into(),
        })
    }

    /// `obj.name(args)`
    pub fn method(obj: Expr, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(Self::attr(obj, name), args)
    }

    pub fn index(obj: Expr, index: Expr) -> Self {
        Self::new(ExprKind::Index {
            obj: Box::new(obj),
            index: Box::new(index),
        })
    }

    pub fn binary(op: impl Into<String>, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(op: impl Into<String>, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op: op.into(),
            operand: Box::new(operand),
        })
    }

    pub fn type_apply(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self::new(ExprKind::TypeApply {
            name: name.into(),
            args,
        })
    }

    pub fn asm(terms: Vec<AsmTerm>) -> Self {
        Self::new(ExprKind::Asm(Asm::new(terms)))
    }
}

impl Asm {
    pub fn new(terms: Vec<AsmTerm>) -> Self {
        Asm {
            terms,
            span: Span::DUMMY,
        }
    }
}

impl AsmTerm {
    pub fn atom(atom: impl Into<String>) -> Self {
        AsmTerm::Atom(atom.into())
    }

    pub fn list(items: Vec<AsmTerm>) -> Self {
        AsmTerm::List(items)
    }

    /// `(op {a} {b} ...)`: a folded instruction over spliced expressions.
    pub fn instr(op: &str, operands: Vec<Expr>) -> Self {
        let mut items = vec![AsmTerm::atom(op)];
        items.extend(operands.into_iter().map(AsmTerm::Expr));
        AsmTerm::List(items)
    }
}

impl Method {
    pub fn function(decl: FunctionDecl) -> Self {
        Method::Function(decl)
    }

    pub fn macro_def(decl: FunctionDecl) -> Self {
        Method::Macro(decl)
    }
}
