//! Syntax-tree input.
//!
//! The external parser produces these owned, immutable types. They are the
//! input to declaration registration and are never mutated afterwards: type
//! expressions are resolved into [`TypeId`](crate::TypeId)s and statements are
//! translated into IR [`Expr`](crate::Expr)s, leaving the tree untouched.
//!
//! Every node carries a [`Span`] used as diagnostic provenance. The
//! constructors in [`builders`] produce nodes with [`Span::DUMMY`]; call
//! `.at(span)` to attach a real location.

use crate::Span;

mod builders;


/// A parsed source module: a flat, ordered sequence of declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub items: Vec<Item>,
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    /// `type Name: super_`
    Type(TypeDecl),
    /// `type Name[T, U]: body`
    Template(TemplateDecl),
    /// `enum Name: Variant(fields), ...`
    Enum(EnumDecl),
    Function(FunctionDecl),
    Macro(FunctionDecl),
    /// `const NAME: T = init`
    Const(ConstDecl),
    /// `impl Target:` or `impl[T] Target[T]:` method block.
    Impl(ImplBlock),
    /// Top-level inline assembly spliced into the output module.
    Asm(Asm),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub super_: Option<TypeExpr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Option<TypeExpr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<Variant>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub fields: Vec<TypeExpr>,
    pub span: Span,
}

/// A function or macro signature plus optional body.
///
/// A function without a body is a host import. A parameter without a type is
/// only legal for `self`, where it means `Self`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub init: Expr,
}

/// A method block. Non-empty `params` make it a template impl
/// (`impl[T] Box[T]`), attached to every instance of the template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImplBlock {
    pub params: Vec<String>,
    pub target: TypeExpr,
    pub methods: Vec<Method>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Function(FunctionDecl),
    Macro(FunctionDecl),
}

impl Method {
    pub fn decl(&self) -> &FunctionDecl {
        match self {
            Method::Function(decl) | Method::Macro(decl) => decl,
        }
    }

    pub fn is_macro(&self) -> bool {
        matches!(self, Method::Macro(_))
    }
}

/// A type expression as written in a signature or declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExprKind {
    Named(String),
    /// `Option.Some`
    Member(Box<TypeExpr>, String),
    /// `(i32, i32)` or `(x: i32, y: i32)`. Empty is void.
    Tuple(Vec<TupleField>),
    /// `T[]`: user-facing array wrapper.
    Array(Box<TypeExpr>),
    /// Raw fixed-representation array.
    NativeArray(Box<TypeExpr>),
    /// `__native_type<i32>`, optionally packed (`<i32, i8, signed>`).
    Native {
        name: String,
        packed: Option<String>,
        signed: Option<bool>,
    },
    /// `Box[i32]`
    Apply { name: String, args: Vec<TypeExpr> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleField {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    Let {
        name: String,
        ty: Option<TypeExpr>,
        init: Option<Expr>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Match {
        scrutinee: Expr,
        cases: Vec<MatchCase>,
    },
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Wildcard,
    /// `Some(x, _)`; `None` bindings are `_`.
    Variant {
        name: String,
        bindings: Vec<Option<String>>,
    },
    /// Integer literal, constant, or a macro call evaluated at compile time.
    Value(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Int(i64),
    Str(String),
    Ident(String),
    /// Parenthesized list. A singleton is just grouping.
    Tuple(Vec<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Attr {
        obj: Box<Expr>,
        name: String,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    /// A template instance in value position: `Box[i32](3)`.
    TypeApply {
        name: String,
        args: Vec<TypeExpr>,
    },
    Asm(Asm),
}

/// An inline assembly block: a sequence of terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asm {
    pub terms: Vec<AsmTerm>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmTerm {
    Atom(String),
    Int(i64),
    Str(String),
    List(Vec<AsmTerm>),
    /// `{expr}` splice.
    Expr(Expr),
}
