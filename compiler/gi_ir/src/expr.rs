//! IR expressions.
//!
//! Function bodies are owned trees of [`Expr`]. Each node carries its type
//! slot (starting out [`TypeId::UNKNOWN`] or a literal placeholder) and the
//! span of the syntax it was translated from. Passes rewrite nodes in place,
//! usually by replacing `expr.kind` wholesale; references to declarations are
//! ids into the module arenas and are never deep-copied.
//!
//! The kinds fall into three groups:
//!
//! - **Unresolved** kinds produced by translation and eliminated by member
//!   resolution: `Attr`, `Call`, `Index`, `Assign`, `BoundMethod`, callee
//!   references (`Func`, `Macro`, `Overloads`, `Type`) and the generic
//!   `Match`.
//! - **Resolved** kinds consumed by code generation.
//! - **Control flow** with block labels, minted per module.

use crate::{ConstId, FuncId, LabelId, Span, TypeId, VarId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Int(i64),
    Str(String),
    /// No-op; the value of `()`.
    Nop,

    // References
    Var(VarId),
    Func(FuncId),
    Macro(FuncId),
    Overloads(Vec<FuncId>),
    Type(TypeId),
    Const(ConstId),

    // Unresolved
    Attr {
        obj: Box<Expr>,
        name: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// A method looked up on a receiver, awaiting its call.
    BoundMethod {
        candidates: Vec<FuncId>,
        recv: Box<Expr>,
    },

    // Resolved
    FunctionCall {
        func: FuncId,
        args: Vec<Expr>,
    },
    MacroCall {
        mac: FuncId,
        args: Vec<Expr>,
    },
    /// Construct a tuple of type `ty` (the node's own type slot).
    TupleInst {
        fields: Vec<Expr>,
    },
    /// Construct an enum variant from its payload.
    EnumInst {
        variant: TypeId,
        args: Vec<Expr>,
    },
    GetField {
        obj: Box<Expr>,
        index: u32,
    },
    SetField {
        obj: Box<Expr>,
        index: u32,
        value: Box<Expr>,
    },
    GetItem {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    SetItem {
        obj: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    SetLocal {
        var: VarId,
        value: Box<Expr>,
    },
    /// Reinterpret a value as a type with the same representation.
    Retag(Box<Expr>),

    // Control flow
    Block {
        label: LabelId,
        body: Vec<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_body: Vec<Expr>,
        else_body: Vec<Expr>,
    },
    /// `while cond: body`; `label` is the exit block.
    Loop {
        label: LabelId,
        cond: Box<Expr>,
        body: Vec<Expr>,
    },
    Return(Option<Box<Expr>>),
    Break {
        label: LabelId,
        value: Option<Box<Expr>>,
    },
    Drop(Box<Expr>),
    Match(Match),
    MatchEnum(MatchEnum),
    MatchInt(MatchInt),
    Asm(Vec<AsmTerm>),
}

/// A match before specialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub scrutinee: Box<Expr>,
    pub cases: Vec<MatchCase>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Wildcard,
    /// `variant` is filled in by member resolution once the scrutinee's
    /// enum is known.
    Variant {
        name: String,
        variant: Option<TypeId>,
        bindings: Vec<Option<VarId>>,
    },
    Value(Expr),
}

/// Jump-table dispatch over an enum discriminant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchEnum {
    /// Outer block; every arm breaks out of it.
    pub label: LabelId,
    /// Holds the scrutinee so it is evaluated once.
    pub tmp: VarId,
    pub scrutinee: Box<Expr>,
    pub enum_: TypeId,
    pub arms: Vec<EnumArm>,
    /// One entry per variant in discriminant order: the arm taken, or `None`
    /// to fall out of the match.
    pub table: Vec<Option<usize>>,
    /// Target of the table's default entry, followed by `unreachable`.
    pub default_label: LabelId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumArm {
    pub label: LabelId,
    /// `None` for a wildcard arm.
    pub variant: Option<TypeId>,
    /// Pattern variables and the variant field each is read from.
    pub bindings: Vec<(VarId, u32)>,
    pub body: Vec<Expr>,
}

/// Equality cascade over an integer scrutinee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchInt {
    pub label: LabelId,
    pub tmp: VarId,
    pub scrutinee: Box<Expr>,
    pub arms: Vec<IntArm>,
    pub fallback: Option<Vec<Expr>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntArm {
    pub value: i64,
    pub body: Vec<Expr>,
}

/// Inline assembly term with resolved splices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmTerm {
    Atom(String),
    Int(i64),
    Str(String),
    List(Vec<AsmTerm>),
    Expr(Expr),
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeId, span: Span) -> Self {
        Expr { kind, ty, span }
    }

    /// An untyped node, filled in by later passes.
    pub fn untyped(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            ty: TypeId::UNKNOWN,
            span,
        }
    }

    /// Void no-op, used as a stand-in while a node is moved out.
    pub fn nop(span: Span) -> Self {
        Expr {
            kind: ExprKind::Nop,
            ty: TypeId::VOID,
            span,
        }
    }

    /// Move this node out, leaving a no-op behind.
    #[must_use]
    pub fn take(&mut self) -> Expr {
        let span = self.span;
        std::mem::replace(self, Expr::nop(span))
    }

    /// Control never continues past this expression.
    pub fn diverges(&self) -> bool {
        match &self.kind {
            ExprKind::Return(_) | ExprKind::Break { .. } => true,
            ExprKind::If {
                then_body,
                else_body,
                ..
            } => body_diverges(then_body) && body_diverges(else_body),
            ExprKind::Block { body, .. } => body_diverges(body),
            ExprKind::Match(m) => {
                m.cases.iter().any(|case| case.pattern == Pattern::Wildcard)
                    && m.cases.iter().all(|case| body_diverges(&case.body))
            }
            ExprKind::MatchEnum(m) => {
                m.table.iter().all(Option::is_some)
                    && m.arms.iter().all(|arm| body_diverges(&arm.body))
            }
            ExprKind::MatchInt(m) => {
                m.fallback.as_deref().is_some_and(body_diverges)
                    && m.arms.iter().all(|arm| body_diverges(&arm.body))
            }
            _ => false,
        }
    }
}

/// The last statement of a body diverges.
pub fn body_diverges(body: &[Expr]) -> bool {
    body.last().is_some_and(Expr::diverges)
}

impl ExprKind {
    /// Kinds member resolution must eliminate from runtime code.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            ExprKind::Attr { .. }
                | ExprKind::Call { .. }
                | ExprKind::Index { .. }
                | ExprKind::Assign { .. }
                | ExprKind::BoundMethod { .. }
                | ExprKind::Func(_)
                | ExprKind::Macro(_)
                | ExprKind::Overloads(_)
                | ExprKind::Type(_)
        )
    }

    /// Short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            ExprKind::Int(_) => "integer literal",
            ExprKind::Str(_) => "string literal",
            ExprKind::Nop => "()",
            ExprKind::Var(_) => "variable",
            ExprKind::Func(_) | ExprKind::Overloads(_) => "function",
            ExprKind::Macro(_) => "macro",
            ExprKind::Type(_) => "type",
            ExprKind::Const(_) => "constant",
            ExprKind::Attr { .. } => "attribute access",
            ExprKind::Call { .. } => "call",
            ExprKind::Index { .. } => "index",
            ExprKind::Assign { .. } => "assignment",
            ExprKind::BoundMethod { .. } => "method",
            ExprKind::FunctionCall { .. } => "function call",
            ExprKind::MacroCall { .. } => "macro call",
            ExprKind::TupleInst { .. } => "tuple",
            ExprKind::EnumInst { .. } => "enum variant",
            ExprKind::GetField { .. } => "field read",
            ExprKind::SetField { .. } => "field write",
            ExprKind::GetItem { .. } => "array read",
            ExprKind::SetItem { .. } => "array write",
            ExprKind::SetLocal { .. } => "local write",
            ExprKind::Retag(_) => "conversion",
            ExprKind::Block { .. } => "block",
            ExprKind::If { .. } => "if",
            ExprKind::Loop { .. } => "while",
            ExprKind::Return(_) => "return",
            ExprKind::Break { .. } => "break",
            ExprKind::Drop(_) => "drop",
            ExprKind::Match(_) | ExprKind::MatchEnum(_) | ExprKind::MatchInt(_) => "match",
            ExprKind::Asm(_) => "inline assembly",
        }
    }
}
