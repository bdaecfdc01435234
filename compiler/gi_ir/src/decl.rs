//! Declarations stored in the module arenas.

use rustc_hash::FxHashMap;

use crate::{ast, AsmTerm, Expr, ScopeId, Span, TypeId, VarId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    /// Compile-time only; always inlined, never emitted.
    Macro,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionBody {
    /// Declared without a body: imported from the host.
    Import,
    /// Syntax awaiting translation.
    Pending(Vec<ast::Stmt>),
    Lowered(Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    /// Dotted module-level symbol (the function scope's name).
    pub symbol: String,
    pub kind: FunctionKind,
    pub params: Vec<VarId>,
    pub ret: TypeId,
    /// Holds parameters and hoisted locals.
    pub scope: ScopeId,
    pub body: FunctionBody,
    /// Locals in declaration order, parameters excluded.
    pub locals: Vec<VarId>,
    /// The type whose scope declares this function, for methods.
    pub owner: Option<TypeId>,
    pub span: Span,
}

impl FunctionDef {
    pub fn is_macro(&self) -> bool {
        self.kind == FunctionKind::Macro
    }

    pub fn is_import(&self) -> bool {
        matches!(self.body, FunctionBody::Import)
    }

    /// Declared as a method taking `self` first.
    pub fn takes_self(&self, vars: &crate::IdVec<VarId, VarDecl>) -> bool {
        self.params
            .first()
            .is_some_and(|&param| vars[param].name == "self")
    }

    /// Move the lowered body out for rewriting.
    ///
    /// Returns an empty body for imports and untranslated functions; pair
    /// with [`FunctionDef::put_body`].
    pub fn take_body(&mut self) -> Vec<Expr> {
        match &mut self.body {
            FunctionBody::Lowered(body) => std::mem::take(body),
            FunctionBody::Import | FunctionBody::Pending(_) => Vec::new(),
        }
    }

    pub fn put_body(&mut self, body: Vec<Expr>) {
        if let FunctionBody::Lowered(slot) = &mut self.body {
            *slot = body;
        }
    }

    pub fn lowered_body(&self) -> Option<&[Expr]> {
        match &self.body {
            FunctionBody::Lowered(body) => Some(body),
            FunctionBody::Import | FunctionBody::Pending(_) => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    Arg,
    Local,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDecl {
    /// Source name.
    pub name: String,
    /// Name in the function's flat local space. Changes when a later
    /// declaration shadows this one.
    pub local_name: String,
    pub ty: TypeId,
    pub kind: VarKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Option<ast::TypeExpr>,
    /// Scope the template is declared in; instances are created under it.
    pub scope: ScopeId,
    /// `impl[T] Name[T]` blocks attached to every instance.
    pub impls: Vec<ast::ImplBlock>,
    /// Instances keyed by argument type names.
    pub instances: FxHashMap<Vec<String>, TypeId>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstInit {
    Pending(ast::Expr),
    Lowered(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstDef {
    pub name: String,
    pub symbol: String,
    /// `UNKNOWN` when inferred from the initializer.
    pub ty: TypeId,
    pub init: ConstInit,
    /// Filled in once the initializer has been evaluated.
    pub value: Option<i64>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmBlock {
    Pending(ast::Asm),
    Lowered(Vec<AsmTerm>),
}
