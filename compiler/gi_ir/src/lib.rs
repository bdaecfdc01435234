//! Gi IR - syntax-tree input and intermediate representation.
//!
//! This crate holds the data the Gi compiler works on:
//! - [`Span`]s for source locations
//! - [`ast`]: the untyped syntax tree produced by the external parser
//! - typed arenas and ids ([`IdVec`], [`TypeId`], [`FuncId`], ...)
//! - [`Scope`]s with value and type namespaces
//! - type entries and queries ([`TypeKind`], [`Module::primitive`])
//! - IR expressions ([`Expr`], [`ExprKind`])
//! - generic traversal ([`visitor`])
//!
//! # Ownership
//!
//! The [`Module`] owns every declaration in an arena. Expressions form owned
//! trees; anything an expression points at (a variable, a function, a type)
//! is an id. A pass that rewrites a function body moves the body out of its
//! [`FunctionDef`], rewrites it with the module borrowed separately, and
//! moves it back.

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
mod decl;
mod expr;
mod ids;
mod module;
mod scope;
mod span;
mod type_query;
mod types;
pub mod visitor;

pub use decl::{
    AsmBlock, ConstDef, ConstInit, FunctionBody, FunctionDef, FunctionKind, TemplateDef, VarDecl,
    VarKind,
};
pub use expr::{
    body_diverges, AsmTerm, EnumArm, Expr, ExprKind, IntArm, Match, MatchCase, MatchEnum,
    MatchInt, Pattern,
};
pub use ids::{ConstId, FuncId, IdVec, Idx, LabelId, ScopeId, TemplateId, TypeId, VarId};
pub use module::{Module, ROOT_SCOPE_NAME};
pub use scope::{Binding, LookupError, Resolved, Scope, TypeBinding};
pub use span::Span;
pub use types::{EnumType, EnumValueType, NativeType, TupleType, TypeDef, TypeEntry, TypeKind};
