//! Hierarchical symbol tables.
//!
//! A [`Scope`] maps names to declarations in two tables: values (variables,
//! functions, macros, constants) and types (declared types and templates).
//! Scopes form a tree through `parent` ids. The parent link is only used for
//! upward lookup and is never traversed when walking the IR.
//!
//! Each scope has a globally unique dotted name (`module.Option.Some`) minted
//! from its parent. The code generator uses it as the symbol of whatever
//! declaration owns the scope.
//!
//! The operations that need more than one scope (registration with
//! hoisting, chained lookup) live on [`Module`](crate::Module).

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{ConstId, FuncId, ScopeId, TemplateId, TypeId, VarId};

/// A value-namespace binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Var(VarId),
    /// A single function or macro.
    Func(FuncId),
    /// Several functions registered under one name, in declaration order.
    Overloads(SmallVec<[FuncId; 2]>),
    Const(ConstId),
}

/// A type-namespace binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeBinding {
    Type(TypeId),
    Template(TemplateId),
}

/// The result of a lookup that may land in either namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Value(Binding),
    Type(TypeBinding),
}

#[derive(Clone, Debug)]
pub struct Scope {
    /// Globally unique dotted name.
    pub name: String,
    pub parent: Option<ScopeId>,
    pub root: ScopeId,
    /// Set on the scope holding a function's parameters and locals.
    pub function: Option<FuncId>,
    values: FxHashMap<String, Binding>,
    types: FxHashMap<String, TypeBinding>,
    /// Children minted per base name, for `$N` suffixes.
    child_names: FxHashMap<String, u32>,
    /// Shadowed locals per name, for `__local.<name>$N` keys.
    shadowed: FxHashMap<String, u32>,
}

impl Scope {
    pub(crate) fn new(
        name: String,
        parent: Option<ScopeId>,
        root: ScopeId,
        function: Option<FuncId>,
    ) -> Self {
        Scope {
            name,
            parent,
            root,
            function,
            values: FxHashMap::default(),
            types: FxHashMap::default(),
            child_names: FxHashMap::default(),
            shadowed: FxHashMap::default(),
        }
    }

    /// Mint a child name unique within this scope: `base`, then `base$1`,
    /// `base$2`, ...
    pub fn fresh_child_name(&mut self, base: &str) -> String {
        let count = self.child_names.entry(base.to_string()).or_insert(0);
        let name = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}${count}")
        };
        *count += 1;
        name
    }

    pub(crate) fn fresh_shadow_key(&mut self, name: &str) -> String {
        let count = self.shadowed.entry(name.to_string()).or_insert(0);
        *count += 1;
        format!("__local.{name}${count}")
    }

    pub fn value(&self, name: &str) -> Option<&Binding> {
        self.values.get(name)
    }

    pub fn type_(&self, name: &str) -> Option<TypeBinding> {
        self.types.get(name).copied()
    }

    /// Look a name up in this scope only.
    pub fn get(&self, name: &str) -> Result<Option<Resolved>, LookupError> {
        match (self.values.get(name), self.types.get(name)) {
            (Some(_), Some(_)) => Err(LookupError::Ambiguous {
                name: name.to_string(),
                scope: self.name.clone(),
            }),
            (Some(value), None) => Ok(Some(Resolved::Value(value.clone()))),
            (None, Some(ty)) => Ok(Some(Resolved::Type(*ty))),
            (None, None) => Ok(None),
        }
    }

    pub(crate) fn insert_value(&mut self, name: String, binding: Binding) -> Option<Binding> {
        self.values.insert(name, binding)
    }

    pub(crate) fn remove_value(&mut self, name: &str) -> Option<Binding> {
        self.values.remove(name)
    }

    pub(crate) fn insert_type(&mut self, name: String, binding: TypeBinding) -> Option<TypeBinding> {
        self.types.insert(name, binding)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.values.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, TypeBinding)> {
        self.types.iter().map(|(name, binding)| (name.as_str(), *binding))
    }
}

/// Failure of a scope operation. Carries the dotted name of the scope the
/// operation started in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// The scope chain is exhausted.
    Unresolved { name: String, scope: String },
    /// One scope binds the name as both a value and a type.
    Ambiguous { name: String, scope: String },
    /// The name is already registered in this scope.
    Duplicate { name: String, scope: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Unresolved { name, scope } => {
                write!(f, "unresolved name `{name}` in scope `{scope}`")
            }
            LookupError::Ambiguous { name, scope } => {
                write!(f, "`{name}` is both a type and a value in scope `{scope}`")
            }
            LookupError::Duplicate { name, scope } => {
                write!(f, "`{name}` is already defined in scope `{scope}`")
            }
        }
    }
}

impl std::error::Error for LookupError {}
