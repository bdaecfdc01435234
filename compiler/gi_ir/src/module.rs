//! The IR module: arenas, scope operations and label minting.
//!
//! [`Module`] owns every declaration. It is threaded by value through the
//! semantic pipeline; each pass takes it, rewrites it and hands it on.

use smallvec::smallvec;

use crate::scope::{Binding, LookupError, Resolved, Scope, TypeBinding};
use crate::types::NativeType;
use crate::{
    AsmBlock, ConstDef, ConstId, FuncId, FunctionDef, IdVec, LabelId, ScopeId, Span, TemplateDef,
    TemplateId, TypeEntry, TypeId, TypeKind, VarDecl, VarId, VarKind,
};


/// Dotted name of the root scope.
pub const ROOT_SCOPE_NAME: &str = "module";

#[derive(Clone, Debug)]
pub struct Module {
    pub scopes: IdVec<ScopeId, Scope>,
    pub types: IdVec<TypeId, TypeEntry>,
    pub funcs: IdVec<FuncId, FunctionDef>,
    pub vars: IdVec<VarId, VarDecl>,
    pub templates: IdVec<TemplateId, TemplateDef>,
    pub consts: IdVec<ConstId, ConstDef>,
    /// Top-level inline assembly, in declaration order.
    pub asm: Vec<AsmBlock>,
    pub root: ScopeId,
    /// Declared types in emission order, filled in by type sorting.
    pub type_order: Vec<TypeId>,
    next_label: u32,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    /// An empty module with the builtin types and the root scope.
    pub fn new() -> Self {
        let mut types = IdVec::new();
        for kind in [
            TypeKind::Unknown,
            TypeKind::Void,
            TypeKind::IntLiteral,
            TypeKind::StrLiteral,
            TypeKind::Native(NativeType::new("i32")),
        ] {
            types.push(TypeEntry {
                kind,
                span: Span::DUMMY,
            });
        }
        debug_assert_eq!(types.len(), TypeId::BUILTIN_COUNT);

        let mut scopes = IdVec::new();
        let root = scopes.next_id();
        scopes.push(Scope::new(ROOT_SCOPE_NAME.to_string(), None, root, None));

        Module {
            scopes,
            types,
            funcs: IdVec::new(),
            vars: IdVec::new(),
            templates: IdVec::new(),
            consts: IdVec::new(),
            asm: Vec::new(),
            root,
            type_order: Vec::new(),
            next_label: 0,
        }
    }

    /// Create a child scope named `parent.base` (suffixed `$N` on collision).
    pub fn new_scope(&mut self, parent: ScopeId, base: &str, function: Option<FuncId>) -> ScopeId {
        let parent_scope = &mut self.scopes[parent];
        let child = parent_scope.fresh_child_name(base);
        let name = format!("{}.{child}", parent_scope.name);
        let root = parent_scope.root;
        self.scopes
            .push(Scope::new(name, Some(parent), root, function))
    }

    pub fn new_type(&mut self, kind: TypeKind, span: Span) -> TypeId {
        self.types.push(TypeEntry { kind, span })
    }

    #[inline]
    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.types[ty].kind
    }

    pub fn new_var(&mut self, name: &str, ty: TypeId, kind: VarKind, span: Span) -> VarId {
        self.vars.push(VarDecl {
            name: name.to_string(),
            local_name: name.to_string(),
            ty,
            kind,
            span,
        })
    }

    /// A label never handed out before in this module.
    pub fn fresh_label(&mut self) -> LabelId {
        let label = LabelId::new(self.next_label);
        self.next_label += 1;
        label
    }

    /// Bind a variable or constant. Fails if the name is taken.
    pub fn register_value(
        &mut self,
        scope: ScopeId,
        name: &str,
        binding: Binding,
    ) -> Result<(), LookupError> {
        let target = &mut self.scopes[scope];
        if target.value(name).is_some() {
            return Err(LookupError::Duplicate {
                name: name.to_string(),
                scope: target.name.clone(),
            });
        }
        target.insert_value(name.to_string(), binding);
        Ok(())
    }

    /// Bind a function, joining an overload set if the name already names
    /// functions in this scope.
    pub fn register_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        func: FuncId,
    ) -> Result<(), LookupError> {
        let target = &mut self.scopes[scope];
        let binding = match target.value(name) {
            None => Binding::Func(func),
            Some(Binding::Func(first)) => Binding::Overloads(smallvec![*first, func]),
            Some(Binding::Overloads(set)) => {
                let mut set = set.clone();
                set.push(func);
                Binding::Overloads(set)
            }
            Some(Binding::Var(_) | Binding::Const(_)) => {
                return Err(LookupError::Duplicate {
                    name: name.to_string(),
                    scope: target.name.clone(),
                })
            }
        };
        target.insert_value(name.to_string(), binding);
        Ok(())
    }

    pub fn register_type(
        &mut self,
        scope: ScopeId,
        name: &str,
        binding: TypeBinding,
    ) -> Result<(), LookupError> {
        let target = &mut self.scopes[scope];
        if target.type_(name).is_some() {
            return Err(LookupError::Duplicate {
                name: name.to_string(),
                scope: target.name.clone(),
            });
        }
        target.insert_type(name.to_string(), binding);
        Ok(())
    }

    /// The nearest enclosing scope that holds a function's locals, or the
    /// root scope.
    pub fn function_scope(&self, mut scope: ScopeId) -> ScopeId {
        loop {
            let current = &self.scopes[scope];
            match (current.function, current.parent) {
                (Some(_), _) | (None, None) => return scope,
                (None, Some(parent)) => scope = parent,
            }
        }
    }

    /// Bind a local in the enclosing function scope.
    ///
    /// A previous variable of the same name is moved to a synthetic
    /// `__local.<name>$N` key and its local name updated, so references that
    /// already resolved to it keep working and the function's flat local
    /// space stays collision free.
    pub fn register_local(
        &mut self,
        scope: ScopeId,
        name: &str,
        var: VarId,
    ) -> Result<(), LookupError> {
        let fscope = self.function_scope(scope);
        let target = &mut self.scopes[fscope];
        match target.value(name) {
            None => {}
            Some(Binding::Var(_)) => {
                let key = target.fresh_shadow_key(name);
                if let Some(Binding::Var(old)) = target.remove_value(name) {
                    target.insert_value(key.clone(), Binding::Var(old));
                    self.vars[old].local_name = key;
                }
            }
            Some(_) => {
                return Err(LookupError::Duplicate {
                    name: name.to_string(),
                    scope: target.name.clone(),
                })
            }
        }
        let function = self.scopes[fscope].function;
        self.scopes[fscope].insert_value(name.to_string(), Binding::Var(var));
        self.vars[var].local_name = name.to_string();
        if let Some(func) = function {
            self.funcs[func].locals.push(var);
        }
        Ok(())
    }

    /// Walk the scope chain for `name` in either namespace.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Result<Resolved, LookupError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if let Some(found) = s.get(name)? {
                return Ok(found);
            }
            current = s.parent;
        }
        Err(LookupError::Unresolved {
            name: name.to_string(),
            scope: self.scopes[scope].name.clone(),
        })
    }

    /// Walk the scope chain for a type name.
    pub fn lookup_type(&self, scope: ScopeId, name: &str) -> Result<TypeBinding, LookupError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if let Some(found) = s.type_(name) {
                return Ok(found);
            }
            current = s.parent;
        }
        Err(LookupError::Unresolved {
            name: name.to_string(),
            scope: self.scopes[scope].name.clone(),
        })
    }

    /// Look up a member of `ty`: its own scope first, then each type along
    /// its `super_` chain. Enclosing scopes are not searched.
    pub fn lookup_member(&self, ty: TypeId, name: &str) -> Result<Option<Resolved>, LookupError> {
        let mut current = Some(ty);
        while let Some(t) = current {
            if let Some(scope) = self.kind(t).scope() {
                if let Some(found) = self.scopes[scope].get(name)? {
                    return Ok(Some(found));
                }
            }
            current = self.super_of(t);
        }
        Ok(None)
    }

    /// The dotted symbol of a declared type.
    pub fn type_symbol(&self, ty: TypeId) -> Option<&str> {
        match self.kind(ty) {
            TypeKind::Def(def) => Some(&def.symbol),
            TypeKind::Enum(e) => Some(&e.symbol),
            TypeKind::EnumValue(v) => Some(&v.symbol),
            _ => None,
        }
    }
}
