//! Pass 12: type dependency ordering.
//!
//! Every representation type that gets a declaration in the output (tuples,
//! arrays, enums and their variants) is given a depth, and
//! `Module::type_order` lists them by depth so a declaration only refers to
//! declarations emitted before it:
//!
//! | kind | depth |
//! |------|-------|
//! | native, void | 0 |
//! | tuple, array | 1 + deepest element |
//! | enum | 1 |
//! | variant | 1 + deepest of its enum and payload |
//! | declared alias | its representation's depth |
//!
//! A type whose representation contains itself has no depth and is
//! rejected. An enum variant may hold its own enum, since the enum base is
//! declared first.

use gi_diagnostic::{CompileError, Result};
use gi_ir::{Module, TypeId, TypeKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::CompileOptions;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.types.len()))]
pub fn sort_types(mut module: Module, _options: &CompileOptions) -> Result<Module> {
    let mut depths = Depths {
        module: &module,
        memo: FxHashMap::default(),
        visiting: FxHashSet::default(),
    };
    let mut order = Vec::new();
    for (ty, entry) in module.types.iter() {
        if !needs_declaration(&module, ty, &entry.kind) {
            continue;
        }
        order.push((depths.depth(ty)?, ty));
    }
    // Aliases are checked too: `type T: (i32, T)` has no layout even when
    // the tuple is never used on its own.
    for (ty, entry) in module.types.iter() {
        if let TypeKind::Def(_) = entry.kind {
            if is_concrete(&module, ty) {
                depths.depth(ty)?;
            }
        }
    }
    order.sort_unstable();
    tracing::debug!(declared = order.len(), "ordered type declarations");
    module.type_order = order.into_iter().map(|(_, ty)| ty).collect();
    Ok(module)
}

/// Representation types the code generator declares.
fn needs_declaration(module: &Module, ty: TypeId, kind: &TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::Tuple(_)
            | TypeKind::Array(_)
            | TypeKind::NativeArray(_)
            | TypeKind::Enum(_)
            | TypeKind::EnumValue(_)
    ) && is_concrete(module, ty)
}

/// Free of placeholders, template parameters and pending instances.
fn is_concrete(module: &Module, ty: TypeId) -> bool {
    let mut seen = FxHashSet::default();
    concrete_inner(module, ty, &mut seen)
}

fn concrete_inner(module: &Module, ty: TypeId, seen: &mut FxHashSet<TypeId>) -> bool {
    if !seen.insert(ty) {
        return true;
    }
    match module.kind(ty) {
        TypeKind::Unknown
        | TypeKind::IntLiteral
        | TypeKind::StrLiteral
        | TypeKind::Untranslated { .. }
        | TypeKind::TemplateParam { .. }
        | TypeKind::TemplateInst { .. } => false,
        TypeKind::Void | TypeKind::Native(_) | TypeKind::Enum(_) => true,
        TypeKind::Tuple(tuple) => tuple
            .fields
            .iter()
            .all(|&field| concrete_inner(module, field, seen)),
        TypeKind::EnumValue(value) => value
            .fields
            .iter()
            .all(|&field| concrete_inner(module, field, seen)),
        TypeKind::Array(elem) | TypeKind::NativeArray(elem) => concrete_inner(module, *elem, seen),
        TypeKind::Def(def) => def
            .super_
            .map_or(true, |super_| concrete_inner(module, super_, seen)),
    }
}

struct Depths<'m> {
    module: &'m Module,
    memo: FxHashMap<TypeId, u32>,
    visiting: FxHashSet<TypeId>,
}

impl Depths<'_> {
    fn depth(&mut self, ty: TypeId) -> Result<u32> {
        if let Some(&depth) = self.memo.get(&ty) {
            return Ok(depth);
        }
        if !self.visiting.insert(ty) {
            return Err(CompileError::RecursiveType {
                ty: self.module.display_type(ty),
                span: Some(self.module.types[ty].span),
            });
        }
        let depth = gi_stack::ensure_sufficient_stack(|| self.compute(ty))?;
        self.visiting.remove(&ty);
        self.memo.insert(ty, depth);
        Ok(depth)
    }

    fn compute(&mut self, ty: TypeId) -> Result<u32> {
        let module = self.module;
        Ok(match module.kind(ty) {
            TypeKind::Tuple(tuple) => 1 + self.deepest(&tuple.fields)?,
            TypeKind::Array(elem) | TypeKind::NativeArray(elem) => 1 + self.depth(*elem)?,
            TypeKind::Enum(_) => 1,
            TypeKind::EnumValue(value) => {
                let enum_ = self.depth(value.enum_)?;
                1 + enum_.max(self.deepest(value.payload())?)
            }
            TypeKind::Def(def) => match def.super_ {
                Some(super_) => self.depth(super_)?,
                None => 0,
            },
            _ => 0,
        })
    }

    fn deepest(&mut self, types: &[TypeId]) -> Result<u32> {
        let mut deepest = 0;
        for &ty in types {
            deepest = deepest.max(self.depth(ty)?);
        }
        Ok(deepest)
    }
}
