//! Queries over the type arena.
//!
//! Declared types are nominal; aliases resolve through `super_` chains.
//! [`Module::primitive`] follows a chain down to its representation, and
//! [`Module::has_base_class`] walks it upward for subtype checks.

use crate::types::{NativeType, TupleType};
use crate::{Module, ScopeId, TypeId, TypeKind};

impl Module {
    /// Follow `super_` links until a representation type is reached.
    ///
    /// A declared type without a `super_` is its own primitive (an opaque
    /// nominal type with no runtime representation).
    pub fn primitive(&self, mut ty: TypeId) -> TypeId {
        while let TypeKind::Def(def) = self.kind(ty) {
            match def.super_ {
                Some(super_) => ty = super_,
                None => break,
            }
        }
        ty
    }

    /// The next type up the subtype chain.
    pub fn super_of(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Def(def) => def.super_,
            TypeKind::EnumValue(value) => Some(value.enum_),
            _ => None,
        }
    }

    /// `ty` is `base` or has `base` somewhere on its `super_` chain.
    pub fn has_base_class(&self, ty: TypeId, base: TypeId) -> bool {
        let mut current = Some(ty);
        while let Some(t) = current {
            if self.types_equal(t, base) {
                return true;
            }
            current = self.super_of(t);
        }
        false
    }

    /// Identity for declared types, shape for structural ones.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Void, TypeKind::Void) => true,
            (TypeKind::Native(x), TypeKind::Native(y)) => x == y,
            (TypeKind::Tuple(x), TypeKind::Tuple(y)) => {
                x.fields.len() == y.fields.len()
                    && x
                        .fields
                        .iter()
                        .zip(&y.fields)
                        .all(|(&fx, &fy)| self.types_equal(fx, fy))
            }
            (TypeKind::Array(x), TypeKind::Array(y))
            | (TypeKind::NativeArray(x), TypeKind::NativeArray(y)) => self.types_equal(*x, *y),
            _ => false,
        }
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.primitive(ty)), TypeKind::Void)
    }

    /// The native scalar `ty` is represented as.
    pub fn native(&self, ty: TypeId) -> Option<&NativeType> {
        match self.kind(self.primitive(ty)) {
            TypeKind::Native(native) => Some(native),
            _ => None,
        }
    }

    /// Field types of a tuple-represented type. Enum variants include the
    /// discriminant at position 0.
    pub fn tuple_fields(&self, ty: TypeId) -> Option<&[TypeId]> {
        match self.kind(self.primitive(ty)) {
            TypeKind::Tuple(tuple) => Some(&tuple.fields),
            TypeKind::EnumValue(value) => Some(&value.fields),
            _ => None,
        }
    }

    pub fn tuple(&self, ty: TypeId) -> Option<&TupleType> {
        match self.kind(self.primitive(ty)) {
            TypeKind::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    /// Element type of either array kind.
    pub fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(self.primitive(ty)) {
            TypeKind::Array(elem) | TypeKind::NativeArray(elem) => Some(*elem),
            _ => None,
        }
    }

    /// The enum `ty` belongs to, for an enum or one of its variants.
    pub fn enum_of(&self, ty: TypeId) -> Option<TypeId> {
        let prim = self.primitive(ty);
        match self.kind(prim) {
            TypeKind::Enum(_) => Some(prim),
            TypeKind::EnumValue(value) => Some(value.enum_),
            _ => None,
        }
    }

    /// A string literal can be typed as `ty`: an array of packed bytes.
    pub fn is_byte_array(&self, ty: TypeId) -> bool {
        self.element_type(ty)
            .and_then(|elem| self.native(elem))
            .is_some_and(NativeType::is_byte)
    }

    /// Scopes searched by member lookup, innermost first.
    pub fn member_scopes(&self, ty: TypeId) -> Vec<ScopeId> {
        let mut scopes = Vec::new();
        let mut current = Some(ty);
        while let Some(t) = current {
            scopes.extend(self.kind(t).scope());
            current = self.super_of(t);
        }
        scopes
    }

    pub fn contains_template_param(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::TemplateParam { .. } => true,
            TypeKind::TemplateInst { args, .. } => {
                args.iter().any(|&arg| self.contains_template_param(arg))
            }
            TypeKind::Tuple(tuple) => tuple
                .fields
                .iter()
                .any(|&field| self.contains_template_param(field)),
            TypeKind::Array(elem) | TypeKind::NativeArray(elem) => {
                self.contains_template_param(*elem)
            }
            _ => false,
        }
    }

    /// Human-readable name for diagnostics.
    pub fn display_type(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Unknown => "{unknown}".to_string(),
            TypeKind::IntLiteral => "integer literal".to_string(),
            TypeKind::StrLiteral => "string literal".to_string(),
            TypeKind::Void => "()".to_string(),
            TypeKind::Untranslated { .. } => "{untranslated}".to_string(),
            TypeKind::Native(native) => native.name.clone(),
            TypeKind::Tuple(tuple) => {
                let fields: Vec<String> = tuple
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, &field)| match tuple.names.get(i).and_then(Option::as_deref) {
                        Some(name) => format!("{name}: {}", self.display_type(field)),
                        None => self.display_type(field),
                    })
                    .collect();
                if fields.len() == 1 {
                    format!("({},)", fields[0])
                } else {
                    format!("({})", fields.join(", "))
                }
            }
            TypeKind::Array(elem) => format!("{}[]", self.display_type(*elem)),
            TypeKind::NativeArray(elem) => format!("__native_array<{}>", self.display_type(*elem)),
            TypeKind::Def(def) => def.name.clone(),
            TypeKind::Enum(e) => e.name.clone(),
            TypeKind::EnumValue(value) => {
                format!("{}.{}", self.display_type(value.enum_), value.name)
            }
            TypeKind::TemplateParam { name, .. } => name.clone(),
            TypeKind::TemplateInst { template, args } => {
                let args: Vec<String> = args.iter().map(|&arg| self.display_type(arg)).collect();
                format!("{}[{}]", self.templates[*template].name, args.join(", "))
            }
        }
    }

    /// Identity key for template memoization: structurally equal types map
    /// to the same key, distinct declarations never do.
    pub fn type_key(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Def(def) => def.symbol.clone(),
            TypeKind::Enum(e) => e.symbol.clone(),
            TypeKind::EnumValue(value) => value.symbol.clone(),
            TypeKind::Native(native) => match &native.packed {
                Some(packed) => format!("native:{}:{packed}:{:?}", native.name, native.signed),
                None => format!("native:{}", native.name),
            },
            TypeKind::Tuple(tuple) => {
                let fields: Vec<String> = tuple.fields.iter().map(|&f| self.type_key(f)).collect();
                format!("({})", fields.join(","))
            }
            TypeKind::Array(elem) => format!("{}[]", self.type_key(*elem)),
            TypeKind::NativeArray(elem) => format!("{}[native]", self.type_key(*elem)),
            _ => self.display_type(ty),
        }
    }
}
