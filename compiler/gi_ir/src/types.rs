//! Type entries.
//!
//! Every type the compiler knows about is a [`TypeEntry`] in the module's
//! type arena. Declared types (`Def`, `Enum`, `EnumValue`) are nominal: two
//! ids are the same type only if they are the same id. Structural entries
//! (`Tuple`, `Array`, `NativeArray`, `Native`) compare by shape.

use crate::{ast, ScopeId, Span, TemplateId, TypeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeEntry {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Not yet inferred.
    Unknown,
    /// Placeholder type of an integer literal until matched against an
    /// expected type.
    IntLiteral,
    /// Placeholder type of a string literal.
    StrLiteral,
    Void,
    /// A type expression that has not been through type translation yet.
    Untranslated { expr: ast::TypeExpr, scope: ScopeId },
    Native(NativeType),
    Tuple(TupleType),
    /// User-facing array; indexing delegates to `[]`/`[]=` methods.
    Array(TypeId),
    /// Raw array; indexed natively.
    NativeArray(TypeId),
    /// A declared type, optionally wrapping the representation `super_`.
    Def(TypeDef),
    Enum(EnumType),
    EnumValue(EnumValueType),
    /// A template parameter inside a template body or impl.
    TemplateParam { name: String, template: TemplateId },
    /// `Box[i32]` before instantiation.
    TemplateInst {
        template: TemplateId,
        args: Vec<TypeId>,
    },
}

/// A scalar of the target format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeType {
    /// Value type: `i32`, `i64`, `f32`, `f64`.
    pub name: String,
    /// Storage type inside arrays and structs (`i8`, `i16`).
    pub packed: Option<String>,
    /// Sign extension used when reading a packed value.
    pub signed: Option<bool>,
}

impl NativeType {
    pub fn new(name: impl Into<String>) -> Self {
        NativeType {
            name: name.into(),
            packed: None,
            signed: None,
        }
    }

    /// Name used in storage positions.
    pub fn storage(&self) -> &str {
        self.packed.as_deref().unwrap_or(&self.name)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.name.as_str(), "i32" | "i64")
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.name.as_str(), "i32" | "i64" | "f32" | "f64")
    }

    /// Packed to eight bits, the element type of string literals.
    pub fn is_byte(&self) -> bool {
        self.packed.as_deref() == Some("i8")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleType {
    pub fields: Vec<TypeId>,
    /// Field names; empty for positional tuples.
    pub names: Vec<Option<String>>,
}

impl TupleType {
    pub fn positional(fields: Vec<TypeId>) -> Self {
        TupleType {
            fields,
            names: Vec::new(),
        }
    }

    /// Position of a named field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|field| field.as_deref() == Some(name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    /// Dotted module-level symbol.
    pub symbol: String,
    pub super_: Option<TypeId>,
    /// Methods and nested types.
    pub scope: ScopeId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub symbol: String,
    pub scope: ScopeId,
    /// Variants in discriminant order.
    pub variants: Vec<TypeId>,
}

/// One variant of an enum, represented as a tuple whose field 0 is the
/// discriminant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValueType {
    pub name: String,
    pub symbol: String,
    pub enum_: TypeId,
    pub discriminant: u32,
    /// All fields, discriminant first.
    pub fields: Vec<TypeId>,
    pub scope: ScopeId,
}

impl EnumValueType {
    /// Declared payload fields, without the discriminant.
    pub fn payload(&self) -> &[TypeId] {
        self.fields.get(1..).unwrap_or(&[])
    }
}

impl TypeKind {
    /// Declared types carry a symbol and emit a declaration of their own.
    pub fn is_declared(&self) -> bool {
        matches!(
            self,
            TypeKind::Def(_) | TypeKind::Enum(_) | TypeKind::EnumValue(_)
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, TypeKind::IntLiteral | TypeKind::StrLiteral)
    }

    pub fn scope(&self) -> Option<ScopeId> {
        match self {
            TypeKind::Def(def) => Some(def.scope),
            TypeKind::Enum(e) => Some(e.scope),
            TypeKind::EnumValue(v) => Some(v.scope),
            _ => None,
        }
    }
}

/// Builtin entries occupy fixed slots at the start of every module's type
/// arena.
impl TypeId {
    pub const UNKNOWN: TypeId = TypeId::new(0);
    pub const VOID: TypeId = TypeId::new(1);
    pub const INT_LITERAL: TypeId = TypeId::new(2);
    pub const STR_LITERAL: TypeId = TypeId::new(3);
    /// Internal `i32` used for enum discriminants.
    pub const DISCRIMINANT: TypeId = TypeId::new(4);

    pub(crate) const BUILTIN_COUNT: usize = 5;

    pub const fn is_unknown(self) -> bool {
        self.raw() == Self::UNKNOWN.raw()
    }
}
