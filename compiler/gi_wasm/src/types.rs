//! Type declarations and value types.
//!
//! | IR representation | declaration |
//! |-------------------|-------------|
//! | tuple | `(struct (field (mut t))...)` |
//! | array, native array | `(array (mut t))` |
//! | enum | `(sub (struct (field i32)))`, the discriminant |
//! | enum variant | `(sub final $Enum (struct (field i32) (field (mut t))...))` |
//! | native, alias | nothing |
//!
//! Structurally equal tuples and arrays share one declaration. It is named
//! after the first alias declared for it (`type Pair: (i32, i32)` gives
//! `$Pair`), or `$__anon.N` when nothing names it.

use gi_diagnostic::{CompileError, Result};
use gi_ir::{Module, Span, TypeId, TypeKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::names::mangle;
use crate::term::Term;

pub(crate) struct Types<'m> {
    module: &'m Module,
    /// Declaration name per structural type key.
    structural: FxHashMap<String, String>,
}

fn is_structural(kind: &TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::Tuple(_) | TypeKind::Array(_) | TypeKind::NativeArray(_)
    )
}

impl<'m> Types<'m> {
    pub(crate) fn new(module: &'m Module) -> Self {
        let mut aliases: FxHashMap<String, String> = FxHashMap::default();
        for (_, entry) in module.types.iter() {
            if let TypeKind::Def(def) = &entry.kind {
                if let Some(super_) = def.super_ {
                    if is_structural(module.kind(super_)) {
                        aliases
                            .entry(module.type_key(super_))
                            .or_insert_with(|| mangle(&def.symbol));
                    }
                }
            }
        }

        let mut structural = FxHashMap::default();
        let mut anonymous = 0;
        for &ty in &module.type_order {
            if !is_structural(module.kind(ty)) {
                continue;
            }
            let key = module.type_key(ty);
            if structural.contains_key(&key) {
                continue;
            }
            let name = aliases.remove(&key).unwrap_or_else(|| {
                anonymous += 1;
                format!("__anon.{}", anonymous - 1)
            });
            structural.insert(key, name);
        }
        Types { module, structural }
    }

    /// One declaration per representation, in dependency order.
    pub(crate) fn declarations(&self) -> Result<Vec<Term>> {
        let module = self.module;
        let mut declared = FxHashSet::default();
        let mut out = Vec::new();
        for &ty in &module.type_order {
            let span = module.types[ty].span;
            let name = self.declared_name(ty, span)?;
            if !declared.insert(name.clone()) {
                continue;
            }
            let body = match module.kind(ty) {
                TypeKind::Tuple(tuple) => Term::instr("struct", self.fields(&tuple.fields, span)?),
                TypeKind::Array(elem) | TypeKind::NativeArray(elem) => Term::instr(
                    "array",
                    [Term::instr("mut", [self.storage_type(*elem, span)?])],
                ),
                TypeKind::Enum(_) => Term::instr(
                    "sub",
                    [Term::instr("struct", [discriminant_field()])],
                ),
                TypeKind::EnumValue(value) => {
                    let mut fields = vec![discriminant_field()];
                    fields.extend(self.fields(value.payload(), span)?);
                    Term::instr(
                        "sub",
                        [
                            Term::atom("final"),
                            Term::ident(&self.declared_name(value.enum_, span)?),
                            Term::instr("struct", fields),
                        ],
                    )
                }
                _ => continue,
            };
            out.push(Term::instr("type", [Term::ident(&name), body]));
        }
        tracing::debug!(declared = out.len(), "emitted type declarations");
        Ok(out)
    }

    fn fields(&self, fields: &[TypeId], span: Span) -> Result<Vec<Term>> {
        fields
            .iter()
            .map(|&field| {
                Ok(Term::instr(
                    "field",
                    [Term::instr("mut", [self.storage_type(field, span)?])],
                ))
            })
            .collect()
    }

    /// Name of the declaration `ty` itself stands for.
    fn declared_name(&self, ty: TypeId, span: Span) -> Result<String> {
        let module = self.module;
        match module.kind(ty) {
            TypeKind::Enum(e) => Ok(mangle(&e.symbol)),
            TypeKind::EnumValue(value) => Ok(mangle(&value.symbol)),
            kind if is_structural(kind) => self
                .structural
                .get(&module.type_key(ty))
                .cloned()
                .ok_or_else(|| {
                    CompileError::internal(
                        format!("no declaration for {}", module.display_type(ty)),
                        span,
                    )
                }),
            _ => Err(CompileError::internal(
                format!("{} has no declaration", module.display_type(ty)),
                span,
            )),
        }
    }

    /// Name of the struct or array declaration values of `ty` are built
    /// from.
    pub(crate) fn representation(&self, ty: TypeId, span: Span) -> Result<String> {
        self.declared_name(self.module.primitive(ty), span)
    }

    /// The value type of `ty`, or `None` for void.
    pub(crate) fn value_type(&self, ty: TypeId, span: Span) -> Result<Option<Term>> {
        let module = self.module;
        let prim = module.primitive(ty);
        match module.kind(prim) {
            TypeKind::Void => Ok(None),
            TypeKind::Native(native) => Ok(Some(Term::atom(native.name.as_str()))),
            TypeKind::Tuple(_)
            | TypeKind::Array(_)
            | TypeKind::NativeArray(_)
            | TypeKind::Enum(_)
            | TypeKind::EnumValue(_) => Ok(Some(reference(&self.declared_name(prim, span)?))),
            _ => Err(CompileError::internal(
                format!(
                    "type {} has no runtime representation",
                    module.display_type(ty)
                ),
                span,
            )),
        }
    }

    /// A value type that must exist.
    pub(crate) fn required_value_type(&self, ty: TypeId, span: Span) -> Result<Term> {
        self.value_type(ty, span)?.ok_or_else(|| {
            CompileError::internal("a void value cannot be stored", span)
        })
    }

    /// The type used inside structs and arrays: packed storage for small
    /// natives.
    pub(crate) fn storage_type(&self, ty: TypeId, span: Span) -> Result<Term> {
        match self.module.native(ty) {
            Some(native) => Ok(Term::atom(native.storage())),
            None => self.required_value_type(ty, span),
        }
    }

    /// The `(param ...)` and `(result ...)` entries of a signature.
    pub(crate) fn signature(
        &self,
        params: &[TypeId],
        ret: TypeId,
        span: Span,
    ) -> Result<Vec<Term>> {
        let mut out = Vec::with_capacity(params.len() + 1);
        for &param in params {
            out.push(Term::instr("param", [self.required_value_type(param, span)?]));
        }
        if let Some(ret) = self.value_type(ret, span)? {
            out.push(Term::instr("result", [ret]));
        }
        Ok(out)
    }
}

/// `(ref null $name)`.
pub(crate) fn reference(name: &str) -> Term {
    Term::instr("ref", [Term::atom("null"), Term::ident(name)])
}

fn discriminant_field() -> Term {
    Term::instr("field", [Term::atom("i32")])
}
