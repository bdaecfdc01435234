//! Type compatibility shared by overload selection and type propagation.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::{Binding, FuncId, Module, Resolved, Span, TypeBinding, TypeId, TypeKind};

use crate::CompileOptions;

/// Name of the conversion hook a type declares to accept literals its
/// representation cannot hold directly.
pub(crate) const FROM_LITERAL: &str = "__from_literal";

/// The root-scope type a literal placeholder defaults to.
pub(crate) fn default_literal_type(
    module: &Module,
    options: &CompileOptions,
    literal: TypeId,
    span: Span,
) -> Result<TypeId> {
    let name = match module.kind(literal) {
        TypeKind::IntLiteral => &options.default_int_type,
        TypeKind::StrLiteral => &options.default_str_type,
        _ => return Ok(literal),
    };
    match module.lookup_type(module.root, name).at(span)? {
        TypeBinding::Type(ty) => Ok(ty),
        TypeBinding::Template(_) => Err(CompileError::type_mismatch(
            "a concrete default literal type",
            format!("template `{name}`"),
            span,
        )),
    }
}

/// A literal of kind `literal` can be typed as `target` without a
/// conversion hook.
pub(crate) fn holds_literal(module: &Module, literal: TypeId, target: TypeId) -> bool {
    match module.kind(literal) {
        TypeKind::IntLiteral => module.native(target).is_some_and(|n| n.is_numeric()),
        TypeKind::StrLiteral => module.is_byte_array(target),
        _ => false,
    }
}

/// The conversion hooks `target` declares that accept a literal of kind
/// `literal`, in declaration order. A hook qualifies only when its single
/// parameter holds the literal directly.
pub(crate) fn from_literal_hooks(module: &Module, literal: TypeId, target: TypeId) -> Vec<FuncId> {
    let hooks = match module.lookup_member(target, FROM_LITERAL) {
        Ok(Some(Resolved::Value(Binding::Func(func)))) => vec![func],
        Ok(Some(Resolved::Value(Binding::Overloads(set)))) => set.to_vec(),
        _ => return Vec::new(),
    };
    hooks
        .into_iter()
        .filter(|&hook| match module.funcs[hook].params.as_slice() {
            [param] => holds_literal(module, literal, module.vars[*param].ty),
            _ => false,
        })
        .collect()
}

/// How well an argument of type `found` fits a parameter of type
/// `expected`: 2 for the same type, 1 for a subtype or a literal landing on
/// its default type, 0 for any other acceptable literal or an argument not
/// typed yet. `None` if it does not fit.
pub(crate) fn fit(
    module: &Module,
    options: &CompileOptions,
    expected: TypeId,
    found: TypeId,
) -> Option<u32> {
    if found.is_unknown() {
        return Some(0);
    }
    if module.kind(found).is_literal() {
        if !holds_literal(module, found, expected)
            && from_literal_hooks(module, found, expected).is_empty()
        {
            return None;
        }
        let default = default_literal_type(module, options, found, Span::DUMMY).ok();
        return Some(u32::from(default == Some(expected)));
    }
    if module.types_equal(found, expected) {
        Some(2)
    } else if module.has_base_class(found, expected) {
        Some(1)
    } else {
        None
    }
}

/// A value of type `found` may be used where `expected` is wanted.
pub(crate) fn assignable(module: &Module, expected: TypeId, found: TypeId) -> bool {
    module.has_base_class(found, expected)
}
