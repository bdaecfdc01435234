//! Pass 1: declaration registration.
//!
//! One scan over the syntax tree registers every top-level type, template,
//! enum, function, macro and constant in the root scope. A second scan
//! attaches `impl` methods to their owning type's scope, or to the template
//! for template impls. Nothing is analyzed yet. Every type slot is left as
//! an `Untranslated` entry for pass 2, so declarations may refer to each
//! other in any order.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::ast::{self, ItemKind};
use gi_ir::{
    AsmBlock, Binding, ConstDef, ConstInit, EnumType, EnumValueType, FunctionBody, FunctionDef,
    FunctionKind, FuncId, Module, ScopeId, TemplateDef, TypeBinding, TypeDef, TypeId, TypeKind,
    VarKind,
};
use rustc_hash::FxHashMap;

/// Register every top-level declaration except `impl` methods.
#[tracing::instrument(level = "debug", skip_all, fields(count = ast.items.len()))]
pub fn register_toplevel_decls(mut module: Module, ast: &ast::Module) -> Result<Module> {
    let root = module.root;
    for item in &ast.items {
        match &item.kind {
            ItemKind::Type(decl) => {
                declare_type(&mut module, decl, item.span)?;
            }
            ItemKind::Template(decl) => {
                let template = module.templates.push(TemplateDef {
                    name: decl.name.clone(),
                    params: decl.params.clone(),
                    body: decl.body.clone(),
                    scope: root,
                    impls: Vec::new(),
                    instances: FxHashMap::default(),
                    span: item.span,
                });
                module
                    .register_type(root, &decl.name, TypeBinding::Template(template))
                    .at(item.span)?;
            }
            ItemKind::Enum(decl) => declare_enum(&mut module, decl, item.span)?,
            ItemKind::Function(decl) => {
                declare_function(&mut module, root, root, decl, FunctionKind::Function, None)?;
            }
            ItemKind::Macro(decl) => {
                declare_function(&mut module, root, root, decl, FunctionKind::Macro, None)?;
            }
            ItemKind::Const(decl) => {
                let ty = match &decl.ty {
                    Some(expr) => untranslated(&mut module, expr, root),
                    None => TypeId::UNKNOWN,
                };
                let symbol = symbol_in(&mut module, root, &decl.name);
                let id = module.consts.push(ConstDef {
                    name: decl.name.clone(),
                    symbol,
                    ty,
                    init: ConstInit::Pending(decl.init.clone()),
                    value: None,
                    span: item.span,
                });
                module
                    .register_value(root, &decl.name, Binding::Const(id))
                    .at(item.span)?;
            }
            ItemKind::Impl(_) => {}
            ItemKind::Asm(asm) => module.asm.push(AsmBlock::Pending(asm.clone())),
        }
    }
    tracing::debug!(
        types = module.types.len(),
        functions = module.funcs.len(),
        templates = module.templates.len(),
        "registered declarations"
    );
    Ok(module)
}

/// Register the methods of every `impl` block.
#[tracing::instrument(level = "debug", skip_all)]
pub fn register_toplevel_methods(mut module: Module, ast: &ast::Module) -> Result<Module> {
    let root = module.root;
    for item in &ast.items {
        let ItemKind::Impl(block) = &item.kind else {
            continue;
        };
        if let ast::TypeExprKind::Apply { name, .. } = &block.target.kind {
            let TypeBinding::Template(template) = module.lookup_type(root, name).at(item.span)?
            else {
                return Err(CompileError::type_mismatch(
                    "a template",
                    format!("type `{name}`"),
                    block.target.span,
                ));
            };
            module.templates[template].impls.push(block.clone());
            continue;
        }
        if !block.params.is_empty() {
            return Err(CompileError::type_mismatch(
                "a template target for a parameterized impl",
                "a plain type",
                block.target.span,
            ));
        }
        let owner = crate::translate::translate_type_expr(&mut module, root, &block.target)?;
        let Some(scope) = module.kind(owner).scope() else {
            return Err(CompileError::type_mismatch(
                "a declared type",
                format!("`{}`", module.display_type(owner)),
                block.target.span,
            ));
        };
        for method in &block.methods {
            let kind = if method.is_macro() {
                FunctionKind::Macro
            } else {
                FunctionKind::Function
            };
            declare_function(&mut module, scope, scope, method.decl(), kind, Some(owner))?;
        }
    }
    Ok(module)
}

fn declare_type(module: &mut Module, decl: &ast::TypeDecl, span: gi_ir::Span) -> Result<TypeId> {
    let root = module.root;
    let scope = module.new_scope(root, &decl.name, None);
    let super_ = decl
        .super_
        .as_ref()
        .map(|expr| untranslated(module, expr, scope));
    let ty = module.new_type(
        TypeKind::Def(TypeDef {
            name: decl.name.clone(),
            symbol: module.scopes[scope].name.clone(),
            super_,
            scope,
        }),
        span,
    );
    module
        .register_type(root, &decl.name, TypeBinding::Type(ty))
        .at(span)?;
    module
        .register_type(scope, "Self", TypeBinding::Type(ty))
        .at(span)?;
    Ok(ty)
}

fn declare_enum(module: &mut Module, decl: &ast::EnumDecl, span: gi_ir::Span) -> Result<()> {
    let root = module.root;
    let scope = module.new_scope(root, &decl.name, None);
    let enum_ = module.new_type(
        TypeKind::Enum(EnumType {
            name: decl.name.clone(),
            symbol: module.scopes[scope].name.clone(),
            scope,
            variants: Vec::new(),
        }),
        span,
    );
    module
        .register_type(root, &decl.name, TypeBinding::Type(enum_))
        .at(span)?;
    module
        .register_type(scope, "Self", TypeBinding::Type(enum_))
        .at(span)?;

    let mut variants = Vec::with_capacity(decl.variants.len());
    for (discriminant, variant) in (0u32..).zip(&decl.variants) {
        let vscope = module.new_scope(scope, &variant.name, None);
        let mut fields = Vec::with_capacity(variant.fields.len() + 1);
        fields.push(TypeId::DISCRIMINANT);
        for field in &variant.fields {
            fields.push(untranslated(module, field, vscope));
        }
        let ty = module.new_type(
            TypeKind::EnumValue(EnumValueType {
                name: variant.name.clone(),
                symbol: module.scopes[vscope].name.clone(),
                enum_,
                discriminant,
                fields,
                scope: vscope,
            }),
            variant.span.or(span),
        );
        module
            .register_type(scope, &variant.name, TypeBinding::Type(ty))
            .at(variant.span.or(span))?;
        module
            .register_type(vscope, "Self", TypeBinding::Type(ty))
            .at(span)?;
        variants.push(ty);
    }
    if let TypeKind::Enum(e) = &mut module.types[enum_].kind {
        e.variants = variants;
    }
    Ok(())
}

/// Declare a function or macro.
///
/// The function's own scope is created under `parent`; the name is bound in
/// `register_in` (the root or a type scope). Parameters become argument
/// variables of the function scope. An untyped `self` takes the `owner`
/// type.
pub(crate) fn declare_function(
    module: &mut Module,
    parent: ScopeId,
    register_in: ScopeId,
    decl: &ast::FunctionDecl,
    kind: FunctionKind,
    owner: Option<TypeId>,
) -> Result<FuncId> {
    let func = module.funcs.next_id();
    let scope = module.new_scope(parent, &decl.name, Some(func));

    let mut params = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        let ty = match (&param.ty, owner) {
            (Some(expr), _) => untranslated(module, expr, scope),
            (None, Some(owner)) if param.name == "self" => owner,
            (None, _) => {
                return Err(CompileError::type_mismatch(
                    "a parameter type",
                    format!("untyped parameter `{}`", param.name),
                    param.span.or(decl.span),
                ))
            }
        };
        let var = module.new_var(&param.name, ty, VarKind::Arg, param.span);
        module
            .register_value(scope, &param.name, Binding::Var(var))
            .at(param.span.or(decl.span))?;
        params.push(var);
    }

    let ret = match &decl.ret {
        Some(expr) => untranslated(module, expr, scope),
        None => TypeId::VOID,
    };
    let body = match (&decl.body, kind) {
        (Some(stmts), _) => FunctionBody::Pending(stmts.clone()),
        (None, FunctionKind::Function) => FunctionBody::Import,
        (None, FunctionKind::Macro) => {
            return Err(CompileError::type_mismatch(
                "a macro body",
                format!("body-less macro `{}`", decl.name),
                decl.span,
            ))
        }
    };

    let symbol = module.scopes[scope].name.clone();
    module.funcs.push(FunctionDef {
        name: decl.name.clone(),
        symbol,
        kind,
        params,
        ret,
        scope,
        body,
        locals: Vec::new(),
        owner,
        span: decl.span,
    });
    module
        .register_function(register_in, &decl.name, func)
        .at(decl.span)?;
    Ok(func)
}

/// A type slot awaiting translation in `scope`.
pub(crate) fn untranslated(module: &mut Module, expr: &ast::TypeExpr, scope: ScopeId) -> TypeId {
    module.new_type(
        TypeKind::Untranslated {
            expr: expr.clone(),
            scope,
        },
        expr.span,
    )
}

fn symbol_in(module: &mut Module, scope: ScopeId, name: &str) -> String {
    let target = &mut module.scopes[scope];
    let child = target.fresh_child_name(name);
    format!("{}.{child}", target.name)
}
