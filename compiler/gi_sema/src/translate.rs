//! Passes 2 and 3: translation out of the syntax tree.
//!
//! Pass 2 ([`translate_toplevel_type_decls`]) resolves every type expression
//! in a signature or declaration into a type entry. Pass 3
//! ([`translate_function_defs`]) turns function, macro and constant bodies
//! into IR expressions; see [`body`].

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::ast::{self, TypeExprKind};
use gi_ir::{
    ConstInit, FuncId, FunctionBody, Module, NativeType, ScopeId, TupleType, TypeBinding, TypeId,
    TypeKind,
};

mod body;


pub(crate) use body::BodyTranslator;

/// Resolve a type expression in `scope`.
///
/// Named types resolve through the scope chain; structural expressions
/// create fresh entries. `Box[i32]` becomes a `TemplateInst` entry, which
/// template instantiation replaces later.
pub(crate) fn translate_type_expr(
    module: &mut Module,
    scope: ScopeId,
    expr: &ast::TypeExpr,
) -> Result<TypeId> {
    let kind = match &expr.kind {
        TypeExprKind::Named(name) => {
            return match module.lookup_type(scope, name).at(expr.span)? {
                TypeBinding::Type(ty) => Ok(ty),
                TypeBinding::Template(_) => Err(CompileError::type_mismatch(
                    format!("type arguments for template `{name}`"),
                    "a bare template name",
                    expr.span,
                )),
            };
        }
        TypeExprKind::Member(base, name) => {
            let base = translate_type_expr(module, scope, base)?;
            let found = module
                .kind(base)
                .scope()
                .and_then(|s| module.scopes[s].type_(name));
            return match found {
                Some(TypeBinding::Type(ty)) => Ok(ty),
                _ => Err(CompileError::unimplemented_member(
                    module.display_type(base),
                    name.clone(),
                    expr.span,
                )),
            };
        }
        TypeExprKind::Tuple(fields) if fields.is_empty() => return Ok(TypeId::VOID),
        TypeExprKind::Tuple(fields) => {
            let mut types = Vec::with_capacity(fields.len());
            for field in fields {
                types.push(translate_type_expr(module, scope, &field.ty)?);
            }
            let names = if fields.iter().any(|f| f.name.is_some()) {
                fields.iter().map(|f| f.name.clone()).collect()
            } else {
                Vec::new()
            };
            TypeKind::Tuple(TupleType {
                fields: types,
                names,
            })
        }
        TypeExprKind::Array(elem) => TypeKind::Array(translate_type_expr(module, scope, elem)?),
        TypeExprKind::NativeArray(elem) => {
            TypeKind::NativeArray(translate_type_expr(module, scope, elem)?)
        }
        TypeExprKind::Native {
            name,
            packed,
            signed,
        } => TypeKind::Native(NativeType {
            name: name.clone(),
            packed: packed.clone(),
            signed: *signed,
        }),
        TypeExprKind::Apply { name, args } => {
            let TypeBinding::Template(template) =
                module.lookup_type(scope, name).at(expr.span)?
            else {
                return Err(CompileError::type_mismatch(
                    "a template",
                    format!("type `{name}`"),
                    expr.span,
                ));
            };
            let expected = module.templates[template].params.len();
            if expected != args.len() {
                return Err(CompileError::type_mismatch(
                    format!("{expected} type argument(s) for `{name}`"),
                    format!("{}", args.len()),
                    expr.span,
                ));
            }
            let mut translated = Vec::with_capacity(args.len());
            for arg in args {
                translated.push(translate_type_expr(module, scope, arg)?);
            }
            TypeKind::TemplateInst {
                template,
                args: translated,
            }
        }
    };
    Ok(module.new_type(kind, expr.span))
}

/// Translate `ty` if it is still an `Untranslated` slot.
pub(crate) fn translate_slot(module: &mut Module, ty: TypeId) -> Result<TypeId> {
    match module.kind(ty) {
        TypeKind::Untranslated { expr, scope } => {
            let (expr, scope) = (expr.clone(), *scope);
            translate_type_expr(module, scope, &expr)
        }
        _ => Ok(ty),
    }
}

/// Pass 2: resolve every type slot of every declaration.
#[tracing::instrument(level = "debug", skip_all, fields(count = module.types.len()))]
pub fn translate_toplevel_type_decls(
    mut module: Module,
    _options: &crate::CompileOptions,
) -> Result<Module> {
    for ty in module.types.ids() {
        match &module.types[ty].kind {
            TypeKind::Def(def) => {
                let Some(super_) = def.super_ else {
                    continue;
                };
                let super_ = translate_slot(&mut module, super_)?;
                if let TypeKind::Def(def) = &mut module.types[ty].kind {
                    def.super_ = Some(super_);
                }
            }
            TypeKind::EnumValue(value) => {
                let fields = value.fields.clone();
                let mut translated = Vec::with_capacity(fields.len());
                for field in fields {
                    translated.push(translate_slot(&mut module, field)?);
                }
                if let TypeKind::EnumValue(value) = &mut module.types[ty].kind {
                    value.fields = translated;
                }
            }
            _ => {}
        }
    }

    for func in module.funcs.ids() {
        translate_signature(&mut module, func)?;
    }

    for id in module.consts.ids() {
        let ty = module.consts[id].ty;
        module.consts[id].ty = translate_slot(&mut module, ty)?;
    }

    for template in module.templates.ids() {
        validate_template(&mut module, template)?;
    }
    Ok(module)
}

/// Resolve the parameter and return types of one function.
pub(crate) fn translate_signature(module: &mut Module, func: FuncId) -> Result<()> {
    for param in module.funcs[func].params.clone() {
        let ty = module.vars[param].ty;
        module.vars[param].ty = translate_slot(module, ty)?;
    }
    let ret = module.funcs[func].ret;
    module.funcs[func].ret = translate_slot(module, ret)?;
    Ok(())
}

/// Translate a template body once with its parameters unbound, so unknown
/// names are reported even if the template is never instantiated.
fn validate_template(module: &mut Module, template: gi_ir::TemplateId) -> Result<()> {
    let def = &module.templates[template];
    let Some(body) = def.body.clone() else {
        return Ok(());
    };
    let (name, params, parent) = (def.name.clone(), def.params.clone(), def.scope);
    let scope = module.new_scope(parent, &format!("{name}.__generic"), None);
    let mut param_types = Vec::with_capacity(params.len());
    for param in &params {
        let ty = module.new_type(
            TypeKind::TemplateParam {
                name: param.clone(),
                template,
            },
            body.span,
        );
        module
            .register_type(scope, param, TypeBinding::Type(ty))
            .at(body.span)?;
        param_types.push(ty);
    }
    let self_ty = module.new_type(
        TypeKind::TemplateInst {
            template,
            args: param_types,
        },
        body.span,
    );
    module
        .register_type(scope, "Self", TypeBinding::Type(self_ty))
        .at(body.span)?;
    translate_type_expr(module, scope, &body)?;
    Ok(())
}

/// Pass 3: translate function, macro and constant bodies and top-level
/// assembly into IR expressions.
#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn translate_function_defs(
    mut module: Module,
    _options: &crate::CompileOptions,
) -> Result<Module> {
    for func in module.funcs.ids() {
        translate_function(&mut module, func)?;
    }

    let root = module.root;
    for id in module.consts.ids() {
        if let ConstInit::Pending(init) = &module.consts[id].init {
            let init = init.clone();
            let lowered = BodyTranslator::new(&mut module, root).expr(&init)?;
            module.consts[id].init = ConstInit::Lowered(lowered);
        }
    }

    for index in 0..module.asm.len() {
        if let gi_ir::AsmBlock::Pending(asm) = &module.asm[index] {
            let asm = asm.clone();
            let terms = BodyTranslator::new(&mut module, root).asm_terms(&asm.terms)?;
            module.asm[index] = gi_ir::AsmBlock::Lowered(terms);
        }
    }
    Ok(module)
}

/// Translate one function's pending body in its own scope.
pub(crate) fn translate_function(module: &mut Module, func: FuncId) -> Result<()> {
    let FunctionBody::Pending(stmts) = &module.funcs[func].body else {
        return Ok(());
    };
    let stmts = stmts.clone();
    let scope = module.funcs[func].scope;
    let body = BodyTranslator::new(module, scope).stmts(&stmts)?;
    module.funcs[func].body = FunctionBody::Lowered(body);
    Ok(())
}
