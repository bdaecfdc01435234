//! Pass 4: template instantiation.
//!
//! Every `TemplateInst` type entry whose arguments are concrete is replaced
//! by a declared type, created on first use and memoized in the template by
//! the arguments' identity keys. Two uses of `Box[i32]` therefore end up
//! as the same `TypeId`. An instance whose arguments still mention a
//! template parameter is left in place.
//!
//! Instantiating a template also declares the methods of its `impl[T]`
//! blocks inside the instance's scope, with the impl parameters bound to
//! the instance arguments, and translates their signatures and bodies.
//!
//! Once the type arena has reached a fixpoint, every type slot in the
//! module (type entries, variables, signatures, constants, and expression
//! type slots) is redirected from the instance request to the instance.

use gi_diagnostic::{CompileError, Result, ResultExt};
use gi_ir::ast::{self, TypeExprKind};
use gi_ir::visitor::MutVisitor;
use gi_ir::{FunctionKind, Module, ScopeId, Span, TemplateId, TypeBinding, TypeDef, TypeId, TypeKind};
use rustc_hash::FxHashMap;

use crate::bodies::{asm_expr, asm_terms, for_each_asm, for_each_body, for_each_const, Bodies};
use crate::register::declare_function;
use crate::translate::{translate_function, translate_signature, translate_type_expr};
use crate::CompileOptions;

#[tracing::instrument(level = "debug", skip_all, fields(count = module.templates.len()))]
pub fn instantiate_templates(mut module: Module, _options: &CompileOptions) -> Result<Module> {
    let mut instances = Instantiator::default();

    let mut index = 0;
    while index < module.types.len() {
        let ty = TypeId::new(u32::try_from(index).map_err(|_| {
            CompileError::internal("type arena exceeds u32 ids", Span::DUMMY)
        })?);
        instances.resolve(&mut module, ty)?;
        instances.resolve_entry(&mut module, ty)?;
        index += 1;
    }

    instances.redirect_slots(&mut module)?;
    tracing::debug!(instances = instances.map.len(), "instantiated templates");
    Ok(module)
}

#[derive(Default)]
struct Instantiator {
    /// Instance requests already resolved, by request id.
    map: FxHashMap<TypeId, TypeId>,
}

impl Instantiator {
    /// The type `ty` stands for once instantiated. Unchanged for anything
    /// that is not a concrete instance request.
    fn resolve(&mut self, module: &mut Module, ty: TypeId) -> Result<TypeId> {
        if let Some(&done) = self.map.get(&ty) {
            return Ok(done);
        }
        let TypeKind::TemplateInst { template, args } = module.kind(ty) else {
            return Ok(ty);
        };
        let (template, args) = (*template, args.clone());
        let span = module.types[ty].span;

        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(self.resolve(module, arg)?);
        }
        if resolved.iter().any(|&arg| module.contains_template_param(arg)) {
            return Ok(ty);
        }
        let instance = gi_stack::ensure_sufficient_stack(|| {
            instantiate(module, template, &resolved, span)
        })?;
        self.map.insert(ty, instance);
        Ok(instance)
    }

    /// Redirect the type slots held by the entry `ty` itself.
    fn resolve_entry(&mut self, module: &mut Module, ty: TypeId) -> Result<()> {
        match module.kind(ty).clone() {
            TypeKind::Def(TypeDef {
                super_: Some(super_),
                ..
            }) => {
                let super_ = self.resolve(module, super_)?;
                if let TypeKind::Def(def) = &mut module.types[ty].kind {
                    def.super_ = Some(super_);
                }
            }
            TypeKind::Tuple(tuple) => {
                let fields = self.resolve_all(module, &tuple.fields)?;
                if let TypeKind::Tuple(tuple) = &mut module.types[ty].kind {
                    tuple.fields = fields;
                }
            }
            TypeKind::EnumValue(value) => {
                let fields = self.resolve_all(module, &value.fields)?;
                if let TypeKind::EnumValue(value) = &mut module.types[ty].kind {
                    value.fields = fields;
                }
            }
            TypeKind::Array(elem) => {
                let elem = self.resolve(module, elem)?;
                module.types[ty].kind = TypeKind::Array(elem);
            }
            TypeKind::NativeArray(elem) => {
                let elem = self.resolve(module, elem)?;
                module.types[ty].kind = TypeKind::NativeArray(elem);
            }
            TypeKind::TemplateInst { template, args } => {
                let args = self.resolve_all(module, &args)?;
                module.types[ty].kind = TypeKind::TemplateInst { template, args };
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve_all(&mut self, module: &mut Module, types: &[TypeId]) -> Result<Vec<TypeId>> {
        types.iter().map(|&ty| self.resolve(module, ty)).collect()
    }

    /// Point every remaining slot outside the type arena at its instance.
    fn redirect_slots(&self, module: &mut Module) -> Result<()> {
        if self.map.is_empty() {
            return Ok(());
        }
        let lookup = |ty: TypeId| self.map.get(&ty).copied().unwrap_or(ty);

        for var in module.vars.ids() {
            module.vars[var].ty = lookup(module.vars[var].ty);
        }
        for func in module.funcs.ids() {
            module.funcs[func].ret = lookup(module.funcs[func].ret);
        }
        for id in module.consts.ids() {
            module.consts[id].ty = lookup(module.consts[id].ty);
        }

        let mut redirect = Redirect { map: &self.map };
        for_each_body(module, Bodies::All, |_, _, body| redirect.visit_body(body))?;
        for_each_const(module, |_, _, init| redirect.visit_expr(init))?;
        for_each_asm(module, |_, terms| {
            let mut expr = asm_expr(terms);
            let result = redirect.visit_expr(&mut expr);
            asm_terms(expr, terms);
            result
        })
    }
}

struct Redirect<'a> {
    map: &'a FxHashMap<TypeId, TypeId>,
}

impl MutVisitor for Redirect<'_> {
    type Error = CompileError;

    fn visit_type(&mut self, ty: &mut TypeId) -> Result<()> {
        if let Some(&instance) = self.map.get(ty) {
            *ty = instance;
        }
        Ok(())
    }
}

/// The instance of `template` for `args`, creating it on a cache miss.
fn instantiate(
    module: &mut Module,
    template: TemplateId,
    args: &[TypeId],
    span: Span,
) -> Result<TypeId> {
    let key: Vec<String> = args.iter().map(|&arg| module.type_key(arg)).collect();
    if let Some(&instance) = module.templates[template].instances.get(&key) {
        tracing::trace!(template = %module.templates[template].name, ?key, "template cache hit");
        return Ok(instance);
    }

    let def = &module.templates[template];
    let (params, body, parent) = (def.params.clone(), def.body.clone(), def.scope);
    let display: Vec<String> = args.iter().map(|&arg| module.display_type(arg)).collect();
    let name = format!("{}[{}]", def.name, display.join(", "));
    tracing::debug!(%name, "instantiating template");

    let scope = module.new_scope(parent, &name, None);
    let symbol = module.scopes[scope].name.clone();
    let instance = module.new_type(
        TypeKind::Def(TypeDef {
            name,
            symbol,
            super_: None,
            scope,
        }),
        span,
    );
    // Cached before the body is translated, so the body may name the
    // instance it belongs to.
    module.templates[template].instances.insert(key, instance);

    module
        .register_type(scope, "Self", TypeBinding::Type(instance))
        .at(span)?;
    for (param, &arg) in params.iter().zip(args) {
        module
            .register_type(scope, param, TypeBinding::Type(arg))
            .at(span)?;
    }

    if let Some(body) = body {
        let super_ = translate_type_expr(module, scope, &body)?;
        if let TypeKind::Def(def) = &mut module.types[instance].kind {
            def.super_ = Some(super_);
        }
    }

    for block in module.templates[template].impls.clone() {
        attach_impl(module, &block, scope, instance, args)?;
    }
    Ok(instance)
}

/// Declare the methods of a template `impl` block on one instance.
fn attach_impl(
    module: &mut Module,
    block: &ast::ImplBlock,
    instance_scope: ScopeId,
    instance: TypeId,
    args: &[TypeId],
) -> Result<()> {
    let scope = module.new_scope(instance_scope, "__impl", None);
    if let TypeExprKind::Apply {
        args: target_args, ..
    } = &block.target.kind
    {
        for (target_arg, &arg) in target_args.iter().zip(args) {
            if let TypeExprKind::Named(param) = &target_arg.kind {
                if block.params.contains(param) {
                    module
                        .register_type(scope, param, TypeBinding::Type(arg))
                        .at(target_arg.span)?;
                }
            }
        }
    }

    for method in &block.methods {
        let kind = if method.is_macro() {
            FunctionKind::Macro
        } else {
            FunctionKind::Function
        };
        let func = declare_function(
            module,
            scope,
            instance_scope,
            method.decl(),
            kind,
            Some(instance),
        )?;
        translate_signature(module, func)?;
        translate_function(module, func)?;
    }
    Ok(())
}
