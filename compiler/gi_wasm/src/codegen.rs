//! Module assembly.
//!
//! The emitted module lists, in order: host imports, type declarations in
//! dependency order, one signature type per function, globals for
//! constants, functions, then top-level inline assembly. Macros exist only
//! at compile time and are not emitted.

use gi_diagnostic::{CompileError, Result};
use gi_ir::{AsmBlock, ConstInit, FunctionBody, FunctionDef, Module};

use crate::body::BodyGen;
use crate::names::{mangle, signature, symbol};
use crate::term::Term;
use crate::types::Types;

/// Build the term tree of `module`, which must have been through the whole
/// semantic pipeline.
#[tracing::instrument(level = "debug", skip_all, fields(count = module.funcs.len()))]
pub fn generate(module: &Module) -> Result<Term> {
    let types = Types::new(module);
    let gen = BodyGen {
        module,
        types: &types,
    };

    let mut items = vec![Term::atom("module")];
    let functions: Vec<&FunctionDef> = module
        .funcs
        .iter()
        .map(|(_, def)| def)
        .filter(|def| !def.is_macro())
        .collect();

    for def in functions.iter().filter(|def| def.is_import()) {
        items.push(import(module, &types, def)?);
    }
    items.extend(types.declarations()?);
    for def in &functions {
        items.push(signature_type(module, &types, def)?);
    }
    for (_, def) in module.consts.iter() {
        items.push(global(module, &types, def)?);
    }
    for def in functions.iter().filter(|def| !def.is_import()) {
        items.push(function(&gen, def)?);
    }
    for block in &module.asm {
        let AsmBlock::Lowered(terms) = block else {
            return Err(CompileError::internal(
                "top-level assembly reached code generation untranslated",
                gi_ir::Span::DUMMY,
            ));
        };
        for term in terms {
            items.extend(gen.asm_term(term)?);
        }
    }
    tracing::debug!(fields = items.len() - 1, "assembled module");
    Ok(Term::List(items))
}

fn param_types(module: &Module, def: &FunctionDef) -> Vec<gi_ir::TypeId> {
    def.params.iter().map(|&param| module.vars[param].ty).collect()
}

/// `(type $__fn.f (func (param t)... (result t)))`
fn signature_type(module: &Module, types: &Types<'_>, def: &FunctionDef) -> Result<Term> {
    let entries = types.signature(&param_types(module, def), def.ret, def.span)?;
    Ok(Term::instr(
        "type",
        [signature(&def.symbol), Term::instr("func", entries)],
    ))
}

/// `(import "env" "name" (func $f (type $__fn.f) (param t)... (result t)))`
fn import(module: &Module, types: &Types<'_>, def: &FunctionDef) -> Result<Term> {
    let mut func = vec![
        Term::atom("func"),
        symbol(&def.symbol),
        Term::instr("type", [signature(&def.symbol)]),
    ];
    func.extend(types.signature(&param_types(module, def), def.ret, def.span)?);
    Ok(Term::instr(
        "import",
        [
            Term::Str("env".to_string()),
            Term::Str(def.name.clone()),
            Term::List(func),
        ],
    ))
}

/// `(global $C t (t.const value))`
fn global(module: &Module, types: &Types<'_>, def: &gi_ir::ConstDef) -> Result<Term> {
    let ty = types.required_value_type(def.ty, def.span)?;
    let (Some(native), Some(value)) = (module.native(def.ty), def.value) else {
        return Err(CompileError::internal(
            format!("constant `{}` has no integer value", def.name),
            def.span,
        ));
    };
    if let ConstInit::Pending(_) = def.init {
        return Err(CompileError::internal(
            format!("constant `{}` reached code generation untranslated", def.name),
            def.span,
        ));
    }
    Ok(Term::instr(
        "global",
        [symbol(&def.symbol), ty, Term::constant(&native.name, value)],
    ))
}

fn function(gen: &BodyGen<'_>, def: &FunctionDef) -> Result<Term> {
    let module = gen.module;
    let FunctionBody::Lowered(body) = &def.body else {
        return Err(CompileError::internal(
            format!("`{}` reached code generation untranslated", def.symbol),
            def.span,
        ));
    };
    let mut items = vec![
        Term::atom("func"),
        symbol(&def.symbol),
        Term::instr("type", [signature(&def.symbol)]),
    ];
    for &param in &def.params {
        let var = &module.vars[param];
        items.push(Term::instr(
            "param",
            [
                Term::ident(&mangle(&var.local_name)),
                gen.types.required_value_type(var.ty, var.span)?,
            ],
        ));
    }
    if let Some(ret) = gen.types.value_type(def.ret, def.span)? {
        items.push(Term::instr("result", [ret]));
    }
    for &local in &def.locals {
        let var = &module.vars[local];
        if let Some(ty) = gen.types.value_type(var.ty, var.span)? {
            items.push(Term::instr(
                "local",
                [Term::ident(&mangle(&var.local_name)), ty],
            ));
        }
    }
    gen.body(body, def.ret, &mut items)?;
    tracing::trace!(function = %def.symbol, "emitted function");
    Ok(Term::List(items))
}

#[cfg(test)]
mod tests;
