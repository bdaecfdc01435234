//! Pass ordering.
//!
//! Each pass takes the module by value and hands it to the next, so there
//! is exactly one owner of the IR at any time. Registration reads the
//! syntax tree; every later pass works from the module alone.

use gi_diagnostic::Result;
use gi_ir::{ast, Module};

use crate::{
    check_lowered, check_no_unknown_types, check_no_untranslated, convert_enum_inst,
    drop_unused_results, inline_macros, instantiate_templates, propagate_types,
    register_toplevel_decls, register_toplevel_methods, resolve_member_access, sort_types,
    specialize_matches, translate_function_defs, translate_toplevel_type_decls, CompileOptions,
};

/// One whole-module pass after registration.
#[derive(Copy, Clone)]
pub struct Pass {
    pub name: &'static str,
    pub run: fn(Module, &CompileOptions) -> Result<Module>,
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// The passes following registration, in order.
pub const PASSES: &[Pass] = &[
    Pass {
        name: "translate_toplevel_type_decls",
        run: translate_toplevel_type_decls,
    },
    Pass {
        name: "translate_function_defs",
        run: translate_function_defs,
    },
    Pass {
        name: "instantiate_templates",
        run: instantiate_templates,
    },
    Pass {
        name: "resolve_member_access",
        run: resolve_member_access,
    },
    Pass {
        name: "propagate_types",
        run: propagate_types,
    },
    Pass {
        name: "drop_unused_results",
        run: drop_unused_results,
    },
    Pass {
        name: "specialize_matches",
        run: specialize_matches,
    },
    Pass {
        name: "check_no_untranslated",
        run: check_no_untranslated,
    },
    Pass {
        name: "check_no_unknown_types",
        run: check_no_unknown_types,
    },
    Pass {
        name: "convert_enum_inst",
        run: convert_enum_inst,
    },
    Pass {
        name: "inline_macros",
        run: inline_macros,
    },
    Pass {
        name: "check_lowered",
        run: check_lowered,
    },
    Pass {
        name: "sort_types",
        run: sort_types,
    },
];

/// Run the whole pipeline.
pub fn analyze(ast: &ast::Module, options: &CompileOptions) -> Result<Module> {
    analyze_until(ast, options, None)
}

/// Run registration and the passes up to and including `last`, or all of
/// them for `None`.
pub fn analyze_until(
    ast: &ast::Module,
    options: &CompileOptions,
    last: Option<&str>,
) -> Result<Module> {
    let module = register_toplevel_decls(Module::new(), ast)?;
    let mut module = register_toplevel_methods(module, ast)?;
    for pass in PASSES {
        let _span = tracing::debug_span!("pass", name = pass.name).entered();
        module = (pass.run)(module, options)?;
        if last == Some(pass.name) {
            break;
        }
    }
    Ok(module)
}
