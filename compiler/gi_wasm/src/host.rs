//! Running instruction sequences at compile time.
//!
//! A sequence is wrapped as the body of the only function of a host module,
//! `(module (func (export "__main") (result t) ...))`, assembled and run on
//! `wasmtime`. The compiler uses this to evaluate inline-assembly macros
//! whose arguments are known while compiling.

use std::sync::OnceLock;

use gi_diagnostic::{CompileError, Result};
use gi_ir::Span;
use wasmtime::{Engine, Instance, Module, Store, Val};

use crate::printer::{print, PrintConfig};
use crate::term::Term;

/// Export name of the host function.
pub const ENTRY: &str = "__main";

fn engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::default)
}

/// `(module (func (export "__main") (result <result>) body...))`
pub fn host_module(result: &str, body: Vec<Term>) -> Term {
    let mut func = vec![
        Term::atom("func"),
        Term::instr("export", [Term::Str(ENTRY.to_string())]),
        Term::instr("result", [Term::atom(result)]),
    ];
    func.extend(body);
    Term::instr("module", [Term::List(func)])
}

/// Run `body` as a host function returning `result` (`i32` or `i64`).
///
/// `i32` results are sign-extended. Assembly errors and traps become
/// [`CompileError::ConstEval`] at `span`.
#[tracing::instrument(level = "trace", skip_all, fields(result = %result))]
pub fn evaluate(result: &str, body: Vec<Term>, span: Span) -> Result<i64> {
    let text = print(&host_module(result, body), PrintConfig::default());
    tracing::trace!(%text, "running host module");
    let failed = |what: &str, err: &wasmtime::Error| {
        CompileError::const_eval(format!("{what}: {err:#}"), span)
    };

    let module = Module::new(engine(), &text).map_err(|err| failed("cannot assemble", &err))?;
    let mut store = Store::new(engine(), ());
    let instance =
        Instance::new(&mut store, &module, &[]).map_err(|err| failed("cannot instantiate", &err))?;
    let Some(main) = instance.get_func(&mut store, ENTRY) else {
        return Err(CompileError::internal("host module without an entry point", span));
    };
    let mut results = [Val::I64(0)];
    main.call(&mut store, &[], &mut results)
        .map_err(|err| failed("evaluation failed", &err))?;

    match results {
        [Val::I32(value)] => Ok(i64::from(value)),
        [Val::I64(value)] => Ok(value),
        _ => Err(CompileError::const_eval(
            format!("`{result}` is not an integer result"),
            span,
        )),
    }
}
