//! Assembling, validating and running emitted modules.
//!
//! Every module the end-to-end tests compile is assembled with `wat` and
//! checked by `wasmparser`'s validator. Programs without host imports can
//! also be instantiated on `wasmtime` with the GC proposal enabled and
//! their exported functions called.

use wasmparser::{Validator, WasmFeatures};
use wasmtime::{Config, Engine, Instance, Module, Store, Val};

/// Assemble `text` and validate the binary. Panics with the text on
/// failure.
pub fn validate(text: &str) -> Vec<u8> {
    let bytes = wat::parse_str(text).unwrap_or_else(|err| panic!("{err}\n{text}"));
    Validator::new_with_features(WasmFeatures::all())
        .validate_all(&bytes)
        .unwrap_or_else(|err| panic!("{err}\n{text}"));
    bytes
}

/// An instantiated module.
pub struct Wasm {
    store: Store<()>,
    instance: Instance,
}

impl Wasm {
    pub fn new(text: &str) -> Self {
        let bytes = validate(text);
        let mut config = Config::new();
        config.wasm_function_references(true).wasm_gc(true);
        let engine = Engine::new(&config).unwrap();
        let module = Module::new(&engine, &bytes).unwrap();
        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[]).unwrap();
        Wasm { store, instance }
    }

    /// Call the export `name`, returning its single result.
    pub fn call(&mut self, name: &str, args: &[Val]) -> Val {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .unwrap_or_else(|| panic!("`{name}` is not exported"));
        let mut results = [Val::I32(0)];
        func.call(&mut self.store, args, &mut results).unwrap();
        let [result] = results;
        result
    }

    /// Call an export taking and returning `i32`s.
    pub fn call_i32(&mut self, name: &str, args: &[i32]) -> i32 {
        let args: Vec<Val> = args.iter().copied().map(Val::I32).collect();
        self.call(name, &args).unwrap_i32()
    }
}
