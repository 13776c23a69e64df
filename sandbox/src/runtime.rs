//! Wasmtime engine: module compilation, instantiation, and guest calls.
//!
//! `WasmtimeEngine` implements the [`Engine`] capability on top of
//! Wasmtime. Each instance gets its own `Store<HostState>` carrying the
//! invocation context, the memory limiter, and a fuel budget that is
//! refilled before every call.

use std::path::Path;

use tracing::debug;
use wasmtime::{
    Config, ExternType, Instance, Linker, Memory, Module, Store, Trap, ValType, WasmBacktrace,
};

use bridge_hostapi::{HostError, InvocationContext};

use crate::config::SandboxConfig;
use crate::engine::{Engine, ExportDecl, GuestInstance};
use crate::error::{SandboxError, TrapError};
use crate::host_impl::HostState;
use crate::linker::define_imports;
use crate::memory::MemoryView;
use crate::registry::{DeclaredType, ImportBinding, ImportDecl, Signature};
use crate::validation::{validate_module, MEMORY_EXPORT};

/// The shipped [`Engine`]: Wasmtime with fuel metering and deterministic
/// feature settings.
pub struct WasmtimeEngine {
    engine: wasmtime::Engine,
    fuel_limit: u64,
    max_memory_bytes: usize,
}

impl WasmtimeEngine {
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        config.validate()?;
        Ok(Self {
            engine: create_engine()?,
            fuel_limit: config.fuel_limit,
            max_memory_bytes: config.max_memory_bytes(),
        })
    }
}

impl Engine for WasmtimeEngine {
    type Module = Module;
    type Instance = WasmtimeInstance;

    fn compile(&self, bytes: &[u8]) -> Result<Module, SandboxError> {
        let module = Module::new(&self.engine, bytes)?;
        validate_module(&module)?;
        debug!(size = bytes.len(), "module compiled");
        Ok(module)
    }

    fn compile_file(&self, path: &Path) -> Result<Module, SandboxError> {
        let module = Module::from_file(&self.engine, path)?;
        validate_module(&module)?;
        debug!(path = %path.display(), "module compiled");
        Ok(module)
    }

    fn imports(&self, module: &Module) -> Vec<ImportDecl> {
        module
            .imports()
            .map(|import| ImportDecl {
                namespace: import.module().to_string(),
                name: import.name().to_string(),
                ty: declared_type(&import.ty()),
            })
            .collect()
    }

    fn exports(&self, module: &Module) -> Vec<ExportDecl> {
        module
            .exports()
            .map(|export| ExportDecl {
                name: export.name().to_string(),
                ty: declared_type(&export.ty()),
            })
            .collect()
    }

    fn instantiate(
        &self,
        module: &Module,
        imports: &[ImportBinding],
        context: InvocationContext,
    ) -> Result<WasmtimeInstance, SandboxError> {
        let mut store = Store::new(&self.engine, HostState::new(context, self.max_memory_bytes));
        store.limiter(|state| &mut state.limits);
        store.set_fuel(self.fuel_limit)?;

        let mut linker = Linker::new(&self.engine);
        define_imports(&mut linker, imports)?;

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(classify_trap)?;
        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| SandboxError::Memory(format!("no '{}' export", MEMORY_EXPORT)))?;

        debug!(imports = imports.len(), pages = memory.size(&store), "instance created");
        Ok(WasmtimeInstance {
            store,
            instance,
            memory,
            fuel_limit: self.fuel_limit,
        })
    }
}

/// A live Wasmtime instance and the store that owns its state.
pub struct WasmtimeInstance {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
    fuel_limit: u64,
}

impl WasmtimeInstance {
    /// Fuel left from the per-call budget.
    pub fn remaining_fuel(&self) -> Result<u64, SandboxError> {
        Ok(self.store.get_fuel()?)
    }
}

impl GuestInstance for WasmtimeInstance {
    fn call(&mut self, name: &str) -> Result<(), SandboxError> {
        self.store.set_fuel(self.fuel_limit)?;

        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| SandboxError::ExportNotFound(name.to_string()))?;
        let entry = func.typed::<(), ()>(&self.store).map_err(|_| {
            SandboxError::EntryPointSignature {
                name: name.to_string(),
                found: declared_type(&ExternType::Func(func.ty(&self.store))).to_string(),
            }
        })?;

        entry.call(&mut self.store, ()).map_err(classify_trap)
    }

    fn context(&self) -> &InvocationContext {
        &self.store.data().context
    }

    fn context_mut(&mut self) -> &mut InvocationContext {
        &mut self.store.data_mut().context
    }

    fn memory(&mut self) -> MemoryView<'_> {
        MemoryView::new(self.memory.data_mut(&mut self.store))
    }
}

/// Create a Wasmtime engine with deterministic configuration.
fn create_engine() -> Result<wasmtime::Engine, SandboxError> {
    let mut wasm_config = Config::new();

    // Fuel metering bounds every guest call
    wasm_config.consume_fuel(true);

    // Determinism enforcement
    wasm_config.wasm_threads(false);
    wasm_config.wasm_simd(false);
    wasm_config.wasm_relaxed_simd(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.cranelift_nan_canonicalization(true);

    Ok(wasmtime::Engine::new(&wasm_config)?)
}

/// Map a Wasmtime extern type onto the bridge's type vocabulary.
fn declared_type(ty: &ExternType) -> DeclaredType {
    match ty {
        ExternType::Func(func) => {
            let is_i32 = |v: &ValType| matches!(v, ValType::I32);
            if func.params().all(|v| is_i32(&v)) && func.results().all(|v| is_i32(&v)) {
                DeclaredType::Function(Signature::new(func.params().len(), func.results().len()))
            } else {
                let list = |it: &mut dyn Iterator<Item = ValType>| {
                    it.map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
                };
                DeclaredType::Unsupported(format!(
                    "func ({}) -> ({})",
                    list(&mut func.params()),
                    list(&mut func.results())
                ))
            }
        }
        ExternType::Memory(_) => DeclaredType::Unsupported("memory".into()),
        ExternType::Global(_) => DeclaredType::Unsupported("global".into()),
        ExternType::Table(_) => DeclaredType::Unsupported("table".into()),
    }
}

/// Sort an error coming out of a guest call.
///
/// - A `HostError` anywhere in the chain → `SandboxError::Host`
/// - Fuel exhaustion → `SandboxError::FuelExhausted`
/// - Any other trap → `SandboxError::Trap` with the guest backtrace
pub(crate) fn classify_trap(err: anyhow::Error) -> SandboxError {
    if let Some(host) = err.downcast_ref::<HostError>() {
        return SandboxError::Host(host.clone());
    }
    if let Some(Trap::OutOfFuel) = err.downcast_ref::<Trap>() {
        return SandboxError::FuelExhausted;
    }
    let backtrace = err.downcast_ref::<WasmBacktrace>().map(|bt| bt.to_string());
    let message = match err.downcast_ref::<Trap>() {
        Some(trap) => trap.to_string(),
        None => format!("{:#}", err),
    };
    SandboxError::Trap(TrapError { message, backtrace })
}
