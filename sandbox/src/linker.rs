//! Host function registration with the Wasmtime `Linker`.
//!
//! Every linked [`ImportBinding`] becomes one dynamically typed Wasmtime
//! host function. Each one:
//! 1. Collects its i32 arguments
//! 2. Borrows the caller's memory and `HostState` together
//! 3. Runs the engine-agnostic handler against a `MemoryView`
//! 4. Writes the i32 result back, or traps with the `HostError`

use wasmtime::{Caller, FuncType, Linker, Memory, Val, ValType};

use bridge_hostapi::HostError;

use crate::error::SandboxError;
use crate::host_impl::HostState;
use crate::memory::MemoryView;
use crate::registry::{ImportBinding, Signature};

/// Get the guest's exported memory from a Caller.
fn get_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    caller.get_export("memory").and_then(|e| e.into_memory())
}

fn func_type(linker: &Linker<HostState>, signature: Signature) -> FuncType {
    FuncType::new(
        linker.engine(),
        std::iter::repeat(ValType::I32).take(signature.params),
        std::iter::repeat(ValType::I32).take(signature.results),
    )
}

/// Define every linked binding in `linker`.
pub fn define_imports(
    linker: &mut Linker<HostState>,
    imports: &[ImportBinding],
) -> Result<(), SandboxError> {
    for binding in imports {
        define_import(linker, binding.clone())?;
    }
    Ok(())
}

fn define_import(linker: &mut Linker<HostState>, binding: ImportBinding) -> Result<(), SandboxError> {
    let ty = func_type(linker, binding.signature);
    let namespace = binding.namespace.clone();
    let name = binding.name.clone();
    linker.func_new(
        &namespace,
        &name,
        ty,
        move |mut caller: Caller<'_, HostState>, params: &[Val], results: &mut [Val]| {
            let args: Vec<i32> = params.iter().filter_map(Val::i32).collect();
            let ret = call_binding(&mut caller, &binding, &args)?;
            if let (Some(value), Some(slot)) = (ret, results.first_mut()) {
                *slot = Val::I32(value);
            }
            Ok(())
        },
    )?;
    Ok(())
}

/// Run one binding with the caller's memory and context borrowed together.
///
/// A module without an exported memory gets an empty view, so any
/// pointer argument fails the bounds check.
fn call_binding(
    caller: &mut Caller<'_, HostState>,
    binding: &ImportBinding,
    args: &[i32],
) -> Result<Option<i32>, HostError> {
    match get_memory(caller) {
        Some(memory) => {
            let (data, state) = memory.data_and_store_mut(&mut *caller);
            binding.call(&mut state.context, &mut MemoryView::new(data), args)
        }
        None => binding.call(
            &mut caller.data_mut().context,
            &mut MemoryView::new(&mut []),
            args,
        ),
    }
}
