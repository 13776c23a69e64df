//! Module shape checks.
//!
//! Two checks run before a guest executes:
//!
//! 1. At compile time, the module must export its linear memory as
//!    `memory`. Every bridge import reads or writes through it.
//! 2. Before each invocation, the entry point must be an exported
//!    `() -> ()` function.
//!
//! Imports are not checked here. Resolving them is the registry's job, so
//! an import the host does not provide fails as a `LinkError` naming it.

use wasmtime::{ExternType, Module};

use crate::engine::ExportDecl;
use crate::error::SandboxError;
use crate::registry::{DeclaredType, Signature};

/// Name of the memory export every guest must provide.
pub const MEMORY_EXPORT: &str = "memory";

/// Signature every entry point must have.
pub const ENTRY_SIGNATURE: Signature = Signature::new(0, 0);

/// Validate that a compiled module exposes what the bridge needs.
pub fn validate_module(module: &Module) -> Result<(), SandboxError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == MEMORY_EXPORT && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(SandboxError::Validation(format!(
            "module must export '{}'",
            MEMORY_EXPORT
        )));
    }
    Ok(())
}

/// Check that `name` is exported as a `() -> ()` function.
pub fn check_entry_point(exports: &[ExportDecl], name: &str) -> Result<(), SandboxError> {
    let export = exports
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| SandboxError::ExportNotFound(name.to_string()))?;

    match &export.ty {
        DeclaredType::Function(sig) if *sig == ENTRY_SIGNATURE => Ok(()),
        other => Err(SandboxError::EntryPointSignature {
            name: name.to_string(),
            found: other.to_string(),
        }),
    }
}
