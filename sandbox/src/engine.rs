//! Engine capability interface.
//!
//! The bridge only needs four things from an execution engine: compile a
//! module, describe its imports and exports, instantiate it against a set
//! of linked bindings, and call a named export. Linking itself is done by
//! [`ImportRegistry::link`](crate::registry::ImportRegistry::link), so it
//! is the same for every engine.
//!
//! [`WasmtimeEngine`](crate::runtime::WasmtimeEngine) is the shipped
//! implementation.

use std::path::Path;

use bridge_hostapi::InvocationContext;

use crate::error::SandboxError;
use crate::memory::MemoryView;
use crate::registry::{DeclaredType, ImportBinding, ImportDecl};

/// One export of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDecl {
    pub name: String,
    pub ty: DeclaredType,
}

/// A bytecode engine the driver can run contracts on.
pub trait Engine {
    type Module;
    type Instance: GuestInstance;

    /// Decode and validate bytecode.
    fn compile(&self, bytes: &[u8]) -> Result<Self::Module, SandboxError>;

    /// Compile bytecode read from `path`.
    fn compile_file(&self, path: &Path) -> Result<Self::Module, SandboxError> {
        let bytes = std::fs::read(path)?;
        self.compile(&bytes)
    }

    /// Imports the module declares, in declaration order.
    fn imports(&self, module: &Self::Module) -> Vec<ImportDecl>;

    /// Exports the module declares.
    fn exports(&self, module: &Self::Module) -> Vec<ExportDecl>;

    /// Allocate memory and bind `context` to a new instance.
    ///
    /// `imports` must be the output of linking this module's declared
    /// imports, in the same order.
    fn instantiate(
        &self,
        module: &Self::Module,
        imports: &[ImportBinding],
        context: InvocationContext,
    ) -> Result<Self::Instance, SandboxError>;
}

/// A live guest instance with its memory and invocation context.
///
/// An instance is owned by exactly one driver and is never shared between
/// threads while a call is running.
pub trait GuestInstance {
    /// Call a zero-argument export. Traps surface as errors.
    fn call(&mut self, name: &str) -> Result<(), SandboxError>;

    fn context(&self) -> &InvocationContext;

    fn context_mut(&mut self) -> &mut InvocationContext;

    /// Bounds-checked view of the instance's linear memory.
    fn memory(&mut self) -> MemoryView<'_>;
}
