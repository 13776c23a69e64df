//! Sandbox error types.

use std::fmt;

use bridge_hostapi::{EncodingError, HostError};

use crate::driver::DriverState;
use crate::registry::LinkError;

/// A guest fault reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapError {
    pub message: String,
    /// Guest stack at the fault, when the engine captured one.
    pub backtrace: Option<String>,
}

impl fmt::Display for TrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(bt) = &self.backtrace {
            write!(f, "\n{}", bt)?;
        }
        Ok(())
    }
}

/// Top-level error type for the sandbox crate.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Reading a module or config file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Module shape rejected before linking.
    #[error("validation error: {0}")]
    Validation(String),

    /// The reason payload could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A declared import could not be satisfied.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// The requested entry point is not exported.
    #[error("export not found: {0}")]
    ExportNotFound(String),

    /// The entry point exists but is not a `() -> ()` function.
    #[error("entry point '{name}' has signature {found}, expected () -> ()")]
    EntryPointSignature { name: String, found: String },

    /// A bridge import failed; the guest call was aborted.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Fuel exhausted during execution.
    #[error("fuel exhausted (instruction limit)")]
    FuelExhausted,

    /// The guest trapped.
    #[error("guest trapped: {0}")]
    Trap(TrapError),

    /// Memory access outside an import call failed.
    #[error("memory error: {0}")]
    Memory(String),

    /// Driver operation called from the wrong lifecycle state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: DriverState,
    },

    /// The instance faulted earlier and accepts no further calls.
    #[error("instance faulted; create a new driver to continue")]
    InstanceFaulted,
}
