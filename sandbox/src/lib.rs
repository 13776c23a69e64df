//! `bridge-sandbox`: runs contract modules against the host import bridge.
//!
//! This crate loads a guest module, links its `env` imports to the four
//! bridge functions, binds a serialized reason, and calls the entry point.
//! It enforces:
//!
//! - **Hard linking:** every declared import must resolve with a matching
//!   signature before anything is instantiated
//! - **Bounds checks:** every guest pointer goes through [`MemoryView`]
//! - **Fuel metering:** a fresh instruction budget per invocation
//! - **Memory limits:** bounded linear memory growth
//! - **Determinism:** no SIMD, no threads, NaN canonicalization
//!
//! The primary entry point is [`Driver`]. Engines plug in through the
//! [`Engine`] trait; [`WasmtimeEngine`] is the one shipped here.

pub mod error;
pub mod config;
pub mod memory;
pub mod registry;
pub mod bridge;
pub mod engine;
pub mod host_impl;
pub mod validation;
pub mod linker;
pub mod runtime;
pub mod driver;

pub use config::{InstancePolicy, SandboxConfig, DEFAULT_ENTRY_POINT};
pub use driver::{Driver, DriverState, InvocationOutcome, RunReport, RunSummary};
pub use engine::{Engine, ExportDecl, GuestInstance};
pub use error::{SandboxError, TrapError};
pub use memory::MemoryView;
pub use registry::{DeclaredType, ImportBinding, ImportDecl, ImportRegistry, LinkError, Signature};
pub use runtime::{WasmtimeEngine, WasmtimeInstance};
