//! `bridge-hostapi`: host-side types for the contract import bridge.
//!
//! This crate holds everything the bridge needs that does not depend on a
//! particular execution engine:
//!
//! - `ReasonPayload` and its canonical codec (`reason::encode` / `reason::decode`)
//! - `InvocationLog`: ordered transaction and diagnostic records
//! - `InvocationContext`: the state one guest call reads and appends to
//! - `LogLimits`: per-scope resource bounds
//! - `HostError`, `BoundsError`, `EncodingError`
//!
//! Pointer validation against guest memory happens in the sandbox, not here.

pub mod error;
pub mod types;
pub mod reason;
pub mod log;
pub mod context;

// Re-export commonly used types at the crate root.
pub use error::{BoundsError, EncodingError, HostError};
pub use types::LogLimits;
pub use reason::{ReasonDetails, ReasonPayload, SerializedReason, TransferActivation};
pub use log::{DiagnosticRecord, InvocationLog, LogRecord, TransactionRecord};
pub use context::InvocationContext;
