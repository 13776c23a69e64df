//! Host-side error types for the contract import bridge.
//!
//! `BoundsError` and `EncodingError` are the leaf failures raised by the
//! memory view and the reason codec. `HostError` is what a bridge function
//! returns to the engine; every variant names the import that raised it so
//! the driver can report which call and which offsets were at fault.

use thiserror::Error;

/// A guest pointer/length pair fell outside linear memory.
///
/// Offsets are kept as `i64` so negative guest values survive into the
/// report instead of being wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("range [{offset}, {offset}+{length}) outside guest memory of {capacity} bytes")]
pub struct BoundsError {
    pub offset: i64,
    pub length: i64,
    pub capacity: usize,
}

impl BoundsError {
    pub fn new(offset: i64, length: i64, capacity: usize) -> Self {
        Self {
            offset,
            length,
            capacity,
        }
    }
}

/// The reason payload could not be encoded or decoded.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// `details` does not have the shape the declared `kind` requires.
    #[error("reason kind '{kind}' does not match details of kind '{details}'")]
    KindMismatch { kind: String, details: &'static str },

    /// `kind` is not one of the supported reason kinds.
    #[error("unknown reason kind '{0}'")]
    UnknownKind(String),

    /// The JSON layer rejected the payload.
    #[error("reason json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error raised by a host import while serving a guest call.
///
/// Returned to the engine, which turns it into a guest trap; the driver
/// recovers it from the trap chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A pointer/length argument was out of bounds.
    #[error("{function}: {source}")]
    Bounds {
        function: &'static str,
        #[source]
        source: BoundsError,
    },

    /// Text argument was not valid UTF-8.
    #[error("{function}: argument is not valid utf-8")]
    InvalidText { function: &'static str },

    /// The invocation log is full.
    #[error("{function}: invocation log limit of {limit} records reached")]
    LogLimit { function: &'static str, limit: usize },

    /// The invocation log would exceed its byte budget.
    #[error("{function}: invocation log limit of {limit} bytes reached")]
    LogBytesLimit { function: &'static str, limit: usize },

    /// The engine passed the wrong number of arguments.
    #[error("{function}: expected {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    /// The serialized reason cannot be described by an i32 length.
    #[error("serialized reason of {0} bytes exceeds the i32 range")]
    ReasonTooLarge(usize),
}

impl HostError {
    /// Attach the import name to a bounds failure.
    pub fn bounds(function: &'static str, source: BoundsError) -> Self {
        Self::Bounds { function, source }
    }

    /// Name of the import that raised this error, if any.
    pub fn function(&self) -> Option<&'static str> {
        match self {
            Self::Bounds { function, .. }
            | Self::InvalidText { function }
            | Self::LogLimit { function, .. }
            | Self::LogBytesLimit { function, .. }
            | Self::Arity { function, .. } => Some(function),
            Self::ReasonTooLarge(_) => None,
        }
    }
}
