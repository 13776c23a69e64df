//! The `env` import surface exposed to contract modules.
//!
//! Four functions, each taking only i32 pointer/length arguments:
//!
//! | import              | signature                  |
//! |---------------------|----------------------------|
//! | `_reason_len`       | `() -> i32`                |
//! | `_reason`           | `(dest_ptr)`               |
//! | `_send_transaction` | `(tag_ptr, tag_len, payload_ptr, payload_len)` |
//! | `_error`            | `(msg_ptr, msg_len)`       |
//!
//! Each one:
//! 1. Destructures its raw arguments
//! 2. Reads or writes guest memory through `MemoryView` (bounds-checked once, here)
//! 3. Queries or appends to the `InvocationContext`
//!
//! None of them is engine-specific; engines only adapt calling conventions.

use bridge_hostapi::{HostError, InvocationContext};
use tracing::debug;

use crate::memory::MemoryView;
use crate::registry::{ImportRegistry, Signature};

/// Namespace of every bridge import.
pub const ENV: &str = "env";

pub const REASON_LEN: &str = "_reason_len";
pub const REASON: &str = "_reason";
pub const SEND_TRANSACTION: &str = "_send_transaction";
pub const ERROR: &str = "_error";

/// Register all four bridge imports under `env`.
pub fn register_bridge(registry: &mut ImportRegistry) {
    registry
        .register(ENV, REASON_LEN, Signature::new(0, 1), reason_len)
        .register(ENV, REASON, Signature::new(1, 0), reason)
        .register(ENV, SEND_TRANSACTION, Signature::new(4, 0), send_transaction)
        .register(ENV, ERROR, Signature::new(2, 0), error);
}

fn arity(function: &'static str, expected: usize, args: &[i32]) -> HostError {
    HostError::Arity {
        function,
        expected,
        found: args.len(),
    }
}

// ── Reason ──

/// `_reason_len() -> i32`: byte length of the serialized reason.
pub fn reason_len(
    ctx: &mut InvocationContext,
    _mem: &mut MemoryView<'_>,
    args: &[i32],
) -> Result<Option<i32>, HostError> {
    let &[] = args else {
        return Err(arity(REASON_LEN, 0, args));
    };
    let len = ctx.reason_len()?;
    debug!(len, "_reason_len");
    Ok(Some(len))
}

/// `_reason(dest_ptr)`: copy the serialized reason into guest memory.
///
/// The guest must have reserved `_reason_len()` bytes at `dest_ptr`.
pub fn reason(
    ctx: &mut InvocationContext,
    mem: &mut MemoryView<'_>,
    args: &[i32],
) -> Result<Option<i32>, HostError> {
    let &[dest_ptr] = args else {
        return Err(arity(REASON, 1, args));
    };
    debug!(dest_ptr, len = ctx.reason().len(), "_reason");
    mem.write(dest_ptr, ctx.reason().as_bytes())
        .map_err(|e| HostError::bounds(REASON, e))?;
    Ok(None)
}

// ── Output ──

/// `_send_transaction(tag_ptr, tag_len, payload_ptr, payload_len)`.
///
/// Both ranges are read before anything is appended, so a failing call
/// leaves the log unchanged.
pub fn send_transaction(
    ctx: &mut InvocationContext,
    mem: &mut MemoryView<'_>,
    args: &[i32],
) -> Result<Option<i32>, HostError> {
    let &[tag_ptr, tag_len, payload_ptr, payload_len] = args else {
        return Err(arity(SEND_TRANSACTION, 4, args));
    };
    debug!(tag_ptr, tag_len, payload_ptr, payload_len, "_send_transaction");

    let tag = mem
        .read(tag_ptr, tag_len)
        .map_err(|e| HostError::bounds(SEND_TRANSACTION, e))?;
    let payload = mem
        .read(payload_ptr, payload_len)
        .map_err(|e| HostError::bounds(SEND_TRANSACTION, e))?;
    let tag = String::from_utf8(tag).map_err(|_| HostError::InvalidText {
        function: SEND_TRANSACTION,
    })?;

    ctx.record_transaction(SEND_TRANSACTION, tag, payload)?;
    Ok(None)
}

/// `_error(msg_ptr, msg_len)`: record a diagnostic.
///
/// Informational only. Invalid UTF-8 is replaced rather than rejected.
pub fn error(
    ctx: &mut InvocationContext,
    mem: &mut MemoryView<'_>,
    args: &[i32],
) -> Result<Option<i32>, HostError> {
    let &[msg_ptr, msg_len] = args else {
        return Err(arity(ERROR, 2, args));
    };
    debug!(msg_ptr, msg_len, "_error");

    let msg = mem
        .read(msg_ptr, msg_len)
        .map_err(|e| HostError::bounds(ERROR, e))?;
    let message = String::from_utf8_lossy(&msg).into_owned();

    ctx.record_diagnostic(ERROR, message)?;
    Ok(None)
}
