//! Per-instance mutable state held in the Wasmtime `Store`.
//!
//! `HostState` carries the invocation context the bridge imports operate
//! on and the resource limiter that caps guest memory growth. It lives
//! inside `Store<HostState>` for the lifetime of one instance.

use bridge_hostapi::InvocationContext;
use wasmtime::{StoreLimits, StoreLimitsBuilder};

/// Per-instance state held in the Wasmtime `Store`.
///
/// Created fresh for each instantiation. Dropped with the instance.
pub struct HostState {
    /// Reason and log for the current invocation scope.
    pub context: InvocationContext,
    /// Memory/table/instance caps enforced by the store limiter.
    pub limits: StoreLimits,
}

impl HostState {
    /// Create host state with linear memory capped at `max_memory_bytes`.
    pub fn new(context: InvocationContext, max_memory_bytes: usize) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(max_memory_bytes)
            .memories(1)
            .instances(1)
            .trap_on_grow_failure(false)
            .build();
        Self { context, limits }
    }
}
