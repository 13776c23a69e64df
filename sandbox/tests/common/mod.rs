//! Shared test helpers for integration tests.
//!
//! Provides the canonical transfer reason, inline WAT guests that import
//! the bridge, and driver factory functions used across all integration
//! test files.

#![allow(dead_code)]

use bridge_hostapi::{ReasonPayload, TransferActivation};
use bridge_sandbox::{Driver, SandboxConfig, WasmtimeEngine};

/// Guest-memory offset where `_reason` copies the serialized reason.
pub const REASON_OFFSET: u32 = 2048;

/// Length of the canonical transfer reason once serialized.
pub const REASON_LEN: usize = 85;

// ── Reason ──

/// The transfer reason every runner binds: sender `[0,1,2,3]`, amount 100000.
pub fn transfer_payload() -> ReasonPayload {
    transfer_of(100_000)
}

/// A transfer reason from sender `[0,1,2,3]` carrying `amount`.
pub fn transfer_of(amount: u64) -> ReasonPayload {
    ReasonPayload::transfer(
        Some(vec![0, 1, 2, 3]),
        TransferActivation {
            sender: Some(vec![0, 1, 2, 3]),
            amount,
        },
    )
}

// ── Guests ──

/// Build a guest module that imports all four bridge functions.
///
/// `data` places string literals at fixed offsets; `body` is the
/// instruction sequence of `contract_main`.
pub fn guest(data: &[(u32, &str)], body: &str) -> String {
    let segments: String = data
        .iter()
        .map(|(offset, text)| format!("(data (i32.const {}) \"{}\")\n", offset, text))
        .collect();
    format!(
        r#"
        (module
            (import "env" "_reason_len" (func $reason_len (result i32)))
            (import "env" "_reason" (func $reason (param i32)))
            (import "env" "_send_transaction" (func $send (param i32 i32 i32 i32)))
            (import "env" "_error" (func $error (param i32 i32)))
            (memory (export "memory") 1)
            {segments}
            (func (export "contract_main")
                {body})
        )
        "#
    )
}

/// A contract that reads its reason and sends `transfer` back with the
/// amount digits copied out of the reason itself.
///
/// The reason length is stored at offset 0 and the reason itself at
/// [`REASON_OFFSET`]. The reason ends in `"amount":<digits>}}`, so the
/// guest scans back from the closing braces to the `:` and sends the bytes
/// in between. A reason with no `:` traps.
pub fn transfer_back() -> String {
    guest(
        &[(1024, "transfer")],
        &format!(
            r#"
            (local $len i32)
            (local $end i32)
            (local $p i32)
            call $reason_len
            local.set $len
            i32.const 0
            local.get $len
            i32.store
            i32.const {REASON_OFFSET}
            call $reason
            ;; digits stop before the trailing "}}}}"
            i32.const {REASON_OFFSET}
            local.get $len
            i32.add
            i32.const 2
            i32.sub
            local.tee $end
            local.set $p
            (block $found
                (loop $scan
                    local.get $p
                    i32.const 1
                    i32.sub
                    local.tee $p
                    i32.load8_u
                    i32.const 58 ;; ':'
                    i32.eq
                    br_if $found
                    local.get $p
                    i32.const {REASON_OFFSET}
                    i32.gt_u
                    br_if $scan)
                unreachable)
            i32.const 1024
            i32.const 8
            local.get $p
            i32.const 1
            i32.add
            local.get $end
            local.get $p
            i32.sub
            i32.const 1
            i32.sub
            call $send
            "#
        ),
    )
}

/// A contract that increments an i32 counter at offset 0 and sends it as
/// a four-byte payload, so memory carry-over is visible in the log.
pub fn counter() -> String {
    guest(
        &[(1024, "count")],
        r#"
            i32.const 0
            i32.const 0
            i32.load
            i32.const 1
            i32.add
            i32.store
            i32.const 1024
            i32.const 5
            i32.const 0
            i32.const 4
            call $send
        "#,
    )
}

// ── Driver Factory ──

/// A Wasmtime driver that has loaded, linked, and bound the transfer
/// reason for `wat`.
pub fn ready_driver(wat: &str) -> Driver<WasmtimeEngine> {
    ready_driver_with_config(wat, SandboxConfig::default())
}

/// Same as [`ready_driver`] with custom sandbox config.
pub fn ready_driver_with_config(wat: &str, config: SandboxConfig) -> Driver<WasmtimeEngine> {
    let mut driver = Driver::wasmtime(config).expect("engine creation failed");
    driver.load(wat.as_bytes()).expect("module load failed");
    driver.link().expect("link failed");
    driver
        .instantiate(&transfer_payload())
        .expect("instantiate failed");
    driver
}
