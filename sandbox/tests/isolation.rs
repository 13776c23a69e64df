//! Isolation tests: instance policy and independent drivers.
//!
//! Under `Reuse`, memory written by one call is visible to the next. Under
//! `Fresh`, every call starts from the module's initial image. Separate
//! drivers never observe each other's state, even on separate threads.

mod common;

use bridge_hostapi::{reason, ReasonPayload, TransferActivation};
use bridge_sandbox::{Driver, ImportRegistry, InstancePolicy, SandboxConfig, WasmtimeEngine};

use common::*;

fn counter_payloads(policy: InstancePolicy, iterations: u64) -> Vec<Vec<u8>> {
    let config = SandboxConfig {
        instance_policy: policy,
        ..SandboxConfig::default()
    };
    let mut driver = ready_driver_with_config(&counter(), config);
    let report = driver.run_repeated("contract_main", iterations).unwrap();
    report.log.transactions().map(|t| t.payload.clone()).collect()
}

// ── Test: instance policy ──

#[test]
fn test_reuse_carries_memory_over() {
    let payloads = counter_payloads(InstancePolicy::Reuse, 3);
    assert_eq!(
        payloads,
        [
            1u32.to_le_bytes().to_vec(),
            2u32.to_le_bytes().to_vec(),
            3u32.to_le_bytes().to_vec()
        ]
    );
}

#[test]
fn test_fresh_resets_memory() {
    let payloads = counter_payloads(InstancePolicy::Fresh, 3);
    assert_eq!(payloads, vec![1u32.to_le_bytes().to_vec(); 3]);
}

#[test]
fn test_direct_invokes_reuse_instance() {
    let mut driver = ready_driver(&counter());
    driver.invoke("contract_main").unwrap();
    driver.invoke("contract_main").unwrap();
    assert_eq!(driver.memory().unwrap().read(0, 4).unwrap(), 2u32.to_le_bytes());
}

#[test]
fn test_reinstantiate_rebinds_reason() {
    let mut driver = ready_driver(&transfer_back());
    driver.invoke("contract_main").unwrap();

    let other = ReasonPayload::transfer(
        None,
        TransferActivation {
            sender: None,
            amount: 7,
        },
    );
    driver.instantiate(&other).unwrap();
    driver.invoke("contract_main").unwrap();

    let expected = reason::encode(&other).unwrap();
    assert_eq!(driver.reason(), Some(&expected));
    let memory = driver.memory().unwrap();
    let len = i32::from_le_bytes(memory.read(0, 4).unwrap().try_into().unwrap());
    assert_eq!(len as usize, expected.len());
    assert_eq!(
        memory.read(REASON_OFFSET as i32, len).unwrap(),
        expected.as_bytes()
    );
}

// ── Test: independent drivers ──

#[test]
fn test_concurrent_drivers_do_not_interfere() {
    let registry = ImportRegistry::with_bridge();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4u64)
            .map(|n| {
                let registry = registry.clone();
                scope.spawn(move || {
                    let config = SandboxConfig::default();
                    let engine = WasmtimeEngine::new(&config).unwrap();
                    let mut driver = Driver::new(engine, registry, config);
                    driver.load(counter().as_bytes()).unwrap();
                    driver.link().unwrap();
                    driver.instantiate(&transfer_payload()).unwrap();
                    let report = driver.run_repeated("contract_main", n * 10).unwrap();
                    (n, report)
                })
            })
            .collect();

        for handle in handles {
            let (n, report) = handle.join().unwrap();
            assert_eq!(report.log.len() as u64, n * 10);
            let last = report.log.transactions().last().unwrap();
            assert_eq!(last.payload, ((n * 10) as u32).to_le_bytes());
        }
    });
}

#[test]
fn test_same_inputs_same_log() {
    let run = || {
        let mut driver = ready_driver(&transfer_back());
        let report = driver.run_repeated("contract_main", 10).unwrap();
        report.log
    };
    assert_eq!(run(), run());
}
