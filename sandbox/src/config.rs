//! Sandbox configuration.

use std::path::Path;

use bridge_hostapi::LogLimits;
use serde::Deserialize;

use crate::error::SandboxError;
use crate::memory::MAX_MEMORY_PAGES;

/// Entry point every contract is expected to export.
pub const DEFAULT_ENTRY_POINT: &str = "contract_main";

/// What the repeated-invocation loop does with the instance between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePolicy {
    /// Keep one instance; guest memory written by one call is visible to
    /// the next.
    #[default]
    Reuse,
    /// Re-instantiate before every call so each run starts from the
    /// module's initial memory image.
    Fresh,
}

/// Configuration for the contract sandbox.
///
/// Controls memory limits, instruction fuel, log limits, and how repeated
/// runs treat the instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 256 pages = 16 MiB. At most [`MAX_MEMORY_PAGES`].
    pub max_memory_pages: u32,

    /// Wasmtime fuel per invocation (instruction metering).
    /// Prevents infinite loops in guest code.
    pub fuel_limit: u64,

    /// Per-invocation log bounds.
    pub log_limits: LogLimits,

    /// Bounds on what `Driver::run_repeated` keeps across iterations.
    pub run_log_limits: LogLimits,

    /// Instance handling in `Driver::run_repeated`.
    pub instance_policy: InstancePolicy,

    /// Export invoked by the runner.
    pub entry_point: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_limit: 100_000_000,
            log_limits: LogLimits::default(),
            run_log_limits: LogLimits {
                max_records: 1 << 20,
                max_bytes: 64 * 1024 * 1024, // 64 MiB
            },
            instance_policy: InstancePolicy::Reuse,
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

impl SandboxConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SandboxError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| SandboxError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sandbox cannot honor.
    pub fn validate(&self) -> Result<(), SandboxError> {
        if self.max_memory_pages > MAX_MEMORY_PAGES {
            return Err(SandboxError::Config(format!(
                "max_memory_pages {} exceeds the i32-addressable limit of {}",
                self.max_memory_pages, MAX_MEMORY_PAGES
            )));
        }
        Ok(())
    }

    /// Upper bound on linear memory in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * crate::memory::PAGE_SIZE
    }
}
