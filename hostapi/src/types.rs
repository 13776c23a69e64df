//! Host-side limits applied to a single invocation context.

use serde::Deserialize;

/// Bounds on what one invocation may append to its log.
///
/// These limits are enforced by the context itself; the guest cannot
/// exceed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogLimits {
    /// Maximum number of records (transactions plus diagnostics) per log scope.
    pub max_records: usize,
    /// Maximum guest bytes (tags, payloads, messages) held per log scope.
    pub max_bytes: usize,
}

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            max_records: 4096,
            max_bytes: 1024 * 1024, // 1 MiB
        }
    }
}
