//! Invocation driver: module lifecycle and entry-point calls.
//!
//! A [`Driver`] walks one module through
//! `Unloaded → Loaded → Linked → Instantiated → Ready`, then runs entry
//! points. Each successful call returns to `Ready`; a failed call leaves
//! the driver `Faulted` for good.
//!
//! Each invocation opens a new log scope. The records the guest emitted
//! during the call are moved into the returned [`InvocationOutcome`]. When
//! a call fails, the records it produced before the failure stay readable
//! through [`Driver::current_log`].

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn};

use bridge_hostapi::{reason, InvocationContext, InvocationLog, ReasonPayload, SerializedReason};

use crate::config::{InstancePolicy, SandboxConfig};
use crate::engine::{Engine, ExportDecl, GuestInstance};
use crate::error::SandboxError;
use crate::memory::MemoryView;
use crate::registry::{ImportBinding, ImportRegistry};
use crate::runtime::WasmtimeEngine;
use crate::validation::check_entry_point;

/// Lifecycle position of a [`Driver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Unloaded,
    Loaded,
    Linked,
    Instantiated,
    Ready,
    Running,
    /// Terminal. The instance trapped or a bridge call failed.
    Faulted,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loaded => "loaded",
            Self::Linked => "linked",
            Self::Instantiated => "instantiated",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Result of one successful entry-point call.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// Records emitted during this call, in emission order.
    pub log: InvocationLog,
    pub elapsed: Duration,
}

/// Result of [`Driver::run_repeated_with`].
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub iterations: u64,
    /// Time spent instantiating and calling, excluding the sink.
    pub elapsed: Duration,
    /// Records emitted across all iterations.
    pub records: usize,
}

/// Result of [`Driver::run_repeated`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub iterations: u64,
    /// Wall time for the whole loop, including any re-instantiation.
    pub elapsed: Duration,
    /// Per-iteration logs concatenated in order, up to
    /// [`SandboxConfig::run_log_limits`].
    pub log: InvocationLog,
    /// Records emitted past the retention limits and not kept in `log`.
    pub dropped: usize,
}

/// Drives one guest module on one engine.
///
/// A driver owns its instance outright. Concurrent runs use separate
/// drivers; they may share a cloned [`ImportRegistry`] but nothing mutable.
pub struct Driver<E: Engine> {
    engine: E,
    registry: ImportRegistry,
    config: SandboxConfig,
    state: DriverState,
    module: Option<E::Module>,
    exports: Vec<ExportDecl>,
    linked: Vec<ImportBinding>,
    reason: Option<SerializedReason>,
    instance: Option<E::Instance>,
}

impl Driver<WasmtimeEngine> {
    /// A Wasmtime-backed driver with the four bridge imports registered.
    pub fn wasmtime(config: SandboxConfig) -> Result<Self, SandboxError> {
        let engine = WasmtimeEngine::new(&config)?;
        Ok(Self::new(engine, ImportRegistry::with_bridge(), config))
    }
}

impl<E: Engine> Driver<E> {
    pub fn new(engine: E, registry: ImportRegistry, config: SandboxConfig) -> Self {
        Self {
            engine,
            registry,
            config,
            state: DriverState::Unloaded,
            module: None,
            exports: Vec::new(),
            linked: Vec::new(),
            reason: None,
            instance: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Compile bytecode (or WAT text, for engines that accept it).
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), SandboxError> {
        self.expect_state("load", &[DriverState::Unloaded])?;
        let module = self.engine.compile(bytes)?;
        self.accept_module(module);
        Ok(())
    }

    /// Compile the module stored at `path`.
    pub fn load_file(&mut self, path: &Path) -> Result<(), SandboxError> {
        self.expect_state("load", &[DriverState::Unloaded])?;
        let module = self.engine.compile_file(path)?;
        self.accept_module(module);
        Ok(())
    }

    fn accept_module(&mut self, module: E::Module) {
        self.exports = self.engine.exports(&module);
        self.module = Some(module);
        self.transition(DriverState::Loaded);
    }

    /// Resolve every import the module declares against the registry.
    ///
    /// On failure the driver stays `Loaded` and nothing is instantiated.
    pub fn link(&mut self) -> Result<(), SandboxError> {
        self.expect_state("link", &[DriverState::Loaded])?;
        let module = self.module.as_ref().ok_or(SandboxError::InvalidState {
            operation: "link",
            state: self.state,
        })?;
        let declared = self.engine.imports(module);
        self.linked = self.registry.link(&declared)?;
        debug!(imports = self.linked.len(), "imports linked");
        self.transition(DriverState::Linked);
        Ok(())
    }

    /// Encode `payload`, then create an instance bound to it.
    ///
    /// Calling this again from `Ready` replaces the instance and rebinds
    /// the new reason.
    pub fn instantiate(&mut self, payload: &ReasonPayload) -> Result<(), SandboxError> {
        self.expect_state("instantiate", &[DriverState::Linked, DriverState::Ready])?;
        let serialized = reason::encode(payload)?;
        info!(reason = %serialized, "reason bound");
        self.reason = Some(serialized);
        self.spawn_instance()
    }

    fn spawn_instance(&mut self) -> Result<(), SandboxError> {
        let (module, reason) = match (&self.module, &self.reason) {
            (Some(module), Some(reason)) => (module, reason.clone()),
            _ => {
                return Err(SandboxError::InvalidState {
                    operation: "instantiate",
                    state: self.state,
                })
            }
        };
        let context = InvocationContext::new(reason, self.config.log_limits);
        let instance = self.engine.instantiate(module, &self.linked, context)?;
        self.instance = Some(instance);
        self.transition(DriverState::Instantiated);
        self.transition(DriverState::Ready);
        Ok(())
    }

    /// Call `entry` once.
    ///
    /// A missing or mistyped entry point is reported before any guest code
    /// runs. Either that or any failure during the call leaves the driver
    /// `Faulted`.
    pub fn invoke(&mut self, entry: &str) -> Result<InvocationOutcome, SandboxError> {
        match self.state {
            DriverState::Ready => {}
            DriverState::Faulted => return Err(SandboxError::InstanceFaulted),
            state => {
                return Err(SandboxError::InvalidState {
                    operation: "invoke",
                    state,
                })
            }
        }
        if let Err(err) = check_entry_point(&self.exports, entry) {
            self.state = DriverState::Faulted;
            warn!(entry, error = %err, "entry point rejected");
            return Err(err);
        }

        let instance = self.instance.as_mut().ok_or(SandboxError::InvalidState {
            operation: "invoke",
            state: self.state,
        })?;
        // Open a new log scope.
        instance.context_mut().take_log();

        self.state = DriverState::Running;
        let span = info_span!("invoke", entry);
        let _enter = span.enter();
        let start = Instant::now();
        let result = instance.call(entry);
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                let log = instance.context_mut().take_log();
                self.state = DriverState::Ready;
                debug!(records = log.len(), ?elapsed, "invocation finished");
                Ok(InvocationOutcome { log, elapsed })
            }
            Err(err) => {
                self.state = DriverState::Faulted;
                warn!(error = %err, "invocation faulted");
                Err(err)
            }
        }
    }

    /// Call `entry` `iterations` times and time the whole loop.
    ///
    /// Under [`InstancePolicy::Fresh`] the instance is rebuilt before each
    /// call from the same linked imports and reason. The first failing
    /// iteration ends the loop with its error. Records beyond
    /// [`SandboxConfig::run_log_limits`] are counted in
    /// [`RunReport::dropped`] instead of kept.
    pub fn run_repeated(&mut self, entry: &str, iterations: u64) -> Result<RunReport, SandboxError> {
        let limits = self.config.run_log_limits;
        let mut log = InvocationLog::new();
        let mut dropped = 0;
        let summary = self.run_repeated_with(entry, iterations, |iteration| {
            dropped += log.append_within(iteration, &limits);
        })?;
        if dropped > 0 {
            warn!(dropped, "run log truncated");
        }
        Ok(RunReport {
            iterations: summary.iterations,
            elapsed: summary.elapsed,
            log,
            dropped,
        })
    }

    /// Like [`Driver::run_repeated`], but hand each iteration's log to
    /// `sink` as soon as the call returns instead of keeping it.
    pub fn run_repeated_with<F>(
        &mut self,
        entry: &str,
        iterations: u64,
        mut sink: F,
    ) -> Result<RunSummary, SandboxError>
    where
        F: FnMut(InvocationLog),
    {
        let mut elapsed = Duration::ZERO;
        let mut records = 0;
        for _ in 0..iterations {
            let start = Instant::now();
            if self.config.instance_policy == InstancePolicy::Fresh && self.state == DriverState::Ready {
                self.spawn_instance()?;
            }
            let outcome = self.invoke(entry)?;
            elapsed += start.elapsed();
            records += outcome.log.len();
            sink(outcome.log);
        }
        info!(iterations, ?elapsed, records, "run finished");
        Ok(RunSummary {
            iterations,
            elapsed,
            records,
        })
    }

    /// View of the current instance's linear memory.
    pub fn memory(&mut self) -> Result<MemoryView<'_>, SandboxError> {
        let state = self.state;
        self.instance
            .as_mut()
            .map(|instance| instance.memory())
            .ok_or(SandboxError::InvalidState {
                operation: "read memory",
                state,
            })
    }

    /// Every export of the loaded module with its declared type.
    pub fn exports(&self) -> &[ExportDecl] {
        &self.exports
    }

    /// Records in the instance's open log scope. After a failed call these
    /// are the records emitted before the failure.
    pub fn current_log(&self) -> Option<&InvocationLog> {
        self.instance.as_ref().map(|instance| instance.context().log())
    }

    /// The serialized reason bound to the current instance.
    pub fn reason(&self) -> Option<&SerializedReason> {
        self.reason.as_ref()
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[DriverState],
    ) -> Result<(), SandboxError> {
        match self.state {
            DriverState::Faulted => Err(SandboxError::InstanceFaulted),
            state if allowed.contains(&state) => Ok(()),
            state => Err(SandboxError::InvalidState { operation, state }),
        }
    }

    fn transition(&mut self, to: DriverState) {
        debug!(from = %self.state, %to, "driver state");
        self.state = to;
    }
}
