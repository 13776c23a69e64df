//! Per-invocation host state shared by every bridge import.
//!
//! An `InvocationContext` pairs one serialized reason with one log. The
//! sandbox stores it inside the engine instance and hands it by `&mut` to
//! each import call, so there is no process-wide state and two instances
//! never see each other's log.

use tracing::{debug, warn};

use crate::error::HostError;
use crate::log::{DiagnosticRecord, InvocationLog, LogRecord, TransactionRecord};
use crate::reason::SerializedReason;
use crate::types::LogLimits;

#[derive(Debug, Clone)]
pub struct InvocationContext {
    reason: SerializedReason,
    log: InvocationLog,
    limits: LogLimits,
}

impl InvocationContext {
    pub fn new(reason: SerializedReason, limits: LogLimits) -> Self {
        Self {
            reason,
            log: InvocationLog::new(),
            limits,
        }
    }

    pub fn reason(&self) -> &SerializedReason {
        &self.reason
    }

    /// Length of the serialized reason as the guest sees it.
    pub fn reason_len(&self) -> Result<i32, HostError> {
        i32::try_from(self.reason.len()).map_err(|_| HostError::ReasonTooLarge(self.reason.len()))
    }

    pub fn log(&self) -> &InvocationLog {
        &self.log
    }

    /// End the current log scope and return its records.
    pub fn take_log(&mut self) -> InvocationLog {
        std::mem::take(&mut self.log)
    }

    /// Append a transaction. `function` names the import for error reports.
    pub fn record_transaction(
        &mut self,
        function: &'static str,
        tag: String,
        payload: Vec<u8>,
    ) -> Result<(), HostError> {
        self.check_capacity(function, tag.len() + payload.len())?;
        debug!(
            tag = %tag,
            payload = %String::from_utf8_lossy(&payload),
            "transaction emitted"
        );
        self.log
            .push(LogRecord::Transaction(TransactionRecord { tag, payload }));
        Ok(())
    }

    /// Append a diagnostic. Diagnostics never fail the invocation on their
    /// own; only the log limits can reject one.
    pub fn record_diagnostic(
        &mut self,
        function: &'static str,
        message: String,
    ) -> Result<(), HostError> {
        self.check_capacity(function, message.len())?;
        warn!(message = %message, "guest reported error");
        self.log
            .push(LogRecord::Diagnostic(DiagnosticRecord { message }));
        Ok(())
    }

    fn check_capacity(&self, function: &'static str, incoming: usize) -> Result<(), HostError> {
        if self.log.len() >= self.limits.max_records {
            return Err(HostError::LogLimit {
                function,
                limit: self.limits.max_records,
            });
        }
        if self.log.byte_len().saturating_add(incoming) > self.limits.max_bytes {
            return Err(HostError::LogBytesLimit {
                function,
                limit: self.limits.max_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(max_records: usize) -> InvocationContext {
        InvocationContext::new(
            SerializedReason::from(b"{}".to_vec()),
            LogLimits {
                max_records,
                ..LogLimits::default()
            },
        )
    }

    #[test]
    fn test_reason_len_is_stable() {
        let mut ctx = context(8);
        let before = ctx.reason_len().unwrap();
        ctx.record_transaction("_send_transaction", "t".into(), vec![1])
            .unwrap();
        assert_eq!(ctx.reason_len().unwrap(), before);
        assert_eq!(before, 2);
    }

    #[test]
    fn test_records_in_call_order() {
        let mut ctx = context(8);
        ctx.record_transaction("_send_transaction", "first".into(), vec![])
            .unwrap();
        ctx.record_diagnostic("_error", "divide by zero".into())
            .unwrap();
        ctx.record_transaction("_send_transaction", "second".into(), vec![])
            .unwrap();

        let tags: Vec<_> = ctx.log().transactions().map(|t| t.tag.clone()).collect();
        assert_eq!(tags, ["first", "second"]);
        assert_eq!(
            ctx.log().diagnostics().next().unwrap().message,
            "divide by zero"
        );
    }

    #[test]
    fn test_log_limit() {
        let mut ctx = context(2);
        ctx.record_diagnostic("_error", "a".into()).unwrap();
        ctx.record_diagnostic("_error", "b".into()).unwrap();
        let err = ctx
            .record_transaction("_send_transaction", "c".into(), vec![])
            .unwrap_err();
        assert_eq!(
            err,
            HostError::LogLimit {
                function: "_send_transaction",
                limit: 2
            }
        );
        assert_eq!(ctx.log().len(), 2);
    }

    #[test]
    fn test_log_byte_limit_counts_tag_and_payload() {
        let mut ctx = InvocationContext::new(
            SerializedReason::from(b"{}".to_vec()),
            LogLimits {
                max_records: 8,
                max_bytes: 10,
            },
        );
        ctx.record_transaction("_send_transaction", "tag".into(), vec![0; 5])
            .unwrap();
        ctx.record_diagnostic("_error", "ab".into()).unwrap();
        let err = ctx
            .record_transaction("_send_transaction", "t".into(), vec![0])
            .unwrap_err();
        assert_eq!(
            err,
            HostError::LogBytesLimit {
                function: "_send_transaction",
                limit: 10
            }
        );
        assert_eq!(ctx.log().len(), 2);
        assert_eq!(ctx.log().byte_len(), 10);
    }

    #[test]
    fn test_take_log_starts_new_scope() {
        let mut ctx = context(1);
        ctx.record_diagnostic("_error", "a".into()).unwrap();
        let taken = ctx.take_log();
        assert_eq!(taken.len(), 1);
        assert!(ctx.log().is_empty());
        // Limit applies per scope.
        ctx.record_diagnostic("_error", "b".into()).unwrap();
    }
}
