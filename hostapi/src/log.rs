//! Ordered record of what a guest emitted during one invocation.

use std::fmt;

use crate::types::LogLimits;

/// An outgoing instruction emitted through `_send_transaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub tag: String,
    pub payload: Vec<u8>,
}

/// A message emitted through `_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub message: String,
}

/// One entry of an [`InvocationLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Transaction(TransactionRecord),
    Diagnostic(DiagnosticRecord),
}

impl LogRecord {
    /// Bytes of guest data this record holds: tag plus payload, or the
    /// message.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Transaction(tx) => tx.tag.len() + tx.payload.len(),
            Self::Diagnostic(d) => d.message.len(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(tx) => write!(
                f,
                "tag = {:?}; payload = {:?}",
                tx.tag,
                String::from_utf8_lossy(&tx.payload)
            ),
            Self::Diagnostic(d) => write!(f, "error: {}", d.message),
        }
    }
}

/// Append-only, insertion-ordered sequence of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationLog {
    records: Vec<LogRecord>,
    bytes: usize,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LogRecord) {
        self.bytes += record.byte_len();
        self.records.push(record);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total guest bytes held, summed over [`LogRecord::byte_len`].
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// Whether one more record of `incoming` bytes stays within `limits`.
    pub fn fits(&self, limits: &LogLimits, incoming: usize) -> bool {
        self.records.len() < limits.max_records
            && self.bytes.saturating_add(incoming) <= limits.max_bytes
    }

    /// Transactions in emission order.
    pub fn transactions(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().filter_map(|r| match r {
            LogRecord::Transaction(tx) => Some(tx),
            LogRecord::Diagnostic(_) => None,
        })
    }

    /// Diagnostics in emission order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &DiagnosticRecord> {
        self.records.iter().filter_map(|r| match r {
            LogRecord::Diagnostic(d) => Some(d),
            LogRecord::Transaction(_) => None,
        })
    }

    /// Move every record of `other` to the end of this log.
    pub fn append(&mut self, other: InvocationLog) {
        self.bytes += other.bytes;
        self.records.extend(other.records);
    }

    /// Move records of `other` over in order while they fit in `limits`.
    /// Returns how many were dropped.
    pub fn append_within(&mut self, other: InvocationLog, limits: &LogLimits) -> usize {
        let total = other.len();
        let mut kept = 0;
        for record in other {
            if !self.fits(limits, record.byte_len()) {
                break;
            }
            self.push(record);
            kept += 1;
        }
        total - kept
    }
}

impl IntoIterator for InvocationLog {
    type Item = LogRecord;
    type IntoIter = std::vec::IntoIter<LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
