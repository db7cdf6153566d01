use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Correlation id reserved for submissions the ledger never accepted
pub const INVALID_CORRELATION_ID: &str = "invalid";
/// Label marking a result that must never be confirmed
pub const INVALID_LABEL: &str = "__invalid";
/// Label of the built-in value transfer
pub const BUILTIN_TRANSFER_LABEL: &str = "__transfer";

/// Ledger-assigned identifier of a submitted transaction, or the invalid sentinel
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn invalid() -> Self {
        CorrelationId(INVALID_CORRELATION_ID.to_string())
    }

    /// An id is usable for confirmation only if it is non-empty and not the sentinel.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0 != INVALID_CORRELATION_ID
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one operation.
///
/// Not a strict progression: `Success` only means the ledger accepted the submission,
/// `Confirm` and `Unknown` are the two outcomes of checking on it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    /// Submission accepted by the ledger
    Success,
    /// Submission rejected or the ledger could not be reached
    Failure,
    /// Accepted, but the record could not be found within the retry budget
    Unknown,
    /// Durably accepted by the ledger
    Confirm,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Success => write!(f, "Success"),
            TxStatus::Failure => write!(f, "Failure"),
            TxStatus::Unknown => write!(f, "Unknown"),
            TxStatus::Confirm => write!(f, "Confirm"),
        }
    }
}

/// Lifecycle stage a result has reached, derived from its status and timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Built,
    Sent,
    Confirmed,
    Unknown,
    Failed,
}

/// Record of one operation as seen by the reporting layer.
///
/// All timestamps are nanoseconds on the process-wide monotonic clock
/// (`utils::clock`); zero means the transition never happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxResult {
    /// Function name, or one of the reserved labels
    pub label: String,
    pub correlation_id: CorrelationId,
    pub return_values: Vec<Value>,
    pub status: TxStatus,
    pub build_time: i64,
    pub send_time: i64,
    pub confirm_time: i64,
    /// Commit time reported by the ledger, when it reports one
    pub write_time: i64,
}

impl TxResult {
    /// A submission that never reached the ledger
    pub fn failed(label: impl Into<String>, build_time: i64, send_time: i64) -> Self {
        Self {
            label: label.into(),
            correlation_id: CorrelationId::invalid(),
            return_values: Vec::new(),
            status: TxStatus::Failure,
            build_time,
            send_time,
            confirm_time: 0,
            write_time: 0,
        }
    }

    /// A submission the ledger accepted under `correlation_id`
    pub fn sent(label: impl Into<String>, correlation_id: CorrelationId, build_time: i64, send_time: i64) -> Self {
        Self {
            label: label.into(),
            correlation_id,
            return_values: Vec::new(),
            status: TxStatus::Success,
            build_time,
            send_time,
            confirm_time: 0,
            write_time: 0,
        }
    }

    /// Whether confirming this result can still change it.
    pub fn is_confirmable(&self) -> bool {
        self.status == TxStatus::Success
            && self.correlation_id.is_valid()
            && self.label != INVALID_LABEL
    }

    pub fn stage(&self) -> Stage {
        match self.status {
            TxStatus::Confirm => Stage::Confirmed,
            TxStatus::Unknown => Stage::Unknown,
            TxStatus::Failure => Stage::Failed,
            TxStatus::Success if self.send_time > 0 => Stage::Sent,
            TxStatus::Success => Stage::Built,
        }
    }
}
