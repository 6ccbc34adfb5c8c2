//! Engine errors, status codes and the thread-local last-error slot

use crate::stats;
use serde::Serialize;
use std::cell::RefCell;
use std::os::raw::c_int;
use thiserror::Error;

/// Status codes returned across the ABI
pub mod status {
    use std::os::raw::c_int;

    pub const OK: c_int = 0;
    pub const OPERATION_FAILED: c_int = 1;
    pub const INVALID_ARGUMENT: c_int = 2;
    pub const CORRUPT_BYTES: c_int = 3;
    pub const UNKNOWN_OPERATION: c_int = 4;
    pub const PANICKED: c_int = 5;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An operation handler reported a domain failure
    #[error("{kind}: {message}")]
    Failed {
        kind: String,
        message: String,
        status: Option<String>,
        transaction_id: Option<String>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupt bytes: {0}")]
    Corrupt(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("engine panicked: {0}")]
    Panicked(String),

    #[error("engine runtime failed to start: {0}")]
    Runtime(String),
}

impl EngineError {
    /// Domain failure with a kind and message
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Failed {
            kind: kind.into(),
            message: message.into(),
            status: None,
            transaction_id: None,
        }
    }

    /// Attach a machine-parsable status to a `Failed` error
    pub fn with_status(mut self, value: impl Into<String>) -> Self {
        if let EngineError::Failed { status, .. } = &mut self {
            *status = Some(value.into());
        }
        self
    }

    pub fn with_transaction_id(mut self, value: impl Into<String>) -> Self {
        if let EngineError::Failed { transaction_id, .. } = &mut self {
            *transaction_id = Some(value.into());
        }
        self
    }

    pub fn status(&self) -> c_int {
        match self {
            EngineError::Failed { .. } | EngineError::Runtime(_) => status::OPERATION_FAILED,
            EngineError::InvalidArgument(_) => status::INVALID_ARGUMENT,
            EngineError::Corrupt(_) => status::CORRUPT_BYTES,
            EngineError::UnknownOperation(_) => status::UNKNOWN_OPERATION,
            EngineError::Panicked(_) => status::PANICKED,
        }
    }

    pub fn record(&self) -> ErrorRecord<'_> {
        match self {
            EngineError::Failed {
                kind,
                message,
                status,
                transaction_id,
            } => ErrorRecord {
                kind,
                message,
                status: status.as_deref(),
                transaction_id: transaction_id.as_deref(),
            },
            EngineError::InvalidArgument(message) => ErrorRecord::simple("InvalidArgument", message),
            EngineError::Corrupt(message) => ErrorRecord::simple("CorruptBytes", message),
            EngineError::UnknownOperation(message) => {
                ErrorRecord::simple("UnknownOperation", message)
            }
            EngineError::Panicked(message) => ErrorRecord::simple("Panic", message),
            EngineError::Runtime(message) => ErrorRecord::simple("Runtime", message),
        }
    }
}

/// Error detail as it crosses the ABI
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord<'a> {
    pub kind: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<&'a str>,
}

impl<'a> ErrorRecord<'a> {
    fn simple(kind: &'a str, message: &'a str) -> Self {
        Self {
            kind,
            message,
            status: None,
            transaction_id: None,
        }
    }

    pub fn to_json(&self) -> String {
        // A record of plain strings always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"kind":"{}"}}"#, self.kind))
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Store `error` as this thread's last error, replacing any earlier one
pub fn set_last_error(error: &EngineError) {
    let json = error.record().to_json();
    tracing::debug!(status = error.status(), %error, "engine error recorded");
    stats::error_recorded();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(json));
}

/// Move this thread's last error out, clearing the slot
pub fn take_last_error() -> Option<String> {
    let taken = LAST_ERROR.with(|slot| slot.borrow_mut().take());
    if taken.is_some() {
        stats::error_taken();
    }
    taken
}
