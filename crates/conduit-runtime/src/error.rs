//! Error channel - native status codes → structured errors
//!
//! A failing native call returns a non-OK status and leaves its detail in
//! native thread-local storage. `translate` turns the pair into a
//! `BridgeError`, reading the detail at most once.
//!
//! Bridge-invariant breaches are a separate type, `ProtocolViolation`, and
//! are never handed to callers as errors: see [`fault`].

use crate::ffi::loader::LoadError;
use crate::ffi::types::STATUS_OK;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::raw::c_int;
use std::time::Duration;
use thiserror::Error;

/// Kind used when a failing call left no readable detail behind.
pub const UNKNOWN_KIND: &str = "Unknown";

/// Error detail record produced by the native engine
///
/// Only `kind` is required. `status` carries a machine-parsable code (for
/// example a transaction precheck status) when the engine reports one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Any further fields the engine attached.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ErrorDetail {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            status: None,
            transaction_id: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Detail for a failing status that came with nothing to read.
    fn missing(code: c_int) -> Self {
        Self::new(
            UNKNOWN_KIND,
            format!("native call failed with status {code} and no error detail"),
        )
    }

    /// Parse detail text; anything that is not a detail record becomes the
    /// message of an `Unknown` detail.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<ErrorDetail>(text) {
            Ok(detail) => detail,
            Err(_) => Self::new(UNKNOWN_KIND, text.trim()),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        if let Some(status) = &self.status {
            write!(f, " [{status}]")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Discriminator for `BridgeError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A typed value could not be converted to or from its textual form.
    Serialization,
    /// The native side reported a non-OK status.
    NativeStatus,
    /// The caller's deadline elapsed before the native callback arrived.
    Timeout,
    /// The bridge could not be set up (library loading, global install).
    Setup,
}

/// Errors surfaced to callers of the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to serialize {type_name}: {source}")]
    Serialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize {type_name} from native payload: {source}")]
    Deserialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("text cannot cross the native boundary: {0}")]
    InvalidText(String),

    #[error("native call failed with status {code}: {detail}")]
    NativeStatus { code: c_int, detail: ErrorDetail },

    #[error("native call did not complete within {0:?}")]
    TimedOut(Duration),

    #[error("no bridge installed; call Bridge::install first")]
    NotInstalled,

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Serialize { .. }
            | BridgeError::Deserialize { .. }
            | BridgeError::InvalidText(_) => ErrorKind::Serialization,
            BridgeError::NativeStatus { .. } => ErrorKind::NativeStatus,
            BridgeError::TimedOut(_) => ErrorKind::Timeout,
            BridgeError::NotInstalled | BridgeError::Load(_) => ErrorKind::Setup,
        }
    }

    /// The native detail, for `NativeStatus` errors.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            BridgeError::NativeStatus { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// Machine-parsable status of a native failure.
    ///
    /// Falls back to the detail kind when the engine encoded the status there.
    pub fn status(&self) -> Option<&str> {
        self.detail()
            .map(|detail| detail.status.as_deref().unwrap_or(detail.kind.as_str()))
    }
}

/// Translate a native status code into a result
///
/// `OK` returns immediately and never touches `detail`. Any other code
/// consumes the detail exactly once; the provider must read it on the same
/// thread, before any other native call could overwrite it.
pub fn translate<F>(code: c_int, detail: F) -> BridgeResult<()>
where
    F: FnOnce() -> Option<String>,
{
    if code == STATUS_OK {
        return Ok(());
    }

    let detail = match detail() {
        Some(text) if !text.trim().is_empty() => ErrorDetail::parse(&text),
        _ => ErrorDetail::missing(code),
    };

    tracing::debug!(code, kind = %detail.kind, "native call failed");
    Err(BridgeError::NativeStatus { code, detail })
}

/// Bridge invariant breaches
///
/// These indicate a bug in the bridge or a native engine breaking its
/// contract. They are raised through [`fault`], never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("native engine completed call {token} more than once")]
    DoubleResume { token: u64 },

    #[error("native engine completed unknown call {token}")]
    UnknownToken { token: u64 },

    #[error("pending call {token} was retired without a completion")]
    CompletionLost { token: u64 },

    #[error("native engine returned a null buffer with length {len}")]
    NullBuffer { len: usize },

    #[error("native engine reported success for {operation} without a result")]
    MissingResult { operation: &'static str },

    #[error("encoding {type_tag} failed: {reason}")]
    EncodeFailed {
        type_tag: &'static str,
        reason: String,
    },

    #[error("no bridge installed for {operation}")]
    NoBridgeInstalled { operation: &'static str },
}

/// Fail loudly on a protocol violation
#[cold]
#[track_caller]
pub fn fault(violation: ProtocolViolation) -> ! {
    tracing::error!(%violation, "conduit protocol violation");
    panic!("conduit protocol violation: {violation}");
}

/// Fail loudly from inside an `extern "C"` callback, where unwinding is not
/// an option.
#[cold]
pub(crate) fn fault_abort(violation: ProtocolViolation) -> ! {
    tracing::error!(%violation, "conduit protocol violation in native callback");
    eprintln!("conduit protocol violation: {violation}");
    std::process::abort();
}
