//! Conduit Runtime - async bridge to native engines
//!
//! This library connects safe async Rust to any engine exposing the
//! `conduit_*` C ABI:
//! - Execution of typed requests with asynchronous completion
//! - Structured errors translated from native status codes
//! - Ownership of native buffers, released exactly once
//! - Round-tripping domain objects through the engine's binary codec

/// Conduit runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bridge;
pub mod buffer;
pub mod codec;
pub mod continuation;
pub mod error;
pub mod execute;
pub mod ffi;

pub use bridge::Bridge;
pub use buffer::OwnedBuffer;
pub use codec::DomainObject;
pub use continuation::{PendingCall, PendingCalls, Resumed};
pub use error::{
    fault, translate, BridgeError, BridgeResult, ErrorDetail, ErrorKind, ProtocolViolation,
};
pub use execute::Request;
pub use ffi::{LibraryLoader, LoadError, NativeApi, NativeLibrary};
