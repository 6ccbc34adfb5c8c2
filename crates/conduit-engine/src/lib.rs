//! Conduit Engine - reference native engine
//!
//! Implements the `conduit_*` C ABI on top of a multi-threaded tokio
//! runtime. Built as a `cdylib` for dynamic loading and as an `rlib` for
//! in-process use by tests and the CLI.

pub mod abi;
pub mod engine;
pub mod error;
pub mod frame;
pub mod stats;

pub use engine::{Engine, EngineBuilder, EngineConfig, Handler, TYPE_FIELD};
pub use error::{status, EngineError, ErrorRecord};
pub use stats::{stats, Stats};
