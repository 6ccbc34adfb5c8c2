//! Foreign Function Interface (FFI) infrastructure
//!
//! Connects the bridge to a native engine via:
//! - ABI types and status codes (`types`)
//! - Text and buffer marshaling (`marshal`)
//! - Dynamic library loading (`loader`)
//! - The bound engine itself (`library`)
//!
//! # Safety
//!
//! FFI operations involve `unsafe` code and careful memory management.
//! All unsafe code is isolated in this module, `buffer` and the completion
//! trampoline in `continuation`, each behind a safe wrapper.

pub mod library;
pub mod loader;
pub mod marshal;
pub mod types;

pub use library::NativeLibrary;
pub use loader::{LibraryLoader, LoadError};
pub use marshal::{read_c_text, to_c_text, OutBuffer};
pub use types::{NativeApi, STATUS_OK};
