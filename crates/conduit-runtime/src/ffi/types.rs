//! ABI types for the conduit native boundary
//!
//! Defines:
//! - Status code constants shared with every engine
//! - Function pointer aliases for each `conduit_*` entry point
//! - `NativeApi`: the function table a bridge calls through
//!
//! Type mapping across the boundary:
//! - Text → `*const c_char` (nul-terminated UTF-8 JSON)
//! - Bytes → `(*const u8, usize)`
//! - Native-owned buffers → out parameters `(*mut *mut u8, *mut usize)`
//! - Correlation handle → `*const c_void` carrying a pending-call token

use std::os::raw::{c_char, c_int, c_void};

/// Status returned by a successful native call.
pub const STATUS_OK: c_int = 0;

/// Completion callback handed to `conduit_execute`.
///
/// Invoked exactly once per call, from any thread. `response` is borrowed
/// for the duration of the callback and is null unless `status == STATUS_OK`.
pub type CompletionCallback =
    unsafe extern "C" fn(context: *const c_void, status: c_int, response: *const c_char);

/// `conduit_execute(engine, request, context, callback)`
pub type ExecuteFn = unsafe extern "C" fn(
    engine: *const c_void,
    request: *const c_char,
    context: *const c_void,
    callback: CompletionCallback,
);

/// `conduit_decode(type_tag, bytes, len, out_ptr, out_len) -> status`
pub type DecodeFn = unsafe extern "C" fn(
    type_tag: *const c_char,
    bytes: *const u8,
    len: usize,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> c_int;

/// `conduit_encode(type_tag, text, out_ptr, out_len) -> status`
pub type EncodeFn = unsafe extern "C" fn(
    type_tag: *const c_char,
    text: *const c_char,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> c_int;

/// `conduit_release_buffer(ptr, len)`, the only deallocator for native buffers.
pub type ReleaseFn = unsafe extern "C" fn(ptr: *mut u8, len: usize);

/// `conduit_take_last_error(out_ptr, out_len)`
///
/// Moves the calling thread's error detail out of native storage.
pub type TakeLastErrorFn = unsafe extern "C" fn(out_ptr: *mut *mut u8, out_len: *mut usize);

/// `conduit_engine_new(config) -> engine`
pub type EngineNewFn = unsafe extern "C" fn(config: *const c_char) -> *const c_void;

/// `conduit_engine_free(engine)`
pub type EngineFreeFn = unsafe extern "C" fn(engine: *const c_void);

/// Exported symbol names, in the order `LibraryLoader` binds them.
pub mod symbols {
    pub const EXECUTE: &str = "conduit_execute";
    pub const DECODE: &str = "conduit_decode";
    pub const ENCODE: &str = "conduit_encode";
    pub const RELEASE_BUFFER: &str = "conduit_release_buffer";
    pub const TAKE_LAST_ERROR: &str = "conduit_take_last_error";
    pub const ENGINE_NEW: &str = "conduit_engine_new";
    pub const ENGINE_FREE: &str = "conduit_engine_free";
}

/// Function table for one native engine
///
/// `engine` is the opaque handle passed as the first argument of `execute`.
/// The remaining entry points are engine-independent.
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub engine: *const c_void,
    pub execute: ExecuteFn,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
    pub release_buffer: ReleaseFn,
    pub take_last_error: TakeLastErrorFn,
}

impl std::fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeApi")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ok_is_zero() {
        assert_eq!(STATUS_OK, 0);
    }

    #[test]
    fn test_symbol_names_share_prefix() {
        for name in [
            symbols::EXECUTE,
            symbols::DECODE,
            symbols::ENCODE,
            symbols::RELEASE_BUFFER,
            symbols::TAKE_LAST_ERROR,
            symbols::ENGINE_NEW,
            symbols::ENGINE_FREE,
        ] {
            assert!(name.starts_with("conduit_"), "{name}");
        }
    }
}
