//! Marshaling - Rust values ↔ C representations
//!
//! - `to_c_text()`: Rust text → nul-terminated `CString`
//! - `read_c_text()`: borrowed `*const c_char` → owned `String`
//! - `OutBuffer`: `(ptr, len)` out parameters → `OwnedBuffer`
//!
//! # Memory Safety
//!
//! - Null pointer checks for every incoming C pointer
//! - UTF-8 validation before text reaches serde
//! - Out parameters start as `(null, 0)`; ownership moves into `OwnedBuffer`
//!   once the engine has written them

use crate::buffer::OwnedBuffer;
use crate::error::{BridgeError, BridgeResult};
use crate::ffi::types::ReleaseFn;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Convert text to a C string
///
/// The canonical textual form never contains a nul byte, so an interior
/// nul is reported rather than truncated.
pub fn to_c_text(text: impl Into<Vec<u8>>) -> BridgeResult<CString> {
    CString::new(text).map_err(|e| {
        BridgeError::InvalidText(format!(
            "text contains a nul byte at offset {}",
            e.nul_position()
        ))
    })
}

/// Copy a borrowed C string into an owned `String`
///
/// Returns `None` for a null pointer.
///
/// # Safety
///
/// A non-null `ptr` must point to a nul-terminated string that stays valid
/// for the duration of this call.
pub unsafe fn read_c_text(ptr: *const c_char) -> Option<BridgeResult<String>> {
    if ptr.is_null() {
        return None;
    }
    let text = CStr::from_ptr(ptr);
    Some(
        text.to_str()
            .map(str::to_owned)
            .map_err(|e| BridgeError::InvalidText(format!("native text is not UTF-8: {e}"))),
    )
}

/// Out parameters for a native call that allocates a result buffer
pub struct OutBuffer {
    ptr: *mut u8,
    len: usize,
}

impl OutBuffer {
    pub fn new() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// Pointer to the pointer slot
    pub fn ptr_slot(&mut self) -> *mut *mut u8 {
        &mut self.ptr
    }

    /// Pointer to the length slot
    pub fn len_slot(&mut self) -> *mut usize {
        &mut self.len
    }

    /// Take ownership of whatever the engine wrote
    ///
    /// # Safety
    ///
    /// The slots must hold either `(null, 0)` or a buffer allocated by the
    /// engine whose deallocator is `release`.
    pub unsafe fn into_owned(self, release: ReleaseFn) -> Option<OwnedBuffer> {
        OwnedBuffer::from_raw(self.ptr, self.len, release)
    }
}

impl Default for OutBuffer {
    fn default() -> Self {
        Self::new()
    }
}
