//! Native-owned byte buffers
//!
//! `OwnedBuffer` wraps memory allocated by the native engine and handed to
//! Rust. It is released through the engine's `conduit_release_buffer` when
//! the wrapper drops, on every exit path, and through no other deallocator.

use crate::error::{fault, BridgeError, BridgeResult, ProtocolViolation};
use crate::ffi::types::ReleaseFn;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

/// Byte region owned by the caller, allocated and freed by the native side
pub struct OwnedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    release: ReleaseFn,
}

// Safety: the buffer is exclusively owned and immutable once wrapped; the
// release function is a plain C function pointer.
unsafe impl Send for OwnedBuffer {}
unsafe impl Sync for OwnedBuffer {}

impl OwnedBuffer {
    /// Take ownership of a native allocation without copying
    ///
    /// Returns `None` for `(null, 0)`, which engines use for "no buffer".
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - `ptr` points to `len` initialized bytes allocated by the engine
    ///   whose deallocator is `release`
    /// - nothing else owns or releases the allocation
    ///
    /// # Panics
    ///
    /// A null pointer with a non-zero length is a protocol violation.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize, release: ReleaseFn) -> Option<Self> {
        match NonNull::new(ptr) {
            Some(ptr) => Some(Self { ptr, len, release }),
            None if len == 0 => None,
            None => fault(ProtocolViolation::NullBuffer { len }),
        }
    }

    /// Get the buffer as a slice
    pub fn as_slice(&self) -> &[u8] {
        // Safety: `from_raw` guarantees `len` initialized bytes at `ptr`,
        // valid until `drop`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Get the buffer length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the contents into a Rust-owned vector
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Interpret the buffer as UTF-8 text, releasing it afterwards
    pub fn into_text(self) -> BridgeResult<String> {
        std::str::from_utf8(self.as_slice())
            .map(str::to_owned)
            .map_err(|e| BridgeError::InvalidText(format!("native buffer is not UTF-8: {e}")))
    }
}

impl Deref for OwnedBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for OwnedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq<[u8]> for OwnedBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl PartialEq<OwnedBuffer> for OwnedBuffer {
    fn eq(&self, other: &OwnedBuffer) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuffer").field("len", &self.len).finish()
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        // Safety: ownership was transferred to us in `from_raw`; `self` is
        // never used again.
        unsafe { (self.release)(self.ptr.as_ptr(), self.len) }
    }
}
