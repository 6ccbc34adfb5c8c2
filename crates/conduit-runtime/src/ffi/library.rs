//! A bound native engine
//!
//! `NativeLibrary` owns everything needed to call one engine: the function
//! table, the engine handle, and (for dynamically loaded engines) the
//! `libloading::Library` keeping the code mapped.

use crate::buffer::OwnedBuffer;
use crate::ffi::marshal::OutBuffer;
use crate::ffi::types::{EngineFreeFn, NativeApi};
use libloading::Library;
use std::fmt;

pub struct NativeLibrary {
    api: NativeApi,
    free_engine: Option<EngineFreeFn>,
    // Dropped after `free_engine` runs in `Drop::drop`.
    _library: Option<Library>,
}

// Safety: every conduit entry point must be callable from any thread, and
// the engine handle is only ever passed back to those entry points.
unsafe impl Send for NativeLibrary {}
unsafe impl Sync for NativeLibrary {}

impl NativeLibrary {
    /// Wrap a function table for an engine linked into this process
    ///
    /// `free_engine`, when given, is called with `api.engine` on drop.
    ///
    /// # Safety
    ///
    /// The pointers in `api` must implement the conduit ABI and stay valid
    /// for the lifetime of the returned value.
    pub unsafe fn from_api(api: NativeApi, free_engine: Option<EngineFreeFn>) -> Self {
        Self {
            api,
            free_engine,
            _library: None,
        }
    }

    pub(crate) fn from_loaded(
        api: NativeApi,
        free_engine: Option<EngineFreeFn>,
        library: Library,
    ) -> Self {
        Self {
            api,
            free_engine,
            _library: Some(library),
        }
    }

    pub fn api(&self) -> &NativeApi {
        &self.api
    }

    /// Whether the engine lives in a dynamically loaded library
    pub fn is_dynamic(&self) -> bool {
        self._library.is_some()
    }

    /// Wrap out parameters written by this engine
    ///
    /// # Safety
    ///
    /// `out` must hold either `(null, 0)` or a buffer allocated by this engine.
    pub(crate) unsafe fn wrap(&self, out: OutBuffer) -> Option<OwnedBuffer> {
        out.into_owned(self.api.release_buffer)
    }

    /// Move the calling thread's error detail out of the engine
    ///
    /// Must run on the thread that observed the failure, before any other
    /// call into the engine from that thread.
    pub fn take_last_error(&self) -> Option<String> {
        let mut out = OutBuffer::new();
        // Safety: the slots are valid for the call; the engine writes either
        // nothing or one of its own buffers.
        let buffer = unsafe {
            (self.api.take_last_error)(out.ptr_slot(), out.len_slot());
            self.wrap(out)
        }?;
        Some(String::from_utf8_lossy(buffer.as_slice()).into_owned())
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("api", &self.api)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        if let Some(free_engine) = self.free_engine {
            if !self.api.engine.is_null() {
                // Safety: the handle came from this engine and is not used
                // after this point.
                unsafe { free_engine(self.api.engine) };
            }
        }
        tracing::debug!("native engine released");
    }
}
