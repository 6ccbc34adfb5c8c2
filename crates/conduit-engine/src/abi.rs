//! C ABI exports
//!
//! Every buffer handed out here is a `Box<[u8]>` and goes back through
//! `conduit_release_buffer`. Failures store their detail in the calling
//! thread's last-error slot before returning (or calling back) with a
//! non-OK status.

use crate::engine::{Engine, EngineConfig};
use crate::error::{self, status, EngineError};
use crate::frame;
use crate::stats;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};

/// Completion callback supplied by the caller of `conduit_execute`
pub type CompletionCallback =
    unsafe extern "C" fn(context: *const c_void, status: c_int, response: *const c_char);

/// Create an engine from JSON configuration (`{}` or null for defaults)
///
/// Returns null on failure; the reason is in the last-error slot.
#[no_mangle]
pub unsafe extern "C" fn conduit_engine_new(config: *const c_char) -> *const c_void {
    let engine = read_text(config, "config")
        .map(|text| text.unwrap_or_else(|| "{}".to_string()))
        .and_then(|text| {
            serde_json::from_str::<EngineConfig>(&text)
                .map_err(|e| EngineError::InvalidArgument(format!("engine config: {e}")))
        })
        .and_then(|config| Engine::builder().config(&config).build());

    match engine {
        Ok(engine) => engine.into_handle(),
        Err(err) => {
            error::set_last_error(&err);
            std::ptr::null()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn conduit_engine_free(engine: *const c_void) {
    Engine::free_handle(engine);
}

/// Submit `request` and return immediately
///
/// `callback` runs exactly once, on an engine worker, or on this thread when
/// the request is rejected before it is scheduled.
#[no_mangle]
pub unsafe extern "C" fn conduit_execute(
    engine: *const c_void,
    request: *const c_char,
    context: *const c_void,
    callback: CompletionCallback,
) {
    let context = CallContext { context, callback };

    if engine.is_null() {
        return context.complete(Err(EngineError::InvalidArgument("null engine".into())));
    }
    let request = match read_text(request, "request") {
        Ok(Some(request)) => request,
        Ok(None) => {
            return context.complete(Err(EngineError::InvalidArgument("null request".into())))
        }
        Err(err) => return context.complete(Err(err)),
    };

    let engine = &*(engine as *const Engine);
    engine.submit(request, move |result| context.complete(result));
}

/// Decode a frame into canonical text
#[no_mangle]
pub unsafe extern "C" fn conduit_decode(
    type_tag: *const c_char,
    bytes: *const u8,
    len: usize,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> c_int {
    guarded(out_ptr, out_len, || {
        let tag = required_text(type_tag, "type tag")?;
        let bytes = match (bytes.is_null(), len) {
            (true, 0) => &[][..],
            (true, _) => return Err(EngineError::InvalidArgument("null bytes".into())),
            (false, _) => std::slice::from_raw_parts(bytes, len),
        };
        frame::decode(&tag, bytes).map(String::into_bytes)
    })
}

/// Encode canonical text into a frame
#[no_mangle]
pub unsafe extern "C" fn conduit_encode(
    type_tag: *const c_char,
    text: *const c_char,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> c_int {
    guarded(out_ptr, out_len, || {
        let tag = required_text(type_tag, "type tag")?;
        let text = required_text(text, "text")?;
        frame::encode(&tag, &text)
    })
}

#[no_mangle]
pub unsafe extern "C" fn conduit_release_buffer(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }
    stats::buffer_released();
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
}

/// Move this thread's last error detail out, or write `(null, 0)`
#[no_mangle]
pub unsafe extern "C" fn conduit_take_last_error(out_ptr: *mut *mut u8, out_len: *mut usize) {
    if out_ptr.is_null() || out_len.is_null() {
        return;
    }
    match error::take_last_error() {
        Some(detail) => write_buffer(out_ptr, out_len, detail.into_bytes()),
        None => {
            *out_ptr = std::ptr::null_mut();
            *out_len = 0;
        }
    }
}

struct CallContext {
    context: *const c_void,
    callback: CompletionCallback,
}

// Safety: the context is an opaque token owned by the caller, who accepts
// callbacks from any thread.
unsafe impl Send for CallContext {}

impl CallContext {
    fn complete(self, result: Result<String, EngineError>) {
        let result = result.and_then(|text| {
            CString::new(text)
                .map_err(|_| EngineError::failed("InvalidResponse", "response contains a nul byte"))
        });

        stats::callback_fired();
        match result {
            // Safety: `response` outlives the callback.
            Ok(response) => unsafe { (self.callback)(self.context, status::OK, response.as_ptr()) },
            Err(err) => {
                error::set_last_error(&err);
                unsafe { (self.callback)(self.context, err.status(), std::ptr::null()) }
            }
        }
    }
}

/// Run a buffer-producing operation with panic and error handling
unsafe fn guarded<F>(out_ptr: *mut *mut u8, out_len: *mut usize, op: F) -> c_int
where
    F: FnOnce() -> Result<Vec<u8>, EngineError>,
{
    if out_ptr.is_null() || out_len.is_null() {
        error::set_last_error(&EngineError::InvalidArgument("null out parameter".into()));
        return status::INVALID_ARGUMENT;
    }
    *out_ptr = std::ptr::null_mut();
    *out_len = 0;

    let result = panic::catch_unwind(AssertUnwindSafe(op))
        .unwrap_or_else(|_| Err(EngineError::Panicked("codec panicked".into())));
    match result {
        Ok(bytes) => {
            write_buffer(out_ptr, out_len, bytes);
            status::OK
        }
        Err(err) => {
            error::set_last_error(&err);
            err.status()
        }
    }
}

unsafe fn write_buffer(out_ptr: *mut *mut u8, out_len: *mut usize, bytes: Vec<u8>) {
    let boxed = bytes.into_boxed_slice();
    *out_len = boxed.len();
    *out_ptr = Box::into_raw(boxed) as *mut u8;
    stats::buffer_allocated();
}

unsafe fn read_text(ptr: *const c_char, what: &str) -> Result<Option<String>, EngineError> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(|text| Some(text.to_owned()))
        .map_err(|e| EngineError::InvalidArgument(format!("{what} is not UTF-8: {e}")))
}

unsafe fn required_text(ptr: *const c_char, what: &str) -> Result<String, EngineError> {
    read_text(ptr, what)?.ok_or_else(|| EngineError::InvalidArgument(format!("null {what}")))
}
