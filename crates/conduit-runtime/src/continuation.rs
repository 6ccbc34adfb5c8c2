//! Continuation bridge - native completion callbacks → awaiting callers
//!
//! Every outstanding call owns one slot in the process-wide [`PendingCalls`]
//! arena, keyed by a token that crosses the ABI as the callback `context`.
//!
//! # State Machine
//! - Pending → Resumed (first completion removes the slot)
//! - Resumed → Consumed (the caller's `PendingCall` yields the outcome)
//! - Pending → Abandoned (caller dropped; retired when the completion arrives)
//!
//! A second completion for the same token, or a completion for a token that
//! was never issued, is a protocol violation.

use crate::bridge::BridgeShared;
use crate::error::{fault, fault_abort, translate, BridgeResult, ProtocolViolation};
use crate::ffi::marshal::read_c_text;
use std::collections::HashMap;
use std::future::Future;
use std::os::raw::{c_char, c_int, c_void};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Outcome delivered to a waiting caller: response text or a translated error
pub type Outcome = BridgeResult<String>;

/// Whether a resumed call still had a caller waiting for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumed {
    Delivered,
    Abandoned,
}

struct Slot {
    sender: oneshot::Sender<Outcome>,
    shared: Arc<BridgeShared>,
}

/// Arena of outstanding native calls
pub struct PendingCalls {
    next_token: AtomicU64,
    slots: Mutex<HashMap<u64, Slot>>,
}

static PENDING: OnceLock<PendingCalls> = OnceLock::new();

/// The process-wide arena used by `on_complete`
pub fn pending_calls() -> &'static PendingCalls {
    PENDING.get_or_init(PendingCalls::new)
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            // Token 0 would be a null context pointer.
            next_token: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Create a slot for a call about to cross the boundary
    pub(crate) fn register(&self, shared: Arc<BridgeShared>) -> PendingCall {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(token, Slot { sender, shared });

        PendingCall { token, receiver }
    }

    /// Deliver the outcome for `token`
    ///
    /// The slot is removed under the lock; delivery happens after it is
    /// released.
    pub fn resume(&self, token: u64, outcome: Outcome) -> Result<Resumed, ProtocolViolation> {
        let slot = self.lock().remove(&token);
        let Some(slot) = slot else {
            return Err(self.missing(token));
        };

        slot.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        match slot.sender.send(outcome) {
            Ok(()) => Ok(Resumed::Delivered),
            Err(_) => {
                tracing::debug!(token, "completion arrived for an abandoned call");
                Ok(Resumed::Abandoned)
            }
        }
    }

    /// Bridge state of a still-pending call
    fn shared(&self, token: u64) -> Result<Arc<BridgeShared>, ProtocolViolation> {
        self.lock()
            .get(&token)
            .map(|slot| Arc::clone(&slot.shared))
            .ok_or_else(|| self.missing(token))
    }

    /// Number of calls waiting for a completion across all bridges
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tokens below the counter were issued; their slot only leaves the map
    /// through `resume`.
    fn missing(&self, token: u64) -> ProtocolViolation {
        if token != 0 && token < self.next_token.load(Ordering::Relaxed) {
            ProtocolViolation::DoubleResume { token }
        } else {
            ProtocolViolation::UnknownToken { token }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller side of one outstanding call
///
/// Dropping it abandons the call; the slot stays until the engine calls back.
#[must_use = "a PendingCall does nothing unless awaited"]
pub struct PendingCall {
    token: u64,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingCall {
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Token as the opaque `context` pointer handed to the engine
    pub(crate) fn context(&self) -> *const c_void {
        self.token as usize as *const c_void
    }
}

impl Future for PendingCall {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let token = self.token;
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => fault(ProtocolViolation::CompletionLost { token }),
            Poll::Pending => Poll::Pending,
        }
    }
}

static COMPLETIONS: AtomicUsize = AtomicUsize::new(0);

/// Number of completions `on_complete` has processed in this process
pub fn completions() -> usize {
    COMPLETIONS.load(Ordering::Relaxed)
}

/// Completion callback handed to `conduit_execute`
///
/// Runs on an engine thread. A failing status has its detail taken from the
/// engine right here, on the thread that produced it.
pub(crate) unsafe extern "C" fn on_complete(
    context: *const c_void,
    status: c_int,
    response: *const c_char,
) {
    COMPLETIONS.fetch_add(1, Ordering::Relaxed);
    let calls = pending_calls();
    let token = context as usize as u64;

    let shared = match calls.shared(token) {
        Ok(shared) => shared,
        Err(violation) => fault_abort(violation),
    };

    let outcome = match translate(status, || shared.library.take_last_error()) {
        Ok(()) => match read_c_text(response) {
            Some(text) => text,
            None => fault_abort(ProtocolViolation::MissingResult {
                operation: "execute",
            }),
        },
        Err(err) => {
            tracing::warn!(token, %err, "native execute failed");
            Err(err)
        }
    };
    drop(shared);

    if let Err(violation) = calls.resume(token, outcome) {
        fault_abort(violation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::ffi::library::NativeLibrary;
    use crate::ffi::types::{CompletionCallback, NativeApi, STATUS_OK};

    unsafe extern "C" fn no_execute(
        _engine: *const c_void,
        _request: *const c_char,
        _context: *const c_void,
        _callback: CompletionCallback,
    ) {
    }

    unsafe extern "C" fn no_decode(
        _tag: *const c_char,
        _bytes: *const u8,
        _len: usize,
        _out_ptr: *mut *mut u8,
        _out_len: *mut usize,
    ) -> c_int {
        STATUS_OK
    }

    unsafe extern "C" fn no_encode(
        _tag: *const c_char,
        _text: *const c_char,
        _out_ptr: *mut *mut u8,
        _out_len: *mut usize,
    ) -> c_int {
        STATUS_OK
    }

    unsafe extern "C" fn no_release(_ptr: *mut u8, _len: usize) {}

    unsafe extern "C" fn no_last_error(_out_ptr: *mut *mut u8, _out_len: *mut usize) {}

    fn shared() -> Arc<BridgeShared> {
        let api = NativeApi {
            engine: std::ptr::null(),
            execute: no_execute,
            decode: no_decode,
            encode: no_encode,
            release_buffer: no_release,
            take_last_error: no_last_error,
        };
        Arc::new(BridgeShared::new(unsafe { NativeLibrary::from_api(api, None) }))
    }

    #[tokio::test]
    async fn test_resume_delivers() {
        let calls = PendingCalls::new();
        let shared = shared();
        let call = calls.register(Arc::clone(&shared));
        let token = call.token();
        assert_eq!(shared.in_flight.load(Ordering::SeqCst), 1);

        let resumed = calls.resume(token, Ok("{}".to_string())).unwrap();
        assert_eq!(resumed, Resumed::Delivered);
        assert_eq!(call.await.unwrap(), "{}");
        assert_eq!(shared.in_flight.load(Ordering::SeqCst), 0);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_tokens_are_never_zero() {
        let calls = PendingCalls::new();
        let shared = shared();
        let first = calls.register(Arc::clone(&shared));
        let second = calls.register(shared);
        assert_ne!(first.token(), 0);
        assert_ne!(first.token(), second.token());
        assert!(!first.context().is_null());
    }

    #[test]
    fn test_double_resume_detected() {
        let calls = PendingCalls::new();
        let call = calls.register(shared());
        let token = call.token();

        calls.resume(token, Ok("{}".to_string())).unwrap();
        let err = calls.resume(token, Ok("{}".to_string())).unwrap_err();
        assert_eq!(err, ProtocolViolation::DoubleResume { token });
    }

    #[test]
    fn test_unknown_token_detected() {
        let calls = PendingCalls::new();
        assert_eq!(
            calls.resume(0, Ok(String::new())).unwrap_err(),
            ProtocolViolation::UnknownToken { token: 0 }
        );
        assert_eq!(
            calls.resume(99, Ok(String::new())).unwrap_err(),
            ProtocolViolation::UnknownToken { token: 99 }
        );
    }

    #[test]
    fn test_abandoned_call_retired_on_completion() {
        let calls = PendingCalls::new();
        let shared = shared();
        let call = calls.register(Arc::clone(&shared));
        let token = call.token();
        drop(call);

        // The slot survives the caller.
        assert_eq!(calls.len(), 1);
        assert_eq!(shared.in_flight.load(Ordering::SeqCst), 1);

        let resumed = calls.resume(token, Ok("late".to_string())).unwrap();
        assert_eq!(resumed, Resumed::Abandoned);
        assert!(calls.is_empty());
        assert_eq!(shared.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_errors_delivered_unchanged() {
        let calls = PendingCalls::new();
        let call = calls.register(shared());
        let token = call.token();

        calls
            .resume(token, Err(BridgeError::InvalidText("bad".to_string())))
            .unwrap();
        assert!(matches!(call.await, Err(BridgeError::InvalidText(msg)) if msg == "bad"));
    }

    #[test]
    fn test_slot_keeps_library_alive() {
        let calls = PendingCalls::new();
        let shared = shared();
        let call = calls.register(Arc::clone(&shared));
        assert_eq!(Arc::strong_count(&shared), 2);

        calls.resume(call.token(), Ok(String::new())).unwrap();
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
