//! Execution bridge - typed requests in, typed responses out
//!
//! `execute` serializes a request, registers a pending call, hands the text
//! to the engine and awaits the completion. The calling task is suspended,
//! never blocked.

use crate::bridge::Bridge;
use crate::continuation::{on_complete, pending_calls, PendingCall};
use crate::error::{BridgeError, BridgeResult};
use crate::ffi::marshal::to_c_text;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::type_name;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A request the engine can execute
///
/// The serialized form names the operation; the reference engine reads a
/// `"$type"` field, which `#[serde(tag = "$type")]` provides.
pub trait Request: Serialize {
    type Response: DeserializeOwned;
}

impl Bridge {
    /// Execute a typed request
    ///
    /// Native failures arrive already translated as
    /// `BridgeError::NativeStatus`. Nothing is retried.
    pub async fn execute<Q: Request>(&self, request: &Q) -> BridgeResult<Q::Response> {
        let text = serde_json::to_string(request).map_err(|source| BridgeError::Serialize {
            type_name: type_name::<Q>(),
            source,
        })?;

        let response = self.execute_raw(&text).await?;

        serde_json::from_str(&response).map_err(|source| BridgeError::Deserialize {
            type_name: type_name::<Q::Response>(),
            source,
        })
    }

    /// Execute a request given as canonical text
    pub async fn execute_raw(&self, request: &str) -> BridgeResult<String> {
        let call = self.start(request)?;
        let token = call.token();
        let outcome = call.await;
        tracing::debug!(token, ok = outcome.is_ok(), "native execute finished");
        outcome
    }

    /// Execute with a deadline
    ///
    /// On timeout the call is abandoned: its slot stays registered until the
    /// engine calls back, and the late outcome is dropped.
    pub async fn execute_with_timeout<Q: Request>(
        &self,
        request: &Q,
        timeout: Duration,
    ) -> BridgeResult<Q::Response> {
        with_timeout(timeout, self.execute(request)).await
    }

    pub async fn execute_raw_with_timeout(
        &self,
        request: &str,
        timeout: Duration,
    ) -> BridgeResult<String> {
        with_timeout(timeout, self.execute_raw(request)).await
    }

    /// Register a slot then hand the request to the engine
    fn start(&self, request: &str) -> BridgeResult<PendingCall> {
        let request = to_c_text(request)?;
        let call = pending_calls().register(Arc::clone(&self.shared));
        tracing::debug!(token = call.token(), "native execute started");

        let api = self.library().api();
        // Safety: `request` outlives the call and the engine copies it before
        // returning; the context is a token only `on_complete` interprets.
        unsafe { (api.execute)(api.engine, request.as_ptr(), call.context(), on_complete) };

        Ok(call)
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = BridgeResult<T>>,
) -> BridgeResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(?timeout, "native execute timed out");
            Err(BridgeError::TimedOut(timeout))
        }
    }
}
