//! Request scheduling
//!
//! Requests are JSON objects whose `"$type"` field names an operation.
//! Each request runs on the engine's own tokio runtime, on a blocking
//! worker, and completes from that worker thread.

use crate::error::EngineError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};

/// Field naming the operation in every request
pub const TYPE_FIELD: &str = "$type";

/// Operation handler: request object in, response object out
pub type Handler = Arc<dyn Fn(Value) -> Result<Value, EngineError> + Send + Sync>;

/// Engine construction options, as passed to `conduit_engine_new`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

pub struct EngineBuilder {
    worker_threads: Option<usize>,
    operations: HashMap<String, Handler>,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            worker_threads: None,
            operations: HashMap::new(),
        }
        .operation("ping", |_| Ok(json!({ "pong": true })))
        .operation("echo", echo)
        .operation("sleep", sleep)
    }

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n.max(1));
        self
    }

    /// Register an operation, replacing any earlier one with the same name
    pub fn operation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, EngineError> + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn config(mut self, config: &EngineConfig) -> Self {
        if let Some(n) = config.worker_threads {
            self = self.worker_threads(n);
        }
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let mut builder = Builder::new_multi_thread();
        builder.thread_name("conduit-engine").enable_time();
        if let Some(n) = self.worker_threads {
            builder.worker_threads(n).max_blocking_threads(n.max(4));
        }
        let runtime = builder
            .build()
            .map_err(|e| EngineError::Runtime(e.to_string()))?;

        tracing::debug!(
            operations = self.operations.len(),
            worker_threads = ?self.worker_threads,
            "engine started"
        );

        Ok(Engine {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            operations: Arc::new(self.operations),
        })
    }
}

/// The reference engine
pub struct Engine {
    handle: Handle,
    runtime: Option<Runtime>,
    operations: Arc<HashMap<String, Handler>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Engine with only the built-in operations
    pub fn new() -> Result<Self, EngineError> {
        Self::builder().build()
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Run `request` on a worker and pass its result to `complete` there
    pub fn submit<F>(&self, request: String, complete: F)
    where
        F: FnOnce(Result<String, EngineError>) + Send + 'static,
    {
        let operations = Arc::clone(&self.operations);
        self.handle.spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| dispatch(&operations, &request)))
                .unwrap_or_else(|payload| Err(EngineError::Panicked(panic_message(&*payload))));
            complete(result);
        });
    }

    /// Move the engine behind an opaque handle
    pub fn into_handle(self) -> *const std::ffi::c_void {
        Box::into_raw(Box::new(self)) as *const std::ffi::c_void
    }

    /// Drop an engine created by [`Engine::into_handle`]
    ///
    /// # Safety
    ///
    /// `handle` must come from `into_handle` and not be used afterwards.
    pub unsafe fn free_handle(handle: *const std::ffi::c_void) {
        if !handle.is_null() {
            drop(Box::from_raw(handle as *mut Engine));
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<&str> = self.operations().collect();
        operations.sort_unstable();
        f.debug_struct("Engine")
            .field("operations", &operations)
            .finish_non_exhaustive()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Running workers finish on their own; the caller may be inside
        // another runtime, where a blocking shutdown would panic.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        tracing::debug!("engine stopped");
    }
}

fn dispatch(operations: &HashMap<String, Handler>, request: &str) -> Result<String, EngineError> {
    let request: Value = serde_json::from_str(request)
        .map_err(|e| EngineError::InvalidArgument(format!("request is not JSON: {e}")))?;
    let name = request
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            EngineError::InvalidArgument(format!("request has no \"{TYPE_FIELD}\" field"))
        })?
        .to_owned();

    let handler = operations
        .get(&name)
        .ok_or_else(|| EngineError::UnknownOperation(name.clone()))?;

    tracing::trace!(operation = %name, "dispatching");
    let response = handler(request)?;
    Ok(response.to_string())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn echo(mut request: Value) -> Result<Value, EngineError> {
    if let Some(object) = request.as_object_mut() {
        object.remove(TYPE_FIELD);
    }
    Ok(request)
}

fn sleep(request: Value) -> Result<Value, EngineError> {
    let ms = request
        .get("ms")
        .and_then(Value::as_u64)
        .ok_or_else(|| EngineError::InvalidArgument("sleep needs an integer \"ms\"".into()))?;
    std::thread::sleep(Duration::from_millis(ms));
    Ok(json!({ "sleptMs": ms }))
}
