//! Shared test utilities
//!
//! Bridges over an in-process reference engine, plus the domain types the
//! integration tests exchange with it.

#![allow(dead_code)]

use conduit_engine::{abi, Engine, EngineError};
use conduit_runtime::ffi::types::EngineFreeFn;
use conduit_runtime::{Bridge, DomainObject, NativeApi, NativeLibrary, Request};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use pretty_assertions::{assert_eq, assert_ne};

/// Wrap an in-process engine in a bridge
pub fn bridge_for(engine: Engine) -> Bridge {
    Bridge::new(engine_library(engine, abi::conduit_engine_free))
}

/// Bind an in-process engine, freeing it through `free`
pub fn engine_library(engine: Engine, free: EngineFreeFn) -> NativeLibrary {
    let api = NativeApi {
        engine: engine.into_handle(),
        execute: abi::conduit_execute,
        decode: abi::conduit_decode,
        encode: abi::conduit_encode,
        release_buffer: abi::conduit_release_buffer,
        take_last_error: abi::conduit_take_last_error,
    };
    // Safety: the reference engine implements the conduit ABI, and `free`
    // releases the handle exactly once.
    unsafe { NativeLibrary::from_api(api, Some(free)) }
}

/// Engine with the operations the tests exercise
pub fn test_engine() -> Engine {
    Engine::builder()
        .worker_threads(4)
        .operation("schedule_info", |_| Ok(json!({ "scheduleId": "0.0.1" })))
        .operation("submit", |_| {
            Err(EngineError::failed("INVALID_SIGNATURE", "")
                .with_transaction_id("0.0.5006@1554158542.0"))
        })
        .operation("precheck", |_| {
            Err(EngineError::failed("TransactionPreCheckStatus", "rejected by node")
                .with_status("INSUFFICIENT_PAYER_BALANCE"))
        })
        .operation("counter", |request| {
            let n = request.get("n").and_then(|n| n.as_u64()).unwrap_or(0);
            Ok(json!({ "n": n }))
        })
        .build()
        .unwrap()
}

pub fn test_bridge() -> Bridge {
    bridge_for(test_engine())
}

#[derive(Debug, Serialize)]
#[serde(tag = "$type", rename = "schedule_info")]
pub struct ScheduleInfoQuery {}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfoResponse {
    pub schedule_id: String,
}

impl Request for ScheduleInfoQuery {
    type Response = ScheduleInfoResponse;
}

#[derive(Debug, Serialize)]
#[serde(tag = "$type", rename = "submit")]
pub struct SubmitTransaction {
    pub memo: String,
}

impl Request for SubmitTransaction {
    type Response = serde_json::Value;
}

#[derive(Debug, Serialize)]
#[serde(tag = "$type", rename = "counter")]
pub struct Counter {
    pub n: u64,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct CounterResponse {
    pub n: u64,
}

impl Request for Counter {
    type Response = CounterResponse;
}

#[derive(Debug, Serialize)]
#[serde(tag = "$type", rename = "sleep")]
pub struct Sleep {
    pub ms: u64,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slept {
    pub slept_ms: u64,
}

impl Request for Sleep {
    type Response = Slept;
}

/// A domain object with optional fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfo {
    pub schedule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
    #[serde(default)]
    pub signatories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed: Option<bool>,
}

impl DomainObject for ScheduleInfo {
    const TYPE_TAG: &'static str = "ScheduleInfo";
}

impl ScheduleInfo {
    pub fn minimal() -> Self {
        Self {
            schedule_id: "0.0.1".to_string(),
            memo: None,
            expiration_time: None,
            admin_key: None,
            signatories: Vec::new(),
            executed: None,
        }
    }

    pub fn full() -> Self {
        Self {
            schedule_id: "0.0.1234".to_string(),
            memo: Some("payroll – März".to_string()),
            expiration_time: Some(1_554_158_542),
            admin_key: Some("302a300506032b6570032100e0c8ec27".to_string()),
            signatories: vec!["0.0.2".to_string(), "0.0.5006".to_string()],
            executed: Some(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl DomainObject for AccountId {
    const TYPE_TAG: &'static str = "AccountId";
}
