//! Codec stability fuzzer
//!
//! Feeds arbitrary bytes to `Bridge::decode` and `Bridge::decode_raw`.
//!
//! Stability contracts:
//! - Decoding never panics or aborts, whatever the input
//! - Every failure is a `NativeStatus` or `Deserialize` error
//! - Bytes that decode re-encode and decode to the same text

#![no_main]

use libfuzzer_sys::fuzz_target;

use conduit_engine::{abi, Engine};
use conduit_runtime::{Bridge, BridgeError, DomainObject, NativeApi, NativeLibrary};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleInfo {
    schedule_id: String,
    memo: Option<String>,
}

impl DomainObject for ScheduleInfo {
    const TYPE_TAG: &'static str = "ScheduleInfo";
}

fn bridge() -> &'static Bridge {
    static BRIDGE: OnceLock<Bridge> = OnceLock::new();
    BRIDGE.get_or_init(|| {
        let engine = Engine::builder().worker_threads(1).build().unwrap();
        let api = NativeApi {
            engine: engine.into_handle(),
            execute: abi::conduit_execute,
            decode: abi::conduit_decode,
            encode: abi::conduit_encode,
            release_buffer: abi::conduit_release_buffer,
            take_last_error: abi::conduit_take_last_error,
        };
        Bridge::new(unsafe { NativeLibrary::from_api(api, Some(abi::conduit_engine_free)) })
    })
}

fuzz_target!(|data: &[u8]| {
    let bridge = bridge();

    match bridge.decode::<ScheduleInfo>(data) {
        Ok(_) => {}
        Err(BridgeError::NativeStatus { .. }) | Err(BridgeError::Deserialize { .. }) => {}
        Err(other) => panic!("unexpected decode error: {other:?}"),
    }

    if let Ok(text) = bridge.decode_raw("ScheduleInfo", data) {
        let bytes = bridge.encode_raw("ScheduleInfo", &text).unwrap();
        assert_eq!(bridge.decode_raw("ScheduleInfo", &bytes).unwrap(), text);
    }
});
