//! Round-trip codec - domain objects ↔ native binary encoding
//!
//! The engine owns the binary format. Rust only ever sees the canonical
//! text on one side and an `OwnedBuffer` on the other.

use crate::bridge::Bridge;
use crate::buffer::OwnedBuffer;
use crate::error::{fault, translate, BridgeError, BridgeResult, ProtocolViolation};
use crate::ffi::marshal::{to_c_text, OutBuffer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::type_name;

/// A value with a native binary encoding
///
/// `TYPE_TAG` names the type to the engine's codec.
pub trait DomainObject: Serialize + DeserializeOwned {
    const TYPE_TAG: &'static str;

    /// Decode through the installed bridge
    fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        Bridge::global()?.decode(bytes)
    }

    /// Encode through the installed bridge
    ///
    /// # Panics
    ///
    /// Without an installed bridge, or if the engine cannot encode a value
    /// it should accept.
    fn to_bytes(&self) -> Vec<u8> {
        match Bridge::global() {
            Ok(bridge) => bridge.encode(self).to_vec(),
            Err(_) => fault(ProtocolViolation::NoBridgeInstalled {
                operation: "to_bytes",
            }),
        }
    }
}

impl Bridge {
    /// Decode native bytes into a typed object
    ///
    /// Corrupt bytes are a `NativeStatus` error, never a crash.
    pub fn decode<T: DomainObject>(&self, bytes: &[u8]) -> BridgeResult<T> {
        let text = self.decode_raw(T::TYPE_TAG, bytes)?;
        serde_json::from_str(&text).map_err(|source| BridgeError::Deserialize {
            type_name: type_name::<T>(),
            source,
        })
    }

    /// Decode native bytes into canonical text
    pub fn decode_raw(&self, type_tag: &str, bytes: &[u8]) -> BridgeResult<String> {
        let tag = to_c_text(type_tag)?;
        let api = self.library().api();

        let mut out = OutBuffer::new();
        // Safety: `bytes` and `tag` are valid for the call; the out slots
        // receive an engine allocation or stay `(null, 0)`.
        let buffer = unsafe {
            let status = (api.decode)(
                tag.as_ptr(),
                bytes.as_ptr(),
                bytes.len(),
                out.ptr_slot(),
                out.len_slot(),
            );
            let buffer = self.library().wrap(out);
            translate(status, || self.library().take_last_error())?;
            buffer
        };

        match buffer {
            Some(buffer) => buffer.into_text(),
            None => fault(ProtocolViolation::MissingResult { operation: "decode" }),
        }
    }

    /// Encode a typed object into native bytes
    pub fn try_encode<T: DomainObject>(&self, value: &T) -> BridgeResult<OwnedBuffer> {
        let text = serde_json::to_string(value).map_err(|source| BridgeError::Serialize {
            type_name: type_name::<T>(),
            source,
        })?;
        self.encode_raw(T::TYPE_TAG, &text)
    }

    /// Encode a typed object, treating any failure as a protocol violation
    ///
    /// A well-typed domain object always has an encoding.
    pub fn encode<T: DomainObject>(&self, value: &T) -> OwnedBuffer {
        match self.try_encode(value) {
            Ok(buffer) => buffer,
            Err(err) => fault(ProtocolViolation::EncodeFailed {
                type_tag: T::TYPE_TAG,
                reason: err.to_string(),
            }),
        }
    }

    /// Encode canonical text into native bytes
    pub fn encode_raw(&self, type_tag: &str, text: &str) -> BridgeResult<OwnedBuffer> {
        let tag = to_c_text(type_tag)?;
        let text = to_c_text(text)?;
        let api = self.library().api();

        let mut out = OutBuffer::new();
        // Safety: as in `decode_raw`.
        let buffer = unsafe {
            let status = (api.encode)(tag.as_ptr(), text.as_ptr(), out.ptr_slot(), out.len_slot());
            let buffer = self.library().wrap(out);
            translate(status, || self.library().take_last_error())?;
            buffer
        };

        match buffer {
            Some(buffer) => Ok(buffer),
            None => fault(ProtocolViolation::MissingResult { operation: "encode" }),
        }
    }
}
