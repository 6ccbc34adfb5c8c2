//! Binary frame codec
//!
//! ```text
//! +---------+---------+-----------+--------------------------+
//! | "CDT"01 | tag len | tag bytes | zlib(canonical JSON)     |
//! | 4 bytes | u16 BE  | tag len   | rest of the frame        |
//! +---------+---------+-----------+--------------------------+
//! ```
//!
//! Decoding checks the magic, the tag, the zlib checksum and the JSON.

use crate::error::EngineError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Read, Write};

pub const MAGIC: &[u8; 4] = b"CDT\x01";

/// Upper bound on a decompressed payload
pub const MAX_PAYLOAD: u64 = 16 * 1024 * 1024;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// Encode canonical text for `type_tag` into a frame
pub fn encode(type_tag: &str, text: &str) -> Result<Vec<u8>, EngineError> {
    check_tag(type_tag)?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| EngineError::InvalidArgument(format!("text is not JSON: {e}")))?;
    let canonical = value.to_string();

    let tag_len = u16::try_from(type_tag.len())
        .map_err(|_| EngineError::InvalidArgument("type tag longer than 65535 bytes".into()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + type_tag.len() + canonical.len() / 2);
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&tag_len.to_be_bytes());
    frame.extend_from_slice(type_tag.as_bytes());

    let mut encoder = ZlibEncoder::new(frame, Compression::default());
    encoder
        .write_all(canonical.as_bytes())
        .map_err(|e| EngineError::failed("Compression", e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| EngineError::failed("Compression", e.to_string()))
}

/// Decode a frame holding a `type_tag` object back into canonical text
pub fn decode(type_tag: &str, bytes: &[u8]) -> Result<String, EngineError> {
    check_tag(type_tag)?;
    if bytes.len() < HEADER_LEN {
        return Err(EngineError::Corrupt(format!(
            "frame is {} bytes, shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(EngineError::Corrupt("bad magic".into()));
    }

    let tag_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
    let body = &bytes[HEADER_LEN..];
    if body.len() < tag_len {
        return Err(EngineError::Corrupt("truncated type tag".into()));
    }
    let (tag, payload) = body.split_at(tag_len);
    if tag != type_tag.as_bytes() {
        return Err(EngineError::Corrupt(format!(
            "frame holds {}, expected {type_tag}",
            String::from_utf8_lossy(tag)
        )));
    }

    let mut json = Vec::new();
    ZlibDecoder::new(payload)
        .take(MAX_PAYLOAD + 1)
        .read_to_end(&mut json)
        .map_err(|e| EngineError::Corrupt(format!("payload: {e}")))?;
    if json.len() as u64 > MAX_PAYLOAD {
        return Err(EngineError::Corrupt("payload exceeds size limit".into()));
    }

    let value: Value = serde_json::from_slice(&json)
        .map_err(|e| EngineError::Corrupt(format!("payload is not JSON: {e}")))?;
    Ok(value.to_string())
}

fn check_tag(type_tag: &str) -> Result<(), EngineError> {
    if type_tag.is_empty() {
        return Err(EngineError::InvalidArgument("empty type tag".into()));
    }
    Ok(())
}
