//! Encode and decode commands

use super::{format_json, open_bridge, read_text_input, EngineArgs};
use anyhow::{Context, Result};
use conduit_config::Config;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EncodeArgs {
    pub type_tag: String,
    pub input: String,
    pub output: Option<PathBuf>,
    pub engine: EngineArgs,
}

#[derive(Debug, Clone)]
pub struct DecodeArgs {
    pub type_tag: String,
    pub file: PathBuf,
    pub compact: bool,
    pub engine: EngineArgs,
}

/// Encode JSON into the engine's binary form
pub fn encode(args: EncodeArgs, config: &Config) -> Result<()> {
    let text = read_text_input(&args.input)?;
    let bridge = open_bridge(&args.engine, config)?;

    let bytes = bridge
        .encode_raw(&args.type_tag, text.trim())
        .with_context(|| format!("Failed to encode {}", args.type_tag))?;

    match &args.output {
        Some(path) => {
            fs::write(path, bytes.as_slice())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), len = bytes.len(), "encoded");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes.as_slice())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Decode the engine's binary form and print it as JSON
pub fn decode(args: DecodeArgs, config: &Config) -> Result<()> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let bridge = open_bridge(&args.engine, config)?;

    let text = bridge
        .decode_raw(&args.type_tag, &bytes)
        .with_context(|| format!("Failed to decode {}", args.file.display()))?;
    println!("{}", format_json(&text, args.compact)?);
    Ok(())
}
