pub mod codec;
pub mod exec;
pub mod info;

use anyhow::{bail, Context, Result};
use clap::Args;
use conduit_config::Config;
use conduit_engine::{abi, Engine};
use conduit_runtime::{Bridge, LibraryLoader, NativeApi, NativeLibrary};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Which engine a command talks to
#[derive(Debug, Clone, Default, Args)]
pub struct EngineArgs {
    /// Engine library path or name (overrides configuration)
    #[arg(long, short = 'l')]
    pub library: Option<PathBuf>,
    /// Use the in-process reference engine
    #[arg(long, conflicts_with = "library")]
    pub builtin: bool,
}

/// Open a bridge to the selected engine
pub fn open_bridge(args: &EngineArgs, config: &Config) -> Result<Bridge> {
    if args.builtin {
        return builtin_bridge(config.worker_threads());
    }

    let target = match (&args.library, config.library_target()) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(target)) => target,
        (None, None) => bail!(
            "No engine library configured. Pass --library, set CONDUIT_LIBRARY, \
             add [library] to conduit.toml, or use --builtin"
        ),
    };

    let loader = library_loader(config);
    let engine_config = engine_config(config);
    let bridge = Bridge::load_with(&loader, &target, engine_config.as_deref())
        .with_context(|| format!("Failed to load engine library: {target}"))?;
    Ok(bridge)
}

/// Loader searching configured paths first, in their configured order
pub fn library_loader(config: &Config) -> LibraryLoader {
    let mut loader = LibraryLoader::new();
    for path in config.search_paths().iter().rev() {
        loader.add_search_path(path.clone());
    }
    loader
}

/// Creation options for `conduit_engine_new`
fn engine_config(config: &Config) -> Option<String> {
    config
        .worker_threads()
        .map(|n| serde_json::json!({ "workerThreads": n }).to_string())
}

fn builtin_bridge(worker_threads: Option<usize>) -> Result<Bridge> {
    let mut builder = Engine::builder();
    if let Some(n) = worker_threads {
        builder = builder.worker_threads(n);
    }
    let engine = builder
        .build()
        .context("Failed to start the built-in engine")?;

    let api = NativeApi {
        engine: engine.into_handle(),
        execute: abi::conduit_execute,
        decode: abi::conduit_decode,
        encode: abi::conduit_encode,
        release_buffer: abi::conduit_release_buffer,
        take_last_error: abi::conduit_take_last_error,
    };
    // Safety: the reference engine implements the conduit ABI, and
    // conduit_engine_free releases the handle from into_handle.
    let library = unsafe { NativeLibrary::from_api(api, Some(abi::conduit_engine_free)) };
    tracing::debug!("using built-in engine");
    Ok(Bridge::new(library))
}

/// Read a text argument: '-' is stdin, an existing file is read, anything
/// else is taken literally
pub fn read_text_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    let path = Path::new(input);
    if path.is_file() {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {input}"));
    }

    Ok(input.to_string())
}

/// Pretty-print JSON text unless `compact`
pub fn format_json(text: &str, compact: bool) -> Result<String> {
    if compact {
        return Ok(text.to_string());
    }
    let value: serde_json::Value =
        serde_json::from_str(text).context("Engine returned invalid JSON")?;
    Ok(serde_json::to_string_pretty(&value)?)
}
