use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use conduit_config::{Config, ConfigLoader};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::EngineArgs;

/// Conduit: drive native engines through the conduit ABI.
///
/// Sends requests to an engine library, and encodes or decodes domain
/// objects with the engine's binary codec.
///
/// EXAMPLES:
///     conduit exec '{"$type":"ping"}' --builtin      Ping the built-in engine
///     conduit exec request.json -l ./libengine.so    Execute against a library
///     conduit encode -t AccountId account.json -o a.bin
///     conduit decode -t AccountId a.bin              Decode back to JSON
///     conduit info                                   Show resolved configuration
///
/// ENVIRONMENT VARIABLES:
///     CONDUIT_LIBRARY     Engine library path (overrides conduit.toml)
///     CONDUIT_TIMEOUT_MS  Execute deadline in milliseconds
///     CONDUIT_WORKERS     Engine worker threads
///     CONDUIT_LOG         Log filter, e.g. 'conduit_runtime=debug'
///     CONDUIT_CONFIG      Config file to use instead of searching for conduit.toml
#[derive(Parser)]
#[command(name = "conduit")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter directive (written to stderr)
    #[arg(long, global = true, env = "CONDUIT_LOG")]
    log: Option<String>,

    /// Config file to use instead of searching for conduit.toml
    #[arg(long, global = true, env = "CONDUIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a request against an engine
    ///
    /// The request is a JSON object whose "$type" field names the operation.
    /// The response is printed as JSON; failures exit non-zero with the
    /// engine's error detail.
    ///
    /// EXAMPLES:
    ///     conduit exec '{"$type":"ping"}' --builtin
    ///     conduit exec request.json --timeout-ms 2000
    ///     cat request.json | conduit exec - --compact
    #[command(visible_alias = "x")]
    Exec {
        /// Request JSON, a file containing it, or '-' for stdin
        request: String,
        #[command(flatten)]
        engine: EngineArgs,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print the response on one line
        #[arg(long)]
        compact: bool,
    },

    /// Encode a JSON document into the engine's binary form
    ///
    /// EXAMPLES:
    ///     conduit encode -t ScheduleInfo info.json -o info.bin
    ///     echo '{"num":3}' | conduit encode -t AccountId - > account.bin
    Encode {
        /// Type tag of the domain object
        #[arg(long = "type", short = 't')]
        type_tag: String,
        /// JSON input, a file containing it, or '-' for stdin
        input: String,
        /// Write bytes here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Decode the engine's binary form back to JSON
    ///
    /// EXAMPLES:
    ///     conduit decode -t ScheduleInfo info.bin
    ///     conduit decode -t AccountId account.bin --compact
    Decode {
        /// Type tag of the domain object
        #[arg(long = "type", short = 't')]
        type_tag: String,
        /// File holding encoded bytes
        file: PathBuf,
        /// Print the object on one line
        #[arg(long)]
        compact: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Show the resolved configuration and engine library
    Info,

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     conduit completions bash > ~/.bash_completions/conduit.bash
    ///     conduit completions zsh > ~/.zfunc/_conduit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_tracing(cli.log.as_deref().unwrap_or(config.log_filter()))?;

    match cli.command {
        Commands::Exec {
            request,
            engine,
            timeout_ms,
            compact,
        } => {
            let args = commands::exec::ExecArgs {
                request,
                engine,
                timeout_ms,
                compact,
            };
            commands::exec::run(args, &config)?;
        }
        Commands::Encode {
            type_tag,
            input,
            output,
            engine,
        } => {
            let args = commands::codec::EncodeArgs {
                type_tag,
                input,
                output,
                engine,
            };
            commands::codec::encode(args, &config)?;
        }
        Commands::Decode {
            type_tag,
            file,
            compact,
            engine,
        } => {
            let args = commands::codec::DecodeArgs {
                type_tag,
                file,
                compact,
                engine,
            };
            commands::codec::decode(args, &config)?;
        }
        Commands::Info => {
            print!("{}", commands::info::render(&config));
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    let config = match explicit {
        Some(path) => loader.load_from_file(path)?,
        None => loader.load_from_directory(&std::env::current_dir()?)?,
    };
    Ok(config)
}

fn init_tracing(filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("Invalid log filter: {filter}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
    Ok(())
}
