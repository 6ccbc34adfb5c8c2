//! Exec command - send one request to an engine

use super::{format_json, open_bridge, read_text_input, EngineArgs};
use anyhow::{Context, Result};
use conduit_config::Config;
use std::time::Duration;

/// Exec command arguments
#[derive(Debug, Clone)]
pub struct ExecArgs {
    pub request: String,
    pub engine: EngineArgs,
    pub timeout_ms: Option<u64>,
    pub compact: bool,
}

impl ExecArgs {
    /// Deadline: flag > configuration > none
    fn timeout(&self, config: &Config) -> Option<Duration> {
        self.timeout_ms
            .map(Duration::from_millis)
            .or_else(|| config.execute_timeout())
    }
}

/// Execute the request and print the engine's response
pub fn run(args: ExecArgs, config: &Config) -> Result<()> {
    let request = read_text_input(&args.request)?;
    let bridge = open_bridge(&args.engine, config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")?;

    let outcome = runtime.block_on(async {
        match args.timeout(config) {
            Some(timeout) => bridge.execute_raw_with_timeout(request.trim(), timeout).await,
            None => bridge.execute_raw(request.trim()).await,
        }
    });

    let response = outcome.context("Request failed")?;
    println!("{}", format_json(&response, args.compact)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_config::{BridgeSection, ConduitConfig};

    fn args(timeout_ms: Option<u64>) -> ExecArgs {
        ExecArgs {
            request: r#"{"$type":"ping"}"#.to_string(),
            engine: EngineArgs {
                library: None,
                builtin: true,
            },
            timeout_ms,
            compact: true,
        }
    }

    fn config_with_timeout(ms: u64) -> Config {
        Config {
            settings: ConduitConfig {
                bridge: Some(BridgeSection {
                    execute_timeout_ms: Some(ms),
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_flag_timeout_wins() {
        let config = config_with_timeout(9000);
        assert_eq!(
            args(Some(10)).timeout(&config),
            Some(Duration::from_millis(10))
        );
        assert_eq!(
            args(None).timeout(&config),
            Some(Duration::from_millis(9000))
        );
        assert_eq!(args(None).timeout(&Config::default()), None);
    }

    #[test]
    fn test_run_builtin_ping() {
        assert!(run(args(None), &Config::default()).is_ok());
    }

    #[test]
    fn test_run_reports_engine_failure() {
        let mut failing = args(None);
        failing.request = r#"{"$type":"no_such_operation"}"#.to_string();
        let err = run(failing, &Config::default()).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("Request failed"), "{chain}");
        assert!(chain.contains("UnknownOperation"), "{chain}");
    }
}
