//! Info command - show what the other commands would use

use super::library_loader;
use conduit_config::Config;
use std::fmt::Write;
use std::path::Path;

/// Render resolved configuration as aligned `key: value` lines
pub fn render(config: &Config) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        let _ = writeln!(out, "{key:<16} {value}");
    };

    line(
        "version:",
        format!(
            "conduit {} (runtime {})",
            env!("CARGO_PKG_VERSION"),
            conduit_runtime::VERSION
        ),
    );
    line("project config:", display_path(config.project_file.as_deref()));
    line("global config:", display_path(config.global_file.as_deref()));

    match config.library_target() {
        Some(target) => {
            let resolved = library_loader(config)
                .resolve_library_path(&target)
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "(not found)".to_string());
            line("library:", target);
            line("resolved:", resolved);
        }
        None => line("library:", "(not configured; --builtin available)".to_string()),
    }

    let search_paths = config.search_paths();
    if !search_paths.is_empty() {
        let joined: Vec<String> = search_paths
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        line("search paths:", joined.join(", "));
    }

    line(
        "timeout:",
        config
            .execute_timeout()
            .map(|timeout| format!("{}ms", timeout.as_millis()))
            .unwrap_or_else(|| "none".to_string()),
    );
    line(
        "worker threads:",
        config
            .worker_threads()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "engine default".to_string()),
    );
    line("log filter:", config.log_filter().to_string());

    out
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_config::{ConduitConfig, EngineSection, LibrarySection};
    use std::path::PathBuf;

    #[test]
    fn test_render_defaults() {
        let text = render(&Config::default());
        let lines: Vec<&str> = text.lines().skip(1).collect();
        insta::assert_snapshot!(lines.join("\n"), @r###"
        project config:  (none)
        global config:   (none)
        library:         (not configured; --builtin available)
        timeout:         none
        worker threads:  engine default
        log filter:      warn
        "###);
    }

    #[test]
    fn test_render_unresolvable_library() {
        let config = Config {
            settings: ConduitConfig {
                library: Some(LibrarySection {
                    name: Some("definitely_missing_engine".to_string()),
                    search_paths: vec![PathBuf::from("/nonexistent/engines")],
                    ..Default::default()
                }),
                engine: Some(EngineSection {
                    worker_threads: Some(2),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let text = render(&config);
        assert!(text.contains("definitely_missing_engine"));
        assert!(text.contains("(not found)"));
        assert!(text.contains("/nonexistent/engines"));
        assert!(text.contains("worker threads:  2"));
    }
}
