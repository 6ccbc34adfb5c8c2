//! CLI integration tests
//!
//! Every command runs in a scratch directory with its own HOME so user
//! configuration never leaks in.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn conduit_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("conduit").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("CONDUIT_LIBRARY")
        .env_remove("CONDUIT_TIMEOUT_MS")
        .env_remove("CONDUIT_WORKERS")
        .env_remove("CONDUIT_LOG")
        .env_remove("CONDUIT_CONFIG");
    cmd
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP MESSAGE TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_shows_all_commands() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("exec"))
            .stdout(predicate::str::contains("encode"))
            .stdout(predicate::str::contains("decode"))
            .stdout(predicate::str::contains("info"))
            .stdout(predicate::str::contains("completions"));
    }

    #[test]
    fn test_main_help_shows_environment_variables() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ENVIRONMENT VARIABLES"))
            .stdout(predicate::str::contains("CONDUIT_LIBRARY"))
            .stdout(predicate::str::contains("CONDUIT_TIMEOUT_MS"));
    }

    #[test]
    fn test_exec_help_shows_examples() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["exec", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("EXAMPLES"))
            .stdout(predicate::str::contains("--builtin"))
            .stdout(predicate::str::contains("--timeout-ms"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// EXEC TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod exec {
    use super::*;

    #[test]
    fn test_exec_builtin_ping() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["exec", r#"{"$type":"ping"}"#, "--builtin", "--compact"])
            .assert()
            .success()
            .stdout(predicate::str::diff("{\"pong\":true}\n"));
    }

    #[test]
    fn test_exec_alias_and_stdin() {
        let dir = TempDir::new().unwrap();
        assert_cmd::Command::from_std(conduit_cmd(&dir))
            .args(["x", "-", "--builtin", "--compact"])
            .write_stdin(r#"{"$type":"echo","memo":"hi"}"#)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""memo":"hi""#));
    }

    #[test]
    fn test_exec_request_from_file_pretty() {
        let dir = TempDir::new().unwrap();
        let request = dir.path().join("request.json");
        fs::write(&request, r#"{"$type":"ping"}"#).unwrap();

        conduit_cmd(&dir)
            .args(["exec", "request.json", "--builtin"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"pong\": true"));
    }

    #[test]
    fn test_exec_unknown_operation_fails() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["exec", r#"{"$type":"missing"}"#, "--builtin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("UnknownOperation"));
    }

    #[test]
    fn test_exec_timeout() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args([
                "exec",
                r#"{"$type":"sleep","ms":2000}"#,
                "--builtin",
                "--timeout-ms",
                "50",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("did not complete within"));
    }

    #[test]
    fn test_exec_timeout_from_env() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .env("CONDUIT_TIMEOUT_MS", "50")
            .args(["exec", r#"{"$type":"sleep","ms":2000}"#, "--builtin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("did not complete within"));
    }

    #[test]
    fn test_exec_without_library_explains() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["exec", r#"{"$type":"ping"}"#])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No engine library configured"));
    }

    #[test]
    fn test_exec_missing_library() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["exec", r#"{"$type":"ping"}"#, "--library", "no_such_engine"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load engine library"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CODEC TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod codec {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args([
                "encode",
                "-t",
                "AccountId",
                r#"{ "shard": 0, "realm": 0, "num": 3 }"#,
                "-o",
                "account.bin",
                "--builtin",
            ])
            .assert()
            .success();

        let bytes = fs::read(dir.path().join("account.bin")).unwrap();
        assert!(bytes.starts_with(b"CDT\x01"));

        let output = conduit_cmd(&dir)
            .args(["decode", "-t", "AccountId", "account.bin", "--compact", "--builtin"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let decoded: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(
            decoded,
            serde_json::json!({ "shard": 0, "realm": 0, "num": 3 })
        );
    }

    #[test]
    fn test_decode_wrong_type() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["encode", "-t", "AccountId", "{}", "-o", "a.bin", "--builtin"])
            .assert()
            .success();

        conduit_cmd(&dir)
            .args(["decode", "-t", "ScheduleInfo", "a.bin", "--builtin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected ScheduleInfo"));
    }

    #[test]
    fn test_encode_rejects_non_json() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["encode", "-t", "AccountId", "not json", "--builtin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("InvalidArgument"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CONFIG AND INFO TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod config {
    use super::*;

    #[test]
    fn test_info_reads_project_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("conduit.toml"),
            "[library]\nname = \"project_engine\"\n\n[bridge]\nexecute_timeout_ms = 1234\n",
        )
        .unwrap();

        conduit_cmd(&dir)
            .arg("info")
            .assert()
            .success()
            .stdout(predicate::str::contains("project_engine"))
            .stdout(predicate::str::contains("1234ms"))
            .stdout(predicate::str::contains("conduit.toml"));
    }

    #[test]
    fn test_info_env_overrides_project() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("conduit.toml"), "[library]\nname = \"from_file\"\n").unwrap();

        conduit_cmd(&dir)
            .env("CONDUIT_LIBRARY", "/opt/engines/libfrom_env.so")
            .arg("info")
            .assert()
            .success()
            .stdout(predicate::str::contains("/opt/engines/libfrom_env.so"))
            .stdout(predicate::str::contains("from_file").not());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("conduit.toml"), "[engine]\nworker_threads = 0\n").unwrap();

        conduit_cmd(&dir)
            .arg("info")
            .assert()
            .failure()
            .stderr(predicate::str::contains("engine.worker_threads"));
    }

    #[test]
    fn test_explicit_config_flag() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("other.toml"), "[log]\nfilter = \"error\"\n").unwrap();

        conduit_cmd(&dir)
            .args(["--config", "other.toml", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("other.toml"))
            .stdout(predicate::str::contains("error"));
    }

    #[test]
    fn test_invalid_log_filter() {
        let dir = TempDir::new().unwrap();
        conduit_cmd(&dir)
            .args(["info", "--log", "conduit=notalevel"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid log filter"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// COMPLETIONS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    conduit_cmd(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conduit"));
}
