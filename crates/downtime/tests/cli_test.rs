//! Integration tests for the `downtime` CLI binary.
//!
//! Argument parsing, help output, completions, device and window editing,
//! share URLs and error exit codes run without any logger. The query tests
//! use a one-connection WebSocket logger on a background thread.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use futures_util::{SinkExt, StreamExt};
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message;

// ── Helpers ─────────────────────────────────────────────────────────

/// A private HOME, config dir and state file per test.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn state_file(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    /// Build a [`Command`] for the `downtime` binary with env isolation.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("downtime");
        cmd.env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("XDG_DATA_HOME", self.dir.path().join("data"))
            .env("DOWNTIME_STATE_FILE", self.state_file())
            .env_remove("DOWNTIME_PROFILE")
            .env_remove("DOWNTIME_LOGGER")
            .env_remove("DOWNTIME_SHARE_BASE")
            .env_remove("DOWNTIME_OUTPUT")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.cmd().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "`downtime {}` failed:\n{}",
            args.join(" "),
            combined_output(&output)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Start a logger that, after `start`, plays `script(drf)` for every
/// request (with `ref_id` filled in) and then waits for the client to close.
fn spawn_logger(script: impl Fn(&str) -> Vec<Value> + Send + 'static) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let mut requests = Vec::new();
            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(text) = msg else { continue };
                let frame: Value = serde_json::from_str(&text).unwrap();
                match frame["type"].as_str() {
                    Some("add_request") => requests.push((
                        frame["ref_id"].as_u64().unwrap(),
                        frame["drf"].as_str().unwrap().to_owned(),
                    )),
                    Some("start") => break,
                    _ => {}
                }
            }

            for (ref_id, drf) in &requests {
                for mut frame in script(drf) {
                    frame["ref_id"] = json!(ref_id);
                    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
                }
            }

            while let Some(Ok(msg)) = ws.next().await {
                if matches!(msg, Message::Close(_)) {
                    break;
                }
            }
        });
    });

    format!("ws://{addr}/stream")
}

fn outtmp_script(drf: &str) -> Vec<Value> {
    match drf {
        "M:OUTTMP" => vec![
            json!({ "type": "data", "data": [5.0, 10.0], "micros": [0, 1_000_000] }),
            json!({ "type": "data", "data": [2.0, 10.0], "micros": [2_000_000, 3_000_000] }),
            json!({ "type": "data", "data": [], "micros": [] }),
        ],
        "Z:BROKEN" => vec![json!({ "type": "status", "status": -42, "message": "no such device" })],
        _ => vec![json!({ "type": "data", "data": [], "micros": [] })],
    }
}

const T1: &str = "2024-03-01T00:00:00Z";
const T2: &str = "2024-03-01T00:00:10Z";

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = Sandbox::new().cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    Sandbox::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("downtime")
            .and(predicate::str::contains("query"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("window"))
            .and(predicate::str::contains("share")),
    );
}

#[test]
fn test_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("downtime"));
}

#[test]
fn test_invalid_subcommand() {
    let output = Sandbox::new().cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error mentioning foobar:\n{text}");
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    Sandbox::new()
        .cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    Sandbox::new()
        .cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Device rows ─────────────────────────────────────────────────────

#[test]
fn test_devices_add_list_remove() {
    let sb = Sandbox::new();
    sb.run_ok(&["devices", "add", "M:OUTTMP@p,1000@5"]);
    sb.run_ok(&["devices", "add", "G:AMANDA"]);

    let listed = sb.run_ok(&["devices", "list", "-o", "plain"]);
    assert_eq!(listed.trim(), "M:OUTTMP@p,1000@5\nG:AMANDA@0");

    sb.run_ok(&["devices", "remove", "0"]);
    let listed = sb.run_ok(&["devices", "list", "-o", "plain"]);
    assert_eq!(listed.trim(), "G:AMANDA@0");

    assert!(std::fs::read_to_string(sb.state_file()).unwrap().contains("G:AMANDA@0"));
}

#[test]
fn test_devices_add_without_drf_copies_last_row() {
    let sb = Sandbox::new();
    sb.run_ok(&["devices", "add", "A@p,15@3"]);
    sb.run_ok(&["devices", "add"]);

    let listed = sb.run_ok(&["devices", "list", "-o", "plain"]);
    assert_eq!(listed.trim(), "A@p,15@3\nA@p,15@3");
}

#[test]
fn test_devices_list_json() {
    let sb = Sandbox::new();
    sb.run_ok(&["devices", "add", "M:OUTTMP@p,1000,U,200@5"]);

    let listed: Value = serde_json::from_str(&sb.run_ok(&["devices", "list", "-o", "json"])).unwrap();
    assert_eq!(listed[0]["index"], 0);
    assert_eq!(listed[0]["device"], "M:OUTTMP");
    assert_eq!(listed[0]["clock_type"], "U");
    assert_eq!(listed[0]["threshold"], "5");
}

#[test]
fn test_devices_remove_out_of_range() {
    let output = Sandbox::new()
        .cmd()
        .args(["devices", "remove", "3"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("devices list"));
}

// ── Window ──────────────────────────────────────────────────────────

#[test]
fn test_window_set_and_show() {
    let sb = Sandbox::new();
    let shown: Value = serde_json::from_str(&sb.run_ok(&[
        "window",
        "--t1",
        "2024-03-01T00:00:00Z",
        "--t2",
        "2024-03-04T00:00:00Z",
        "-o",
        "json",
    ]))
    .unwrap();
    assert_eq!(shown["length"], "3 days");

    let plain = sb.run_ok(&["window", "-o", "plain"]);
    assert_eq!(plain.trim(), "2024-03-01T00:00:00Z\n2024-03-04T00:00:00Z");
}

#[test]
fn test_window_last_ends_at_t2() {
    let sb = Sandbox::new();
    let plain = sb.run_ok(&["window", "--last", "3d", "--t2", "2024-03-04T00:00:00Z", "-o", "plain"]);
    assert_eq!(plain.trim(), "2024-03-01T00:00:00Z\n2024-03-04T00:00:00Z");
}

#[test]
fn test_window_bad_last_is_usage_error() {
    let output = Sandbox::new()
        .cmd()
        .args(["window", "--last", "a while"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

// ── Share ───────────────────────────────────────────────────────────

#[test]
fn test_share_without_state_prints_base() {
    let sb = Sandbox::new();
    let url = sb.run_ok(&["share", "--share-base", "https://ops.example.org/downtime/"]);
    assert_eq!(url.trim(), "https://ops.example.org/downtime/");
}

#[test]
fn test_share_encodes_window_and_devices() {
    let sb = Sandbox::new();
    sb.run_ok(&["window", "--t1", T1, "--t2", T2]);
    sb.run_ok(&["devices", "add", "M:OUTTMP@p,1000@5"]);
    sb.run_ok(&["devices", "add", "G:AMANDA"]);

    let url = sb.run_ok(&["share", "--share-base", "https://ops.example.org/downtime/?old=1"]);
    assert_eq!(
        url.trim(),
        "https://ops.example.org/downtime/?t1=2024-03-01T00%3A00%3A00Z&t2=2024-03-01T00%3A00%3A10Z\
         &device=M%3AOUTTMP%40p%2C1000%405&device=G%3AAMANDA%400"
    );
}

// ── Query ───────────────────────────────────────────────────────────

#[test]
fn test_query_without_logger() {
    let output = Sandbox::new()
        .cmd()
        .args(["query", "--t1", T1, "--t2", T2, "--device", "A"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No data logger"));
}

#[test]
fn test_query_without_devices() {
    let output = Sandbox::new()
        .cmd()
        .args(["query", "--t1", T1, "--t2", T2, "--logger", "ws://127.0.0.1:1/"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("No devices"));
}

#[test]
fn test_query_unreachable_logger() {
    let output = Sandbox::new()
        .cmd()
        .args([
            "query",
            "--t1",
            T1,
            "--t2",
            T2,
            "--device",
            "A",
            "--logger",
            "ws://127.0.0.1:1/",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[test]
fn test_query_reports_downtime_table() {
    let sb = Sandbox::new();
    let logger = spawn_logger(outtmp_script);

    let out = sb.run_ok(&[
        "query",
        "--t1",
        T1,
        "--t2",
        T2,
        "--device",
        "M:OUTTMP@@4",
        "--device",
        "G:AMANDA",
        "--logger",
        &logger,
    ]);

    assert!(out.contains("% of window"), "{out}");
    assert!(out.contains("M:OUTTMP"), "{out}");
    assert!(out.contains("00:00:09"), "{out}");
    assert!(out.contains("90.00"), "{out}");
    assert!(out.contains("G:AMANDA"), "{out}");
    assert!(out.contains("100.0"), "{out}");
    assert!(out.contains("Total time considered is a few seconds"), "{out}");

    // The query persisted what it ran.
    let listed = sb.run_ok(&["devices", "list", "-o", "plain"]);
    assert_eq!(listed.trim(), "M:OUTTMP@4\nG:AMANDA@0");
}

#[test]
fn test_query_from_shared_url_json() {
    let sb = Sandbox::new();
    let logger = spawn_logger(outtmp_script);
    let shared = "https://ops.example.org/downtime/?t1=2024-03-01T00%3A00%3A00Z\
                  &t2=2024-03-01T00%3A00%3A10Z&device=Z%3ABROKEN&device=G%3AAMANDA";

    let output = sb
        .cmd()
        .args(["query", "--url", shared, "--logger", &logger, "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = report["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["device"], "G:AMANDA");
    assert_eq!(rows[0]["downtime_ms"], 10_000);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Z:BROKEN: failed"), "{stderr}");
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_show() {
    let sb = Sandbox::new();
    sb.run_ok(&["config", "init", "--logger", "wss://logger.example.org/stream"]);

    let shown: Value = serde_json::from_str(&sb.run_ok(&["config", "show", "-o", "json"])).unwrap();
    assert_eq!(shown["default_profile"], "default");
    assert_eq!(
        shown["profiles"]["default"]["logger"],
        "wss://logger.example.org/stream"
    );

    let output = sb.cmd().args(["config", "init"]).output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("already exists"));
}

/// Write `contents` to the config file the sandboxed binary reads.
fn write_config(sb: &Sandbox, contents: &str) {
    let path = PathBuf::from(sb.run_ok(&["config", "path"]).trim());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
}

#[test]
fn test_config_defaults_set_output_format() {
    let sb = Sandbox::new();
    write_config(&sb, "[defaults]\noutput = \"plain\"\n");

    let plain = sb.run_ok(&["window", "--t1", T1, "--t2", T2]);
    assert_eq!(plain.trim(), format!("{T1}\n{T2}"));

    // The flag still wins over the config default.
    let shown: Value = serde_json::from_str(&sb.run_ok(&["window", "-o", "json"])).unwrap();
    assert_eq!(shown["t1"], T1);
}

#[test]
fn test_config_defaults_reject_unknown_output_format() {
    let sb = Sandbox::new();
    write_config(&sb, "[defaults]\noutput = \"fancy\"\n");

    let output = sb.cmd().args(["window"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("defaults.output"));
}

#[test]
fn test_config_path() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_unknown_profile() {
    let output = Sandbox::new()
        .cmd()
        .args(["--profile", "nope", "devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("nope"));
}
