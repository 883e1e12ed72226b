use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::io::Write;

fn stblock() -> Command {
    Command::cargo_bin("stblock").unwrap()
}

fn output_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

const FIFO_SCRIPT: &str = r#"
{"op": "send", "route": "rule", "msg": {"Path": "value", "NumSamples": 3}}
{"op": "send", "route": "in", "msg": {"value": 1}}
{"op": "send", "route": "in", "msg": {"value": 2}}
{"op": "send", "route": "in", "msg": {"value": 3}}
{"op": "send", "route": "in", "msg": {"value": 4}}
{"op": "query", "route": "state"}
{"op": "quit"}
"#;

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    stblock()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    stblock()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stblock"));
}

#[test]
fn test_help_flag() {
    stblock()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeseries"));
}

// =============================================================================
// ROUTES SUBCOMMAND
// =============================================================================

#[test]
fn test_routes_table() {
    stblock()
        .arg("routes")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeseries"))
        .stdout(predicate::str::contains("ticker"))
        .stdout(predicate::str::contains("in,rule,poll"));
}

#[test]
fn test_routes_json() {
    let output = stblock().args(["routes", "--json"]).output().unwrap();
    assert!(output.status.success());

    let blocks: Value = serde_json::from_slice(&output.stdout).unwrap();
    let blocks = blocks.as_array().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["kind"], "timeseries");
    assert_eq!(
        blocks[0]["query_routes"],
        serde_json::json!(["rule", "state", "timeseries", "spectrum", "fft"])
    );
    assert_eq!(blocks[1]["kind"], "ticker");
    assert_eq!(blocks[1]["ticks"], true);
}

// =============================================================================
// RUN SUBCOMMAND
// =============================================================================

#[test]
fn test_run_script_from_stdin() {
    let output = stblock().arg("run").write_stdin(FIFO_SCRIPT).output().unwrap();
    assert!(output.status.success());

    let lines = output_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["query"], "state");

    let values: Vec<f64> = lines[0]["response"]["timeseries"]["Values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["Value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_run_script_file_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("script.ndjson");
    let out_path = dir.path().join("out.ndjson");
    std::fs::write(&script_path, FIFO_SCRIPT).unwrap();

    stblock()
        .arg("run")
        .arg("--script")
        .arg(&script_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success();

    let written = std::fs::read(&out_path).unwrap();
    let lines = output_lines(&written);
    assert_eq!(lines[0]["query"], "state");
}

#[test]
fn test_run_reports_faults_and_continues() {
    let script = r#"
{"op": "send", "route": "rule", "msg": {"Path": "x", "NumSamples": 2}}
{"op": "send", "route": "in", "msg": {"x": "not a number"}}
{"op": "send", "route": "in", "msg": {"x": 5}}
{"op": "query", "route": "fft"}
"#;
    let output = stblock().arg("run").write_stdin(script).output().unwrap();
    assert!(output.status.success());

    let lines = output_lines(&output.stdout);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["fault"]["route"], "in");
    assert_eq!(lines[0]["fault"]["kind"], "timeseries");
    assert_eq!(lines[1]["query"], "fft");
    // [0, 5] -> X[0] = 5, X[1] = -5
    assert_eq!(lines[1]["response"]["fft"][0][0], 5.0);
    assert_eq!(lines[1]["response"]["fft"][1][0], -5.0);
}

#[test]
fn test_run_poll_emits_outbound() {
    let script = r#"
{"op": "send", "route": "rule", "msg": {"Path": "x", "NumSamples": 1}}
{"op": "send", "route": "poll"}
"#;
    let output = stblock().arg("run").write_stdin(script).output().unwrap();
    assert!(output.status.success());

    let lines = output_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0]["outbound"]["timeseries"],
        serde_json::json!([{"timestamp": 0.0, "value": 0.0}])
    );
}

#[test]
fn test_run_log_filter_from_env() {
    let output = stblock()
        .arg("run")
        .env("STBLOCK_LOG", "info")
        .write_stdin(FIFO_SCRIPT)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Starting timeseries block"), "{}", stderr);
    // Logging stays off stdout
    assert_eq!(output_lines(&output.stdout).len(), 1);
}

#[test]
fn test_run_unknown_route_is_input_error() {
    stblock()
        .arg("run")
        .write_stdin(r#"{"op": "send", "route": "bogus", "msg": {}}"#)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_run_malformed_script_is_input_error() {
    stblock()
        .arg("run")
        .write_stdin("{\"op\": \"query\", \"route\": \"rule\"}\nnot json\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Script line 2"));
}

#[test]
fn test_run_rejects_oversized_rule() {
    let output = stblock()
        .args(["run", "--max-window", "4"])
        .write_stdin(
            r#"{"op": "send", "route": "rule", "msg": {"Path": "x", "NumSamples": 8}}
{"op": "query", "route": "rule"}"#,
        )
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = output_lines(&output.stdout);
    assert!(lines[0].get("fault").is_some());
    assert_eq!(
        lines[1]["response"],
        serde_json::json!({"Path": "", "NumSamples": 0})
    );
}

#[test]
fn test_run_with_settings_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"max_window": 2}}"#).unwrap();

    let output = stblock()
        .arg("run")
        .arg("--settings")
        .arg(file.path())
        .write_stdin(r#"{"op": "send", "route": "rule", "msg": {"Path": "x", "NumSamples": 3}}"#)
        .output()
        .unwrap();
    assert!(output.status.success());
    let lines = output_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert!(lines[0]["fault"]["error"].as_str().is_some());
}

#[test]
fn test_run_missing_settings_file() {
    stblock()
        .args(["run", "--settings", "/nonexistent/settings.json"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Settings file not found"));
}

// =============================================================================
// TICKER SUBCOMMAND
// =============================================================================

#[test]
fn test_ticker_prints_ticks() {
    let output = stblock()
        .args(["ticker", "--interval-ms", "10", "--count", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = output_lines(&output.stdout);
    assert_eq!(lines.len(), 2);
    for line in lines {
        let t = line["t"].as_str().unwrap();
        assert!(t.contains('T'), "{}", t);
    }
}

#[test]
fn test_ticker_rejects_zero_interval() {
    stblock()
        .args(["ticker", "--interval-ms", "0"])
        .assert()
        .code(2);
}
