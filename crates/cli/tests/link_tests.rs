// Integration tests for `orglink run` / `orglink validate` against the
// linkage crate's fixtures.
// Run with: cargo test -p orglink-cli --test link_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::Command;

fn orglink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_orglink"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../linkage/tests/fixtures")
        .join(name)
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_json_to_stdout() {
    let output = orglink()
        .args(["-q", "run", fixture("two-pass.link.toml").to_str().unwrap(), "--json"])
        .output()
        .expect("orglink run --json");

    assert!(output.status.success(), "exit code was {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let result: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");

    assert_eq!(result["meta"]["config_name"], "Postings vs Registry");
    assert_eq!(result["passes"].as_array().unwrap().len(), 2);
    assert_eq!(result["matches"].as_array().unwrap().len(), 4);
    assert_eq!(result["accounting"]["matched_distinct"], 3);
    assert_eq!(result["unmatched_ids"], serde_json::json!(["JP4", "JP5"]));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("4 match(es) for 3 left record(s), 2 left record(s) unmatched"));
}

#[test]
fn run_writes_matches_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("matches.tsv");
    let output = orglink()
        .args([
            "-q",
            "run",
            fixture("two-pass.link.toml").to_str().unwrap(),
            "--matches",
            table.to_str().unwrap(),
        ])
        .output()
        .expect("orglink run --matches");

    assert!(output.status.success());
    let text = std::fs::read_to_string(&table).unwrap();
    let rows: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[3].starts_with("JP2\tOR2\tjob_address\t5\t"));
}

#[test]
fn info_logging_on_stderr() {
    let output = orglink()
        .env_remove("RUST_LOG")
        .args(["run", fixture("two-pass.link.toml").to_str().unwrap()])
        .output()
        .expect("orglink run");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Num. of candidates: 4"));
    assert!(stderr.contains("Num. of potential matches by name: 3"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_fixture() {
    let output = orglink()
        .args(["validate", fixture("two-pass.link.toml").to_str().unwrap()])
        .output()
        .expect("orglink validate");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("valid: link config 'Postings vs Registry' with 2 pass(es), 12 rule(s)"));
}

#[test]
fn validate_unknown_algorithm_exit_60() {
    let dir = tempfile::tempdir().unwrap();
    let config = std::fs::read_to_string(fixture("two-pass.link.toml"))
        .unwrap()
        .replacen(r#"method = "jarowinkler""#, r#"method = "soundex""#, 1);
    let path = dir.path().join("bad.link.toml");
    std::fs::write(&path, config).unwrap();

    let output = orglink()
        .args(["validate", path.to_str().unwrap()])
        .output()
        .expect("orglink validate");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown comparison algorithm: 'soundex'"));
}

#[test]
fn bad_arguments_exit_2() {
    let output = orglink().args(["run"]).output().expect("orglink run");
    assert_eq!(output.status.code(), Some(2));
}
