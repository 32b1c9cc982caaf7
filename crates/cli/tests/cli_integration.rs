//! CLI integration tests for `switchboard run` and `switchboard validate`.
//!
//! Fixtures are written into a temp dir per test; no network access is
//! needed since none of the flows call webhooks.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn switchboard() -> Command {
    cargo_bin_cmd!("switchboard")
}

fn write(dir: &TempDir, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn contact(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "contact.json",
        &serde_json::json!({
            "uuid": "c-1",
            "name": "Ryan Lewis",
            "created_on": "2018-06-20T11:40:30Z",
            "urns": ["tel:+12065551212"]
        }),
    )
}

fn favorites(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "assets.json",
        &serde_json::json!({
            "flows": [{
                "uuid": "f-1",
                "name": "Favorites",
                "nodes": [
                    {
                        "uuid": "n-1",
                        "actions": [{"type": "send_msg", "uuid": "a-1", "text": "Hi @contact.first_name, favorite color?"}],
                        "router": {
                            "type": "switch",
                            "wait": {"type": "msg"},
                            "result_name": "Color",
                            "categories": [
                                {"uuid": "c-red", "name": "Red", "exit_uuid": "e-red"},
                                {"uuid": "c-other", "name": "Other", "exit_uuid": "e-other"}
                            ],
                            "cases": [
                                {"uuid": "k-1", "type": "has_any_word", "arguments": ["red"], "category_uuid": "c-red"}
                            ],
                            "default_category_uuid": "c-other"
                        },
                        "exits": [
                            {"uuid": "e-red", "destination_uuid": "n-2"},
                            {"uuid": "e-other"}
                        ]
                    },
                    {
                        "uuid": "n-2",
                        "actions": [{"type": "send_msg", "uuid": "a-2", "text": "Red it is"}],
                        "exits": [{"uuid": "e-3"}]
                    }
                ]
            }]
        }),
    )
}

// ──────────────────────────────────────────────
// Help and version
// ──────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    switchboard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn version_exits_0() {
    switchboard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("switchboard"));
}

// ──────────────────────────────────────────────
// validate
// ──────────────────────────────────────────────

#[test]
fn validate_lists_flows() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    switchboard()
        .arg("validate")
        .arg(&assets)
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 flows)"))
        .stdout(predicate::str::contains("f-1 Favorites"));
}

#[test]
fn validate_json_output() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let out = switchboard()
        .args(["--output", "json", "validate"])
        .arg(&assets)
        .output()
        .unwrap();
    assert!(out.status.success());
    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["valid"], true);
    assert_eq!(result["flows"][0]["uuid"], "f-1");
}

#[test]
fn validate_rejects_unknown_action() {
    let dir = TempDir::new().unwrap();
    let assets = write(
        &dir,
        "bad.json",
        &serde_json::json!({
            "flows": [{
                "uuid": "f-1",
                "name": "Broken",
                "nodes": [{
                    "uuid": "n-1",
                    "actions": [{"type": "launch_rocket", "uuid": "a-1"}],
                    "exits": [{"uuid": "e-1"}]
                }]
            }]
        }),
    );
    switchboard()
        .arg("validate")
        .arg(&assets)
        .assert()
        .failure()
        .stderr(predicate::str::contains("launch_rocket"));
}

#[test]
fn validate_missing_file() {
    switchboard()
        .args(["validate", "/nonexistent/assets.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read assets file"));
}

#[test]
fn validate_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("assets.json");
    fs::write(&path, "{not json").unwrap();
    switchboard()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

// ──────────────────────────────────────────────
// run
// ──────────────────────────────────────────────

#[test]
fn run_stops_at_wait() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let contact = contact(&dir);
    switchboard()
        .arg("run")
        .arg(&assets)
        .arg("--contact")
        .arg(&contact)
        .assert()
        .success()
        .stdout(predicate::str::contains("-- sprint 1 --"))
        .stdout(predicate::str::contains(
            "[msg_created] \"Hi Ryan, favorite color?\"",
        ))
        .stdout(predicate::str::contains("[msg_wait]"))
        .stdout(predicate::str::contains("status: waiting"));
}

#[test]
fn run_resumes_with_input() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let contact = contact(&dir);
    switchboard()
        .arg("run")
        .arg(&assets)
        .arg("--contact")
        .arg(&contact)
        .args(["--input", "red please"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-- sprint 2 --"))
        .stdout(predicate::str::contains("[msg_received] \"red please\""))
        .stdout(predicate::str::contains("Color = \"red\" [Red]"))
        .stdout(predicate::str::contains("[msg_created] \"Red it is\""))
        .stdout(predicate::str::contains("status: completed"));
}

#[test]
fn run_json_output() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let contact = contact(&dir);
    let out = switchboard()
        .args(["--output", "json", "run"])
        .arg(&assets)
        .arg("--contact")
        .arg(&contact)
        .args(["--flow", "f-1", "--input", "blue"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let sprints = result["sprints"].as_array().unwrap();
    assert_eq!(sprints.len(), 2);
    assert_eq!(sprints[0]["events"][1]["type"], "msg_wait");
    assert_eq!(result["session"]["status"], "completed");
    assert_eq!(result["session"]["runs"][0]["results"]["color"]["category"], "Other");
}

#[test]
fn run_unknown_flow() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let contact = contact(&dir);
    switchboard()
        .arg("run")
        .arg(&assets)
        .arg("--contact")
        .arg(&contact)
        .args(["--flow", "f-9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no flow with UUID 'f-9'"));
}

#[test]
fn run_reads_config() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let contact = contact(&dir);
    let config = dir.path().join("switchboard.toml");
    fs::write(&config, "[engine]\nmax_steps_per_sprint = 50\n").unwrap();
    switchboard()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&assets)
        .arg("--contact")
        .arg(&contact)
        .assert()
        .success()
        .stdout(predicate::str::contains("status: waiting"));
}

#[test]
fn run_rejects_unknown_config_key() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    let contact = contact(&dir);
    let config = dir.path().join("switchboard.toml");
    fs::write(&config, "colour = true\n").unwrap();
    switchboard()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&assets)
        .arg("--contact")
        .arg(&contact)
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"));
}

#[test]
fn quiet_suppresses_output() {
    let dir = TempDir::new().unwrap();
    let assets = favorites(&dir);
    switchboard()
        .args(["--quiet", "validate"])
        .arg(&assets)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
