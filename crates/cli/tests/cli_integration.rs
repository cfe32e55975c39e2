//! CLI integration tests for the offline subcommands.
//!
//! Uses `assert_cmd` to spawn the `formwork` binary and verify
//! exit codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to this crate's `tests/fixtures` directory
//! so fixture paths stay short.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Helper: create a Command for the `formwork` binary, rooted at the fixtures.
fn formwork() -> Command {
    let mut cmd = cargo_bin_cmd!("formwork");
    cmd.current_dir(fixtures());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run formwork");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    formwork()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Form engine toolbox"));
}

#[test]
fn version_exits_0() {
    formwork()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("formwork"));
}

#[test]
fn sip_help_lists_subcommands() {
    formwork()
        .args(["sip", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("save"))
        .stdout(predicate::str::contains("load"))
        .stdout(predicate::str::contains("remove"));
}

// ──────────────────────────────────────────────
// 2. pages
// ──────────────────────────────────────────────

#[test]
fn pages_with_initial_data_skips_dependent_page() {
    formwork()
        .args(["pages", "caregivers.json"])
        .assert()
        .success()
        .stdout("/caregivers/veteran/information\tvetInfo\n/caregivers/veteran/contact\tvetContact\n")
        .stderr(predicate::str::contains("2 of 3 pages active"));
}

#[test]
fn pages_include_dependent_page_when_depends_holds() {
    formwork()
        .args(["pages", "caregivers.json", "--data", "with_caregiver.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "/caregivers/primary/information\tprimaryInfo",
        ));
}

#[test]
fn pages_json_output() {
    let pages = stdout_json(formwork().args([
        "--output",
        "json",
        "pages",
        "caregivers.json",
        "--data",
        "with_caregiver.json",
    ]));
    let keys: Vec<&str> = pages
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["page_key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["vetInfo", "vetContact", "primaryInfo"]);
    assert_eq!(pages[2]["chapter_key"], "primary");
}

#[test]
fn pages_rejects_non_object_data() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data.json");
    fs::write(&data, "[1, 2]").unwrap();
    formwork()
        .args(["pages", "caregivers.json", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[test]
fn missing_config_file_reports_error() {
    formwork()
        .args(["pages", "nonexistent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn duplicate_page_path_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("dup.json");
    fs::write(
        &config,
        json!({
            "formId": "dup",
            "version": 0,
            "chapters": { "c": { "pages": {
                "a": { "path": "same" },
                "b": { "path": "same" }
            }}}
        })
        .to_string(),
    )
    .unwrap();
    formwork()
        .arg("pages")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate page path"));
}

// ──────────────────────────────────────────────
// 3. resolve
// ──────────────────────────────────────────────

#[test]
fn resolve_active_page() {
    formwork()
        .args(["resolve", "caregivers.json", "/caregivers/veteran/contact"])
        .assert()
        .success()
        .stdout("active /caregivers/veteran/contact (vetContact)\n");
}

#[test]
fn resolve_excluded_page_redirects_to_previous_active() {
    formwork()
        .args(["resolve", "caregivers.json", "/caregivers/primary/information"])
        .assert()
        .success()
        .stdout("redirect /caregivers/veteran/contact\n");
}

#[test]
fn resolve_introduction_is_terminal() {
    formwork()
        .args(["resolve", "caregivers.json", "introduction"])
        .assert()
        .success()
        .stdout("terminal /caregivers/introduction\n");
}

#[test]
fn resolve_unknown_route_fails() {
    formwork()
        .args(["resolve", "caregivers.json", "/caregivers/nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no page at route"));
}

#[test]
fn resolve_json_output_is_tagged() {
    let resolution = stdout_json(formwork().args([
        "--output",
        "json",
        "resolve",
        "caregivers.json",
        "primary/information",
        "--data",
        "with_caregiver.json",
    ]));
    assert_eq!(resolution["kind"], "active");
    assert_eq!(resolution["page"]["page_key"], "primaryInfo");
}

// ──────────────────────────────────────────────
// 4. migrate
// ──────────────────────────────────────────────

#[test]
fn migrate_upgrades_saved_form() {
    let mut cmd = formwork();
    cmd.args(["migrate", "caregivers.json", "saved_v0.json"]);
    let migrated = stdout_json(&mut cmd);
    assert_eq!(
        migrated["formData"],
        json!({ "veteranFullName": "Pat Doe", "hasPrimaryCaregiver": false })
    );
    assert_eq!(migrated["metadata"]["version"], 1);
    assert_eq!(migrated["metadata"]["returnUrl"], "/veteran/contact");

    formwork()
        .args(["migrate", "caregivers.json", "saved_v0.json"])
        .assert()
        .stderr(predicate::str::contains("migrated from version 0 to 1"));
}

#[test]
fn migrate_is_a_noop_on_current_data() {
    let tmp = TempDir::new().unwrap();
    let saved = tmp.path().join("current.json");
    fs::write(
        &saved,
        json!({
            "formData": { "veteranFullName": "Pat Doe", "fullName": "kept" },
            "metadata": { "version": 1 }
        })
        .to_string(),
    )
    .unwrap();
    let mut cmd = formwork();
    cmd.args(["migrate", "caregivers.json"]).arg(&saved);
    let migrated = stdout_json(&mut cmd);
    assert_eq!(
        migrated["formData"],
        json!({ "veteranFullName": "Pat Doe", "fullName": "kept" })
    );
}

#[test]
fn migrate_rejects_future_version() {
    formwork()
        .args(["migrate", "caregivers.json", "saved_future.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("migration failed"))
        .stderr(predicate::str::contains("version 4"));
}

#[test]
fn migrate_error_json_format() {
    let output = formwork()
        .args(["--output", "json", "migrate", "caregivers.json", "saved_future.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(err["error"].as_str().unwrap().contains("migration failed"));
}

// ──────────────────────────────────────────────
// 5. transform
// ──────────────────────────────────────────────

#[test]
fn transform_drops_inactive_page_data() {
    formwork()
        .args(["transform", "caregivers.json", "no_caregiver.json"])
        .assert()
        .success()
        .stdout(
            "{\"veteranFullName\":\"Pat Doe\",\"hasPrimaryCaregiver\":false,\"email\":\"pat@example.com\"}\n",
        );
}

#[test]
fn transform_flattens_view_fields() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data.json");
    fs::write(
        &data,
        json!({
            "veteranFullName": "Pat Doe",
            "view:contactHelp": { "phone": "555-0100" },
            "empty": {}
        })
        .to_string(),
    )
    .unwrap();
    let mut cmd = formwork();
    cmd.args(["--output", "json", "transform", "caregivers.json"])
        .arg(&data);
    let payload = stdout_json(&mut cmd);
    assert_eq!(
        payload,
        json!({ "veteranFullName": "Pat Doe", "phone": "555-0100" })
    );
}

// ──────────────────────────────────────────────
// 6. validate
// ──────────────────────────────────────────────

#[test]
fn validate_passes_when_inactive_page_is_incomplete() {
    formwork()
        .args(["validate", "caregivers.json", "no_caregiver.json"])
        .assert()
        .success()
        .stdout("valid\n");
}

#[test]
fn validate_reports_active_page_errors() {
    formwork()
        .args(["validate", "caregivers.json", "with_caregiver.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/caregivers/primary/information"))
        .stderr(predicate::str::contains("primaryFullName"));
}

#[test]
fn validate_json_report() {
    let output = formwork()
        .args([
            "--output",
            "json",
            "validate",
            "caregivers.json",
            "with_caregiver.json",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["errors"][0]["page_key"], "primaryInfo");
}

#[test]
fn quiet_suppresses_errors() {
    formwork()
        .args(["--quiet", "validate", "caregivers.json", "with_caregiver.json"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}
