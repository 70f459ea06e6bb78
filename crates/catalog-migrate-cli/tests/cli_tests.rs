//! CLI integration tests for catalog-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes for various error conditions, and a full run against a
//! stand-in provider CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the catalog-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("catalog-migrate").unwrap()
}

/// Write a config pointing at export files inside `dir`.
fn write_config(dir: &Path, target: &str) -> std::path::PathBuf {
    let config = format!(
        "source:\n  items_file: {items}\n  prices_file: {prices}\ntarget:\n{target}migration:\n  mapping_file: {mapping}\n",
        items = dir.join("products.json").display(),
        prices = dir.join("prices.json").display(),
        mapping = dir.join("product_id_mapping.json").display(),
        target = target,
    );
    let path = dir.join("config.yaml");
    std::fs::write(&path, config).unwrap();
    path
}

fn write_exports(dir: &Path) {
    std::fs::write(
        dir.join("products.json"),
        r#"{"data": [
            {"id": "prod_A", "name": "Widget", "type": "service"},
            {"id": "prod_B", "name": "Gadget", "type": "good", "active": false}
        ]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("prices.json"),
        r#"{"data": [
            {"id": "price_1", "product": "prod_A", "currency": "usd", "unit_amount": 500, "type": "one_time"},
            {"id": "price_2", "product": "prod_B", "currency": "usd", "unit_amount": 900, "type": "one_time"}
        ]}"#,
    )
    .unwrap();
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--items"))
        .stdout(predicate::str::contains("--prices"))
        .stdout(predicate::str::contains("--mapping-file"));
}

#[test]
fn test_resume_subcommand_help() {
    cmd()
        .args(["resume", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--items"))
        .stdout(predicate::str::contains("--prices"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--progress"))
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--state-file"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "validate"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_backend_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "target:").unwrap();
    writeln!(file, "  backend: fax").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_undecodable_export_exits_with_code_2() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "  backend: cli\n");
    std::fs::write(dir.path().join("products.json"), "definitely not json").unwrap();
    std::fs::write(dir.path().join("prices.json"), r#"{"data": []}"#).unwrap();

    cmd()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no encoding succeeded"));
}

#[test]
fn test_resume_requires_state_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "  backend: cli\n");

    cmd()
        .args(["--config", config.to_str().unwrap(), "resume"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--state-file is required"));
}

// =============================================================================
// Command Behavior Tests
// =============================================================================

#[test]
fn test_validate_reports_referential_gap() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "  backend: cli\n");
    write_exports(dir.path());

    cmd()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Items: 2 found, 1 would be created"))
        .stdout(predicate::str::contains("no mapping for item prod_B (item is inactive)"));

    assert!(!dir.path().join("product_id_mapping.json").exists());
}

#[test]
fn test_dry_run_json_output() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "  backend: cli\n");
    write_exports(dir.path());

    let output = cmd()
        .args(["--config", config.to_str().unwrap(), "--output-json", "run", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["items"]["created"], 1);
    assert_eq!(report["prices"]["created"], 1);
}

#[test]
fn test_health_check_failure_exits_with_code_3() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "  backend: cli\n  cli_path: no-such-provider-cli-binary\n",
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "health-check"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("FAILED"));
}

#[cfg(unix)]
#[test]
fn test_run_against_stand_in_provider_cli() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let fake_cli = dir.path().join("fake-provider");
    std::fs::write(
        &fake_cli,
        "#!/bin/sh\nprintf '{\"id\": \"%s_%s\", \"object\": \"%s\"}\\n' \"$1\" \"$$\" \"$1\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&fake_cli, std::fs::Permissions::from_mode(0o755)).unwrap();

    let target = format!("  backend: cli\n  cli_path: {}\n", fake_cli.display());
    let config = write_config(dir.path(), &target);
    write_exports(dir.path());
    let state_file = dir.path().join("state.json");

    cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "--state-file",
            state_file.to_str().unwrap(),
            "run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration completed!"))
        .stdout(predicate::str::contains("Items: 2 found, 1 created, 1 skipped, 0 failed"));

    let mapping: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("product_id_mapping.json")).unwrap(),
    )
    .unwrap();
    let mapping = mapping.as_object().unwrap();
    assert_eq!(mapping.len(), 1);
    assert!(mapping["prod_A"].as_str().unwrap().starts_with("products_"));

    // A resumed run finds everything already migrated and creates nothing new.
    cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "--state-file",
            state_file.to_str().unwrap(),
            "resume",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Items: 2 found, 0 created, 2 skipped, 0 failed"))
        .stdout(predicate::str::contains("Prices: 2 found, 0 created, 2 skipped, 0 failed"));
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
