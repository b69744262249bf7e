//! Integration tests for the command-line interface

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const VALUES: &str = "# web\nimage:\n  repository: nginx\n  tag: v1.0.0 # pinned\n";

/// Helper to create a workspace holding a single values file
fn setup_test_workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("values.yaml");
    fs::write(&path, VALUES).unwrap();
    (dir, path)
}

fn run(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn backups_in(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".backup")
        })
        .count()
}

#[test]
fn test_update_help() {
    let output = run(&["update", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Set a tag value and write the file back"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_update_basic() {
    let (dir, path) = setup_test_workspace();

    let output = run(&["update", arg(&path), "v2.0.0"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("image.tag = v2.0.0"));
    assert!(stdout.contains("Backup:"));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# web\nimage:\n  repository: nginx\n  tag: v2.0.0 # pinned\n"
    );
    assert_eq!(backups_in(dir.path()), 1);
}

#[test]
fn test_update_idempotent() {
    let (_dir, path) = setup_test_workspace();

    run(&["update", arg(&path), "v2.0.0", "--no-backup"]);
    let output = run(&["update", arg(&path), "v2.0.0", "--no-backup"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("already v2.0.0"));
}

#[test]
fn test_update_dry_run_with_diff() {
    let (dir, path) = setup_test_workspace();

    let output = run(&["update", arg(&path), "v2.0.0", "--dry-run", "--diff"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("-  tag: v1.0.0 # pinned"));
    assert!(stdout.contains("+  tag: v2.0.0 # pinned"));
    assert_eq!(fs::read_to_string(&path).unwrap(), VALUES);
    assert_eq!(backups_in(dir.path()), 0);
}

#[test]
fn test_update_explicit_path() {
    let (_dir, path) = setup_test_workspace();

    let output = run(&[
        "update",
        arg(&path),
        "nginx-unprivileged",
        "--path",
        "image.repository",
        "--no-backup",
    ]);

    // Only tag-like fields can be addressed
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tag not found at path: image.repository"));
    assert_eq!(fs::read_to_string(&path).unwrap(), VALUES);
}

#[test]
fn test_list_json() {
    let (_dir, path) = setup_test_workspace();

    let output = run(&["list", arg(&path), "--json"]);

    assert!(output.status.success());
    let locations: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        locations,
        serde_json::json!([{ "path": "image.tag", "line": 4, "column": 8, "value": "v1.0.0" }])
    );
}

#[test]
fn test_get_command() {
    let (_dir, path) = setup_test_workspace();

    let output = run(&["get", arg(&path), "image.tag"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "v1.0.0\n");
}

#[test]
fn test_validate_command() {
    let (dir, path) = setup_test_workspace();
    let output = run(&["validate", arg(&path)]);
    assert!(output.status.success());

    let broken = dir.path().join("broken.yaml");
    fs::write(&broken, "image:\n  tag: [v1\n").unwrap();
    let output = run(&["validate", arg(&broken)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid"));
}

#[test]
fn test_format_command() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("values.yaml");
    fs::write(&path, "image:\n      tag: v1\n").unwrap();

    let output = run(&["format", arg(&path)]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "image:\n  tag: v1\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "image:\n      tag: v1\n");

    let output = run(&["format", arg(&path), "--write"]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), "image:\n  tag: v1\n");
}

#[test]
fn test_rollback_and_cleanup_commands() {
    let (dir, path) = setup_test_workspace();
    let backup = dir.path().join("values.yaml.20240101_000000.backup");
    fs::write(&backup, VALUES).unwrap();
    fs::write(&path, "image:\n  tag: v9\n").unwrap();

    let output = run(&["rollback", arg(&path), arg(&backup)]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), VALUES);

    let output = run(&["cleanup", arg(&path)]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("nothing to remove"));
}

#[test]
fn test_config_flag() {
    let (dir, path) = setup_test_workspace();
    let config = dir.path().join("updater.toml");
    fs::write(&config, "keep_backups = false\n[parser]\nindent = 4\n").unwrap();

    let output = run(&["--config", arg(&config), "update", arg(&path), "v2.0.0"]);

    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# web\nimage:\n    repository: nginx\n    tag: v2.0.0 # pinned\n"
    );
    assert_eq!(backups_in(dir.path()), 0);
}

#[test]
fn test_rejects_system_paths() {
    let output = run(&["update", "/etc/hosts", "v2"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("outside safe directories"));
}
