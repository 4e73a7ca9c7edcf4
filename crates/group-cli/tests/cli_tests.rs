//! Integration tests for the groupctl binary.
//!
//! These tests exercise the compiled binary using assert_cmd. None of them
//! need a reachable LDAP server.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

const UNREACHABLE_LDAP: &str = "ldap://127.0.0.1:1";
const BASE: &str = "ou=groups,dc=example,dc=org";

/// A temporary store directory plus an explicit config file, so the user's
/// own configuration is never read.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[directory]\nconnect_timeout_secs = 2\noperation_timeout_secs = 2\n",
        )
        .unwrap();
        Self { dir }
    }

    fn store_dir(&self) -> PathBuf {
        self.dir.path().join("groups")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("groupctl"));
        cmd.env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.dir.path().join("config.toml"))
            .arg("--store-dir")
            .arg(self.store_dir());
        cmd
    }

    fn cmd_with_directory(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["--ldap-url", UNREACHABLE_LDAP, "--group-search-base", BASE]);
        cmd
    }

    fn write_group(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{}.group.toml", name));
        fs::write(
            &path,
            format!(
                r#"apiVersion = "directory.group-operator.io/v1"
kind = "Group"

[metadata]
name = "{name}"

[spec]
comment = "Team {name}"
members = ["uid=alice,ou=people,dc=example,dc=org"]
"#
            ),
        )
        .unwrap();
        path
    }

    fn apply(&self, name: &str) {
        let file = self.write_group(name);
        self.cmd().arg("apply").arg(&file).assert().success();
    }

    fn status_json(&self) -> serde_json::Value {
        let output = self.cmd().args(["status", "--json"]).output().unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn document_exists(store_dir: &Path, name: &str) -> bool {
    store_dir.join(format!("{}.toml", name)).exists()
}

#[test]
fn test_help_output() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("groupctl"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("LDAP groups"))
        .stdout(predicate::str::contains("reconcile"));
}

#[test]
fn test_version_output() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("groupctl"));
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("groupctl"));
}

#[test]
fn apply_then_status_lists_group() {
    let ws = Workspace::new();
    let file = ws.write_group("team-x");

    ws.cmd()
        .arg("apply")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
    assert!(document_exists(&ws.store_dir(), "team-x"));

    ws.cmd()
        .arg("apply")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("team-x"))
        .stdout(predicate::str::contains("Unseen"));
}

#[test]
fn status_json_is_machine_readable() {
    let ws = Workspace::new();
    ws.apply("b-team");
    ws.apply("a-team");

    let status = ws.status_json();
    let groups = status.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["identity"], "a-team");
    assert_eq!(groups[0]["phase"], "Unseen");
    assert_eq!(groups[0]["deletionRequested"], false);
}

#[test]
fn status_of_empty_store() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("None"));
}

#[test]
fn delete_before_reconcile_removes_document() {
    let ws = Workspace::new();
    ws.apply("team-x");

    ws.cmd()
        .args(["delete", "team-x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));
    assert!(!document_exists(&ws.store_dir(), "team-x"));
}

#[test]
fn delete_unknown_group_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["delete", "team-x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no desired group named 'team-x'"));
}

#[test]
fn reconcile_of_absent_group_succeeds_without_directory() {
    let ws = Workspace::new();
    ws.cmd_with_directory()
        .args(["reconcile", "team-x", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Released\""));
}

#[test]
fn reconcile_without_directory_settings_is_rejected() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["reconcile", "team-x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Invalid directory configuration"));
}

#[test]
fn finalizer_is_recorded_even_when_directory_is_down() {
    let ws = Workspace::new();
    ws.apply("team-x");

    ws.cmd_with_directory()
        .args(["reconcile", "team-x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory unavailable"));

    let status = ws.status_json();
    let group = &status[0];
    assert_eq!(group["phase"], "Initialized");
    assert_eq!(group["conditions"][0]["type"], "Initialized");
    assert_eq!(group["conditions"][0]["status"], "True");
    assert_eq!(group["conditions"][1]["type"], "Configured");
    assert_eq!(group["conditions"][1]["status"], "False");
}

#[test]
fn apply_rejects_unknown_kind() {
    let ws = Workspace::new();
    let file = ws.dir.path().join("project.toml");
    fs::write(
        &file,
        "apiVersion = \"example.org/v1\"\nkind = \"Project\"\n\n[metadata]\nname = \"p\"\n",
    )
    .unwrap();

    ws.cmd()
        .arg("apply")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown resource kind"));
}

#[test]
fn run_once_over_empty_store() {
    let ws = Workspace::new();
    ws.cmd_with_directory()
        .args(["run", "--once"])
        .assert()
        .success();
}

#[test]
fn run_once_keeps_going_when_directory_is_down() {
    let ws = Workspace::new();
    ws.apply("team-x");

    ws.cmd_with_directory()
        .args(["run", "--once"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Requeued after failure"));
}
