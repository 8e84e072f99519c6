#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::{Command as Process, Stdio};
use tempfile::TempDir;

fn thesisdb(data_dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("thesisdb"));
    cmd.arg("--data-dir")
        .arg(data_dir.path())
        .env_remove("THESISDB_HOME")
        .env_remove("THESISDB_LOG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_init_creates_every_resource() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized thesisdb store"));

    for name in [
        "students.json",
        "teachers.json",
        "courses.json",
        "thesis.json",
        "defended_thesis.json",
        "notifications.json",
    ] {
        assert_eq!(fs::read_to_string(temp.path().join(name)).unwrap().trim(), "[]");
    }
}

#[test]
fn test_status_and_show_report_fallback_without_writing() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp).arg("init").assert().success();
    fs::write(temp.path().join("courses.json"), "[{\"course_id\": ").unwrap();

    thesisdb(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("courses.json").and(predicate::str::contains("empty default")));

    let output = thesisdb(&temp).args(["show", "courses"]).output().unwrap();
    assert!(output.status.success());
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown, Value::Array(vec![]));
    assert!(String::from_utf8_lossy(&output.stderr).contains("recover courses"));
    assert_eq!(
        fs::read_to_string(temp.path().join("courses.json")).unwrap(),
        "[{\"course_id\": "
    );

    thesisdb(&temp)
        .args(["recover", "courses"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored courses.json"));
    assert_eq!(fs::read_to_string(temp.path().join("courses.json")).unwrap().trim(), "[]");
}

#[test]
fn test_notify_then_list() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp)
        .args(["notify", "defense_scheduled", "--payload", r#"{"student": "s1"}"#, "--actor", "t9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded defense_scheduled"));

    thesisdb(&temp)
        .args(["notifications", "--event", "defense_scheduled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defense_scheduled by t9"));

    assert!(temp.path().join("notifications.jsonl").exists());
}

#[test]
fn test_concurrent_processes_keep_every_notification() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp).arg("init").assert().success();
    let writers = 6;

    let children: Vec<_> = (0..writers)
        .map(|i| {
            Process::new(cargo_bin("thesisdb"))
                .arg("--data-dir")
                .arg(temp.path())
                .arg("notify")
                .arg(format!("tag-{}", i))
                .env_remove("THESISDB_HOME")
                .env_remove("THESISDB_LOG")
                .env_remove("RUST_LOG")
                .env("THESISDB_LOCK_POLL_MS", "5")
                .env("THESISDB_LOCK_TIMEOUT", "60")
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
                .unwrap()
        })
        .collect();
    for child in children {
        let output = child.wait_with_output().unwrap();
        assert!(
            output.status.success(),
            "writer failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let output = thesisdb(&temp).args(["show", "notifications"]).output().unwrap();
    assert!(output.status.success());
    let shown: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    for i in 0..writers {
        let tag = format!("tag-{}", i);
        let count = shown.iter().filter(|n| n["event"] == tag.as_str()).count();
        assert_eq!(count, 1, "{} stored {} times", tag, count);
    }
    assert!(!temp.path().join("notifications.json.lock").exists());
}

#[test]
fn test_notify_rejects_bad_payload() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp)
        .args(["notify", "x", "--payload", "[1, 2]"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn test_purge_requires_confirmation() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp).args(["notify", "x"]).assert().success();

    thesisdb(&temp)
        .args(["purge", "notifications"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    thesisdb(&temp)
        .args(["purge", "notifications", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Purged notifications.json"));
    assert_eq!(
        fs::read_to_string(temp.path().join("notifications.json")).unwrap().trim(),
        "[]"
    );

    thesisdb(&temp)
        .args(["backups", "notifications"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notifications_"));
}

#[test]
fn test_attach_dedupes_identical_content() {
    let temp = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let pdf = source.path().join("report.pdf");
    fs::write(&pdf, b"%PDF-1.7 thesis").unwrap();

    thesisdb(&temp)
        .arg("attach")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("report.pdf"));
    thesisdb(&temp)
        .arg("attach")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Identical file already stored"));

    let stored: Vec<_> = fs::read_dir(temp.path().join("files"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "pdf"))
        .collect();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_unknown_resource_fails() {
    let temp = TempDir::new().unwrap();
    thesisdb(&temp)
        .args(["show", "grades"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Unknown resource: grades"));
}
