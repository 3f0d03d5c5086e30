//! End-to-end tests driving the `att` binary.
//!
//! Each test runs against its own `HOME` and database file.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn att_binary() -> String {
    env!("CARGO_BIN_EXE_att").to_string()
}

fn att(temp: &Path, args: &[&str]) -> Output {
    Command::new(att_binary())
        .env("HOME", temp)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env("ATT_DATABASE_PATH", temp.join("att.db"))
        .args(args)
        .output()
        .expect("failed to run att")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "att should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn add_jo(temp: &Path) {
    let output = att(
        temp,
        &[
            "employees",
            "add",
            "Jo",
            "--identifier",
            "beac01",
            "--department",
            "IT",
            "--external-id",
            "E-001",
        ],
    );
    assert_success(&output);
    assert!(stdout(&output).contains("identifier BEAC01"));
}

#[test]
fn test_ingest_dedup_and_listing() {
    let temp = TempDir::new().unwrap();
    add_jo(temp.path());

    let first = att(temp.path(), &["ingest", "BEAC01"]);
    assert_success(&first);
    assert!(stdout(&first).starts_with("Recorded checkin for Jo (#1)"));

    // Same status inside the window, resolved through the encoded name.
    let second = att(temp.path(), &["ingest", "4A6F"]);
    assert_success(&second);
    assert!(stdout(&second).starts_with("Duplicate checkin"));

    let checkout = att(temp.path(), &["ingest", "BEAC01", "--action", "checkout", "--json"]);
    assert_success(&checkout);
    let json: serde_json::Value = serde_json::from_str(&stdout(&checkout)).unwrap();
    assert_eq!(json["deduped"], false);
    assert_eq!(json["status"], "checkout");

    let events = att(temp.path(), &["events", "--annotate", "--json"]);
    assert_success(&events);
    let rows: serde_json::Value = serde_json::from_str(&stdout(&events)).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["status"], "checkout");
    assert_eq!(rows[0]["annotation"]["last_of_day"], true);
    assert_eq!(rows[1]["annotation"]["first_of_day"], true);
}

#[test]
fn test_ingest_exit_codes() {
    let temp = TempDir::new().unwrap();
    add_jo(temp.path());

    let undecodable = att(temp.path(), &["ingest", "ZZ"]);
    assert_eq!(undecodable.status.code(), Some(2));

    // "Nobody"
    let unknown = att(temp.path(), &["ingest", "4E6F626F6479"]);
    assert_eq!(unknown.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("no active employee"));
}

#[test]
fn test_export_to_directory() {
    let temp = TempDir::new().unwrap();
    add_jo(temp.path());
    assert_success(&att(temp.path(), &["ingest", "BEAC01"]));

    let missing = att(temp.path(), &["export", "--department", "IT"]);
    assert_eq!(missing.status.code(), Some(4));

    let today = chrono::Local::now().date_naive().to_string();
    let out_dir = temp.path().join("reports");
    std::fs::create_dir_all(&out_dir).unwrap();
    let output = att(
        temp.path(),
        &["export", "--date", &today, "--output", out_dir.to_str().unwrap()],
    );
    assert_success(&output);

    let csv = std::fs::read_to_string(out_dir.join(format!("attendance-{today}.csv"))).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Date,Time,Employee,Status,"));
    assert!(lines[1].ends_with("\"yes\",\"\",\"BEAC01\",\"E-001\""));
}

#[test]
fn test_stats_and_summary() {
    let temp = TempDir::new().unwrap();
    add_jo(temp.path());
    assert_success(&att(temp.path(), &["ingest", "BEAC01"]));

    let stats = att(temp.path(), &["stats", "--json"]);
    assert_success(&stats);
    let json: serde_json::Value = serde_json::from_str(&stdout(&stats)).unwrap();
    assert_eq!(json["today_checkins"], 1);
    assert_eq!(json["currently_present"], 1);
    assert_eq!(json["total_employees"], 1);

    let summary = att(temp.path(), &["summary", "--json"]);
    assert_success(&summary);
    let rows: serde_json::Value = serde_json::from_str(&stdout(&summary)).unwrap();
    assert_eq!(rows[0]["employee_name"], "Jo");
    assert!(rows[0]["last_checkout"].is_null());
}

#[test]
fn test_invalid_filter_is_a_validation_failure() {
    let temp = TempDir::new().unwrap();
    let output = att(temp.path(), &["events", "--month", "2025-13"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_no_subcommand_prints_help() {
    let temp = TempDir::new().unwrap();
    let output = att(temp.path(), &[]);
    assert_success(&output);
    assert!(stdout(&output).contains("Usage"));
}
