mod common;

use common::{run, run_json, temp_path};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[test]
fn add_then_list_shows_idle_task() {
    let store_path = temp_path("cli-add.db");

    let added = run_json(&store_path, &["add", "Write report", "10s"]);
    assert_eq!(added["description"], "Write report");
    assert_eq!(added["remaining"], "00:00:10");
    assert_eq!(added["state"], "idle");
    assert_eq!(added["completed"], false);
    OffsetDateTime::parse(added["created_at"].as_str().expect("created_at"), &Rfc3339)
        .expect("created_at rfc3339");

    let listed = run_json(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    let tasks = listed.as_array().expect("task array");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], added["id"]);
    assert_eq!(tasks[0]["planned_duration"], "10s");
    assert_eq!(tasks[0]["remaining_seconds"], 10);
}

#[test]
fn list_keeps_insertion_order() {
    let store_path = temp_path("cli-add-order.db");

    run_json(&store_path, &["add", "first", "1m"]);
    run_json(&store_path, &["add", "second", "1h30m"]);
    run_json(&store_path, &["add", "first", "3h"]);

    let listed = run_json(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    let descriptions: Vec<&str> = listed
        .as_array()
        .expect("task array")
        .iter()
        .map(|task| task["description"].as_str().expect("description"))
        .collect();
    assert_eq!(descriptions, vec!["first", "second", "first"]);
    assert_eq!(listed[1]["remaining"], "01:30:00");
}

#[test]
fn add_rejects_bad_duration() {
    let store_path = temp_path("cli-add-bad-duration.db");
    let output = run(&store_path, &["add", "demo", "soon"]);
    let listed = run_json(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert_eq!(listed.as_array().expect("task array").len(), 0);
}

#[test]
fn add_rejects_blank_description() {
    let store_path = temp_path("cli-add-blank.db");
    let output = run(&store_path, &["add", "   ", "1m"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - description is required"));
}

#[test]
fn empty_list_prints_placeholder() {
    let store_path = temp_path("cli-list-empty.db");
    let output = run(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No tasks available"));
}

#[test]
fn plain_list_renders_table() {
    let store_path = temp_path("cli-list-table.db");
    run_json(&store_path, &["add", "Stretch", "15m"]);
    let output = run(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("remaining"));
    assert!(stdout.contains("Stretch"));
    assert!(stdout.contains("00:15:00"));
}
