#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("todo-timer-{nanos}-{file_name}"))
}

pub fn command(store_path: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_todo_timer"));
    cmd.env("TODO_TIMER_STORE_PATH", store_path)
        .env("TODO_TIMER_CONFIG_PATH", temp_path("missing-config.json"))
        .env("TODO_TIMER_DISABLE_ALERTS", "1")
        .env_remove("RUST_LOG");
    cmd
}

pub fn run(store_path: &Path, args: &[&str]) -> Output {
    command(store_path)
        .args(args)
        .output()
        .expect("failed to run todo_timer")
}

pub fn run_json(store_path: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run(store_path, &full);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().expect("json output");
    serde_json::from_str(line).expect("valid json")
}

pub fn add_task(store_path: &Path, description: &str, duration: &str) -> String {
    let added = run_json(store_path, &["add", description, duration]);
    added["id"].as_str().expect("id string").to_string()
}

pub fn run_interactive(store_path: &Path, input: &str) -> Output {
    let mut child = command(store_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}
