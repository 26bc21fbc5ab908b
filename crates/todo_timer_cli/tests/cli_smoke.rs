mod common;

use common::{run, temp_path};

#[test]
fn help_lists_commands() {
    let store_path = temp_path("cli-smoke.db");
    let output = run(&store_path, &["--help"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["add", "list", "start", "stop", "reset", "done", "clear"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

#[test]
fn unknown_command_reports_invalid_input() {
    let store_path = temp_path("cli-smoke-unknown.db");
    let output = run(&store_path, &["explode"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}

#[test]
fn durations_lists_default_presets() {
    let store_path = temp_path("cli-durations.db");
    let output = run(&store_path, &["durations"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let presets: Vec<&str> = stdout.lines().collect();
    assert_eq!(presets, vec!["10s", "1m", "15m", "30m", "1h", "3h"]);
}

#[test]
fn config_override_replaces_presets() {
    let store_path = temp_path("cli-durations-override.db");
    let output = run(
        &store_path,
        &["--config-override", "durations=5m,25m", "durations"],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["5m", "25m"]);
}

#[test]
fn config_override_rejects_unknown_key() {
    let store_path = temp_path("cli-override-unknown.db");
    let output = run(&store_path, &["--config-override", "theme=dark", "list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(stderr.contains("unknown config field"));
}
