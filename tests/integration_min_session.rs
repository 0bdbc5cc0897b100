// Integration tests that drive the compiled binary.
//
// The PTY test exercises the real event loop and crossterm input handling.
// It needs a pseudo terminal (expectrl), so it is Unix-only and ignored by
// default. Run it via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use assert_cmd::Command;
use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("tapline");
    let cmd = format!(
        "env HOME={} {} -p hi --mode words",
        home.path().display(),
        bin.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("hi")?;
    std::thread::sleep(Duration::from_millis(200));

    // ESC quits from both the typing and the results screen
    p.send("\x1b")?;
    p.expect(Eof)?;

    let history = home.path().join(".local/state/tapline/history.json");
    assert!(history.exists());
    Ok(())
}

#[test]
fn history_on_fresh_install_is_empty() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("tapline")
        .unwrap()
        .env("HOME", home.path())
        .arg("--history")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no tests recorded yet"));
}

#[test]
fn history_of_unknown_user_is_empty() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("tapline")
        .unwrap()
        .env("HOME", home.path())
        .args(["--history", "--user", "nobody"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no tests recorded yet"));
    assert!(home.path().join(".local/state/tapline/results.db").exists());
}

#[test]
fn clear_history_on_fresh_install() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("tapline")
        .unwrap()
        .env("HOME", home.path())
        .arg("--clear-history")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("cleared 0 results"));
}

#[test]
fn leaderboard_on_fresh_install_is_empty() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("tapline")
        .unwrap()
        .env("HOME", home.path())
        .arg("--leaderboard")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("leaderboard is empty"));
}

#[test]
fn invalid_mode_is_rejected() {
    Command::cargo_bin("tapline")
        .unwrap()
        .args(["--mode", "2min"])
        .assert()
        .failure();
}
