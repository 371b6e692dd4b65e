use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_posts_without_app_id_fails_to_load_sdk() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("fbdeck")
        .env("FBDECK_HOME", dir.path())
        .env_remove("FBDECK_APP_ID")
        .arg("posts")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Failed to load Facebook SDK. Please try again later.",
        ))
        .stderr(predicate::str::contains("Missing Facebook App ID"));
}

#[test]
fn test_posts_rejects_non_numeric_app_id() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "app_id = \"my-app\"\n").unwrap();

    cargo_bin_cmd!("fbdeck")
        .env("FBDECK_HOME", dir.path())
        .env_remove("FBDECK_APP_ID")
        .arg("posts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("digits only"));
}

#[test]
fn test_interactive_session_shows_card_and_help() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("fbdeck")
        .env("FBDECK_HOME", dir.path())
        .env_remove("FBDECK_APP_ID")
        .write_stdin("help\nposts\nlogout\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Facebook Integration"))
        .stdout(predicate::str::contains(
            "Connect with your Facebook account to view your posts",
        ))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Not logged in. Type `login` first."))
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_interactive_login_before_sdk_ready() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("fbdeck")
        .env("FBDECK_HOME", dir.path())
        .env_remove("FBDECK_APP_ID")
        .write_stdin("login\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Facebook SDK is still loading. Please wait a moment.",
        ));
}

#[test]
fn test_interactive_unknown_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("fbdeck")
        .env("FBDECK_HOME", dir.path())
        .env_remove("FBDECK_APP_ID")
        .write_stdin("dance\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown command: dance"));
}

#[test]
fn test_logs_are_written_under_home() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("fbdeck")
        .env("FBDECK_HOME", dir.path())
        .env_remove("FBDECK_APP_ID")
        .env("FBDECK_LOG", "debug")
        .arg("posts")
        .assert()
        .failure();

    assert!(dir.path().join("logs").join("fbdeck.log").exists());
}
