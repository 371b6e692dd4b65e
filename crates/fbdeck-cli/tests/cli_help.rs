use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("fbdeck")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("posts"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("fbdeck")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("fbdeck")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fbdeck"));
}

#[test]
fn test_unknown_subcommand_fails() {
    cargo_bin_cmd!("fbdeck")
        .arg("timeline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
