use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn requires_at_least_one_action() {
    Command::cargo_bin("ubflash")
        .unwrap()
        .assert()
        .failure()
        .stderr(contains("at least one of -e, -r, -w"));
}

#[test]
fn verify_without_write_is_rejected() {
    Command::cargo_bin("ubflash")
        .unwrap()
        .args(["-d", "/dev/null", "-v", "-e"])
        .assert()
        .failure()
        .stderr(contains("-v requires -w"));
}

#[test]
fn help_lists_every_flag() {
    Command::cargo_bin("ubflash")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stderr(contains("--device"))
        .stderr(contains("--baud"))
        .stderr(contains("--erase"))
        .stderr(contains("--write"))
        .stderr(contains("--verify"))
        .stderr(contains("--config"));
}

#[test]
fn unknown_flag_is_a_clap_error() {
    Command::cargo_bin("ubflash")
        .unwrap()
        .arg("--bogus-flag")
        .assert()
        .failure();
}

#[test]
fn explicit_config_path_that_does_not_exist_is_an_error() {
    Command::cargo_bin("ubflash")
        .unwrap()
        .args(["-e", "--config", "/nonexistent/ubflash.toml"])
        .assert()
        .failure()
        .stderr(contains("failed to read config file"));
}
