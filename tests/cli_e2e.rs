//! End-to-end CLI tests for the boca binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary isolated from the user's config, secrets, and keychain.
fn boca(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("boca").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env("BOCA_SESSION_MASTER_KEY", "cli-e2e-test-key")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stay logged in to a BOCA"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boca"));
}

#[test]
fn test_binary_requires_subcommand() {
    let home = TempDir::new().unwrap();
    boca(&home).assert().failure();
}

#[test]
fn test_status_without_credentials() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("status: no credentials"));
}

#[test]
fn test_login_with_empty_password_fails_without_network() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .args(["login", "--host", "127.0.0.1:9", "--username", "team1"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("password must not be empty"));

    boca(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("no credentials"));
}

#[test]
fn test_fetch_when_not_logged_in_fails() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .args(["fetch", "team/index.php"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_logout_without_credentials_succeeds() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("logout: ok"));
}

#[test]
fn test_download_when_not_logged_in_fails() {
    let home = TempDir::new().unwrap();
    boca(&home)
        .args(["download", "filedownload.php?oid=1", "A.pdf"])
        .current_dir(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    std::fs::write(&config, "concurrency = \"4\"\n").unwrap();

    boca(&home)
        .args(["--config", config.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_secrets_path_is_used() {
    let home = TempDir::new().unwrap();
    let secrets = home.path().join("custom").join("secrets.enc");
    let config = home.path().join("config.toml");
    std::fs::write(
        &config,
        format!("secrets_path = \"{}\"\n", secrets.display()),
    )
    .unwrap();

    boca(&home)
        .args(["--config", config.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no credentials"));
}
