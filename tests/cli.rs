use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_lists_connection_flags() {
    cargo_bin_cmd!("metahealth")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--server_url"))
        .stdout(contains("--username"))
        .stdout(contains("--password"))
        .stdout(contains("--dry_run"))
        .stdout(contains("--verbose"));
}

#[test]
fn missing_credentials_is_a_usage_error() {
    cargo_bin_cmd!("metahealth")
        .args(["--server_url", "http://localhost:8080"])
        .assert()
        .failure()
        .stderr(contains("--username"));
}

#[test]
fn unknown_check_name_is_rejected() {
    cargo_bin_cmd!("metahealth")
        .args(["-s", "http://x", "-u", "a", "-p", "b", "--check", "combos"])
        .assert()
        .failure();
}
