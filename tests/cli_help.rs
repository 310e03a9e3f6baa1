use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_help() {
    Command::cargo_bin("git-autocommit")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage").or(predicate::str::contains("USAGE")))
        .stdout(predicate::str::contains("Monitor directory changes"))
        .stdout(predicate::str::contains("start"));
}

#[test]
fn start_help_mentions_path() {
    Command::cargo_bin("git-autocommit")
        .unwrap()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PATH"));
}

#[test]
fn prints_version() {
    Command::cargo_bin("git-autocommit")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
