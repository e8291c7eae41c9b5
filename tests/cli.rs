use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_subcommands() {
    Command::cargo_bin("tonedrill")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("drill"))
        .stdout(predicate::str::contains("attempt"))
        .stdout(predicate::str::contains("prompt"));
}

#[test]
fn prompt_prints_a_practice_target() {
    Command::cargo_bin("tonedrill")
        .unwrap()
        .arg("prompt")
        .assert()
        .success()
        .stdout(predicate::str::contains("Say: "));
}

#[test]
fn attempt_requires_a_target() {
    Command::cargo_bin("tonedrill")
        .unwrap()
        .args(["attempt", "clip.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target"));
}

#[test]
fn attempt_rejects_a_bad_target_key() {
    Command::cargo_bin("tonedrill")
        .unwrap()
        .args(["attempt", "clip.wav", "--target", "xyzzy9"])
        .assert()
        .failure();
}
