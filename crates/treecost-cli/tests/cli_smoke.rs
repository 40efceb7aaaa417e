//! CLI binary smoke tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("treecost").unwrap()
}

fn write_census(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let mut csv = String::from("tree_dbh,health,spc_common\n");
    for i in 0..120 {
        csv.push_str(&format!("{},{},oak\n", 2 + i % 50, ["Good", "Fair", "Poor"][i % 3]));
    }
    let path = dir.path().join("census.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("costs"))
        .stdout(predicate::str::contains("train"));
}

#[test]
fn costs_nonexistent_census_errors() {
    cmd()
        .args(["costs", "/nonexistent/census.csv"])
        .assert()
        .failure();
}

#[test]
fn costs_without_config_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let census = write_census(&dir);
    let output = dir.path().join("out.csv");
    cmd()
        .arg("costs")
        .arg(&census)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 120 rows"))
        .stderr(predicate::str::contains("\"noise_seed\""));
    assert!(output.exists());
}

#[test]
fn train_reports_error_and_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let census = write_census(&dir);
    cmd()
        .arg("train")
        .arg(&census)
        .args(["--num-trees", "10", "--no-report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mean Absolute Error"))
        .stdout(predicate::str::contains("tree_dbh"));
}

#[test]
fn train_rejects_bad_test_fraction() {
    let dir = tempfile::tempdir().unwrap();
    let census = write_census(&dir);
    cmd()
        .arg("train")
        .arg(&census)
        .args(["--test-fraction", "1.5", "--no-report"])
        .assert()
        .failure();
}
