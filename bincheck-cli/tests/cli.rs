mod common;

use std::fs;

use bincheck_core::database::ChecksumValidator;

use crate::common::{Workspace, stderr_of};

#[test]
fn test_help_lists_subcommands() {
    let ws = Workspace::new();
    let output = ws.command().arg("--help").assert().success().get_output().clone();
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("predict"));
    assert!(text.contains("database"));
}

#[test]
fn test_no_arguments_prints_help_and_fails() {
    let ws = Workspace::new();
    ws.command().assert().failure();
}

#[test]
fn test_conflicting_model_flags_rejected() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .args(["predict", "--general", "--allmodels", "-i"])
        .arg(ws.bins())
        .arg("-o")
        .arg(ws.output())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("Only one of --general --specific --allmodels"));
    assert!(!ws.output().exists());
}

#[test]
fn test_invalid_translation_table_rejected() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .args(["predict", "--ttable", "7", "-i"])
        .arg(ws.bins())
        .arg("-o")
        .arg(ws.output())
        .assert()
        .failure()
        .get_output()
        .clone();
    insta::assert_snapshot!(
        stderr_of(&output).trim_end(),
        @"Error: Invalid configuration: Translation table 7 is not valid"
    );
}

#[test]
fn test_missing_database_is_fatal_and_logged() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .args(["predict", "-i"])
        .arg(ws.bins())
        .arg("-o")
        .arg(ws.output())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("no database location configured"));

    let log = fs::read_to_string(ws.output().join("bincheck.log")).unwrap();
    assert!(log.contains("Running bincheck version"));
    assert!(!ws.output().join("quality_report.tsv").exists());
}

#[test]
fn test_non_empty_output_requires_force() {
    let ws = Workspace::new();
    fs::create_dir(ws.output()).unwrap();
    fs::write(ws.output().join("quality_report.tsv"), "old").unwrap();

    let output = ws
        .command()
        .args(["predict", "-i"])
        .arg(ws.bins())
        .arg("-o")
        .arg(ws.output())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("--force"));
    assert_eq!(
        fs::read_to_string(ws.output().join("quality_report.tsv")).unwrap(),
        "old"
    );
}

#[test]
fn test_database_location_round_trip() {
    let ws = Workspace::new();
    ws.command()
        .args(["database", "--current"])
        .assert()
        .failure();

    ws.command()
        .args(["database", "--setdblocation"])
        .arg(ws.database())
        .assert()
        .success();

    let output = ws
        .command()
        .args(["database", "--current"])
        .assert()
        .success()
        .get_output()
        .clone();
    let expected = fs::canonicalize(ws.database()).unwrap();
    assert_eq!(
        String::from_utf8(output.stdout).unwrap().trim_end(),
        expected.display().to_string()
    );
}

#[test]
fn test_database_checksum_mismatch_rejected() {
    let ws = Workspace::new();
    fs::write(ws.path().join("reference.dmnd.sha256"), "0000").unwrap();
    ws.command()
        .args(["database", "--setdblocation"])
        .arg(ws.database())
        .assert()
        .failure();
    assert!(!ws.registry().exists());
}

#[test]
fn test_database_requires_an_action() {
    let ws = Workspace::new();
    ws.command().arg("database").assert().failure();
}

#[test]
fn test_testrun_listed_in_help() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .args(["testrun", "--help"])
        .assert()
        .success()
        .get_output()
        .clone();
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("--model-dir"));
    assert!(text.contains("--threads"));
}

#[test]
fn test_testrun_without_test_genomes_fails() {
    let ws = Workspace::new();
    fs::create_dir(ws.data()).unwrap();
    let output = ws
        .command()
        .args(["testrun", "--model-dir"])
        .arg(ws.data())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("test genome manifest"));
}

#[test]
fn test_testrun_rejects_altered_test_genomes() {
    let ws = Workspace::new();
    // sha256("abc")
    ws.write_test_set(
        ">c1\nACGT\n",
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    );
    let output = ws
        .command()
        .args(["testrun", "--model-dir"])
        .arg(ws.data())
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Test run failed"));
    assert!(stderr.contains("TEST1.tst: checksum mismatch"));
    assert!(!stderr.contains("no database location configured"));
}

#[test]
fn test_testrun_checks_genomes_before_the_database() {
    let ws = Workspace::new();
    let genome = ">c1\nACGT\n";
    ws.write_test_set(genome, "unknown");
    let digest = ChecksumValidator::digest(&ws.data().join("testrun").join("TEST1.tst")).unwrap();
    ws.write_test_set(genome, &digest);

    let output = ws
        .command()
        .args(["testrun", "--model-dir"])
        .arg(ws.data())
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Checksum successful"));
    assert!(stderr.contains("no database location configured"));
}
