use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("survey-annotator").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn missing_input_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("survey-annotator").expect("binary exists");
    cmd.current_dir(dir.path())
        .env("ENTITY_GAZETTEER", dir.path().join("absent.csv"))
        .args(["run", "--data", "does-not-exist.csv", "--out"])
        .arg(dir.path().join("out"))
        .assert()
        .failure();
    assert!(!dir.path().join("out").exists());
}

#[test]
fn sample_run_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");
    let mut cmd = Command::cargo_bin("survey-annotator").expect("binary exists");
    let assert = cmd
        .args(["run", "--data", "data/sample_surveys.csv", "--out"])
        .arg(&out)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("Pipeline completed"));

    let written = std::fs::read_to_string(out.join("pipeline_output.csv")).unwrap();
    assert!(written.contains("[REDACTED_EMAIL]"));
    assert!(written.contains("[REDACTED_PHONE]"));
    assert!(out.join("run_summary.json").exists());
}

