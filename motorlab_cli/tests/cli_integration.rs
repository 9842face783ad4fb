use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, gain: &str) -> PathBuf {
    let toml = format!(
        r#"
[encoder]
period = 65535

[[motors]]
name = "m1"
gain = {gain}
setpoint = 6900
period_ms = 10
"#
    );
    let path = dir.path().join("motorlab.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn motorlab() -> Command {
    Command::cargo_bin("motorlab").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["run", "--runs", "1"], 0, "end", "stdout")]
#[case(&["run", "--runs", "1"], 0, "MEAN_US", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "0.07");

    let mut cmd = motorlab();
    cmd.arg("--config").arg(&cfg).args(args);
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn run_streams_samples_then_a_single_end_marker() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "0.07");

    let out = motorlab()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--runs", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.last(), Some(&"end"));
    assert_eq!(lines.iter().filter(|l| **l == "end").count(), 1);

    let samples = &lines[..lines.len() - 1];
    assert!(samples.len() > 1);
    assert_eq!(samples[0].split(',').nth(1), Some("0"));
    let mut last_ms = 0u64;
    for line in samples {
        let (ms, pos) = line.split_once(',').unwrap();
        let ms: u64 = ms.parse().unwrap();
        pos.parse::<i32>().unwrap();
        assert!(ms > last_ms, "elapsed must increase: {line}");
        last_ms = ms;
    }
}

#[test]
fn bad_gain_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "-1.0");

    motorlab()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--runs", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("gain must be a finite value"));
}

#[test]
fn json_mode_prints_structured_errors() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "-1.0");

    let out = motorlab()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let v: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(v["exit_code"], 2);
    assert!(v["message"].as_str().unwrap().contains("gain"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    motorlab()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config file could not be read"));
}

#[test]
fn capture_writes_complete_runs_as_csv() {
    let dir = tempdir().unwrap();
    let stream = dir.path().join("stream.txt");
    fs::write(&stream, "MPY: soft reboot\n10,0\n20,412\n30,1180\nend\n10,0\nend\n10,5\n").unwrap();
    let csv_path = dir.path().join("runs.csv");

    motorlab()
        .args(["capture", "--input"])
        .arg(&stream)
        .arg("--out")
        .arg(&csv_path)
        .assert()
        .success();

    let csv = fs::read_to_string(&csv_path).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "run,elapsed_ms,position");
    assert_eq!(rows[1..], ["0,10,0", "0,20,412", "0,30,1180", "1,10,0"]);
}
