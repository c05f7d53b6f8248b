use predicates::prelude::*;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct SampleFile {
    _dir: TempDir,
    json_path: PathBuf,
    packson_path: PathBuf,
    value: Value,
}

fn sample_value() -> Value {
    json!([
        {"user": "alice", "level": "info", "latency": 12},
        {"user": "bob", "level": "warn", "latency": 30},
        {"user": "carol", "level": "info", "latency": 7, "retry": true},
    ])
}

fn build_sample_file() -> Result<SampleFile, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let json_path = dir.path().join("input.json");
    let packson_path = dir.path().join("output.pson");
    let value = sample_value();
    fs::write(&json_path, serde_json::to_vec(&value)?)?;

    assert_cmd::Command::cargo_bin("packson")?
        .args([
            "encode",
            json_path.to_str().unwrap(),
            "-o",
            packson_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Encoded to"));

    Ok(SampleFile {
        _dir: dir,
        json_path,
        packson_path,
        value,
    })
}

#[test]
fn encode_writes_decodable_stream() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let bytes = fs::read(&sample.packson_path)?;
    assert_eq!(packson_codec::decode(&bytes)?, sample.value);
    Ok(())
}

#[test]
fn decode_round_trips_to_json() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let out_path = sample._dir.path().join("roundtrip.json");

    assert_cmd::Command::cargo_bin("packson")?
        .args([
            "decode",
            sample.packson_path.to_str().unwrap(),
            "-o",
            out_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let value: Value = serde_json::from_slice(&fs::read(&out_path)?)?;
    assert_eq!(value, sample.value);
    Ok(())
}

#[test]
fn decode_to_stdout_pretty() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("packson")?
        .args(["decode", sample.packson_path.to_str().unwrap(), "--pretty"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output)?;
    assert!(text.contains("\n  {"));
    let value: Value = serde_json::from_str(&text)?;
    assert_eq!(value, sample.value);
    Ok(())
}

#[test]
fn stdin_to_stdout_pipeline() -> Result<(), Box<dyn Error>> {
    let value = json!({"nested": {"list": [1, 2, 3], "name": "x"}, "flag": false});
    let encoded = assert_cmd::Command::cargo_bin("packson")?
        .args(["encode", "-"])
        .write_stdin(serde_json::to_vec(&value)?)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let decoded = assert_cmd::Command::cargo_bin("packson")?
        .args(["decode", "-"])
        .write_stdin(encoded)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let round_tripped: Value = serde_json::from_slice(&decoded)?;
    assert_eq!(round_tripped, value);
    Ok(())
}

#[test]
fn chunk_size_does_not_change_output() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let reference = fs::read(&sample.packson_path)?;

    let output = assert_cmd::Command::cargo_bin("packson")?
        .args([
            "encode",
            sample.json_path.to_str().unwrap(),
            "--chunk-size",
            "16",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(output, reference);
    Ok(())
}

#[test]
fn inspect_table_lists_statistics() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    assert_cmd::Command::cargo_bin("packson")?
        .args(["inspect", sample.packson_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Statistic\tValue"))
        .stdout(predicate::str::contains("Strings\t"))
        .stdout(predicate::str::contains("Array headers\t"))
        .stdout(predicate::str::contains("Ratio").not());
    Ok(())
}

#[test]
fn inspect_json_input_reports_ratio() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("packson")?
        .args([
            "inspect",
            sample.json_path.to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output)?;
    let json_bytes = fs::metadata(&sample.json_path)?.len();
    let encoded_bytes = fs::metadata(&sample.packson_path)?.len();
    assert_eq!(report["json_bytes"], json_bytes);
    assert_eq!(report["encoded_bytes"], encoded_bytes);
    assert!(report["ratio"].as_f64().unwrap() < 1.0);
    // user, level, latency, retry, and the five string values
    assert_eq!(report["strings"], 9);
    // three columns plus one inline `retry`
    assert_eq!(report["object_entries"], 1);
    Ok(())
}

#[test]
fn decode_rejects_corrupt_input() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let mut bytes = fs::read(&sample.packson_path)?;
    bytes.push(0);
    let corrupt = sample._dir.path().join("corrupt.pson");
    fs::write(&corrupt, bytes)?;

    assert_cmd::Command::cargo_bin("packson")?
        .args(["decode", corrupt.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TrailingBytes"));
    Ok(())
}

#[test]
fn encode_rejects_invalid_json() -> Result<(), Box<dyn Error>> {
    assert_cmd::Command::cargo_bin("packson")?
        .args(["encode", "-"])
        .write_stdin("{\"unterminated\": ")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn missing_input_file_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    assert_cmd::Command::cargo_bin("packson")?
        .args(["decode", dir.path().join("absent.pson").to_str().unwrap()])
        .assert()
        .failure();
    Ok(())
}
