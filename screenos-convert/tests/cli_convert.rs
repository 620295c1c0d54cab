use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn bin() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("screenos-convert"))
}

#[test]
fn convert_prints_incidents_and_summary() {
    bin()
        .arg("convert")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .assert()
        .success()
        .stdout(predicate::str::contains("line 92"))
        .stdout(predicate::str::contains("MANUAL"))
        .stdout(predicate::str::contains("convert_summary objects="));
}

#[test]
fn convert_json_is_the_full_result() {
    let output = bin()
        .arg("convert")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--format")
        .arg("json")
        .arg("--package-name")
        .arg("lab")
        .output()
        .expect("run convert");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["package"]["name"], "lab");
    assert!(json["objects"].as_array().is_some_and(|o| !o.is_empty()));
    assert!(json["nat_rules"].as_array().is_some_and(|r| !r.is_empty()));
}

#[test]
fn convert_without_nat_reports_skipped_lines() {
    let output = bin()
        .arg("convert")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--no-nat")
        .arg("--format")
        .arg("json")
        .output()
        .expect("run convert");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["nat_rules"].as_array().map(Vec::len), Some(0));
    assert!(json["skipped_nat_lines"]
        .as_array()
        .is_some_and(|l| l.contains(&Value::from(34))));
}

#[test]
fn convert_strict_fails_on_manual_action() {
    bin()
        .arg("convert")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("manual action"));
}

#[test]
fn convert_strict_passes_clean_config() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("clean.cfg");
    fs::write(
        &input,
        "set zone \"Trust\" vrouter \"trust-vr\"\nset address \"Trust\" \"pc\" 10.0.0.5 255.255.255.255\n",
    )
    .expect("write config");

    bin()
        .arg("convert")
        .arg(&input)
        .arg("--strict")
        .assert()
        .success()
        .stdout(predicate::str::contains("hosts=1"));
}

#[test]
fn convert_writes_output_file() {
    let dir = tempdir().expect("tempdir");
    let out = dir.path().join("result.json");

    bin()
        .arg("convert")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let raw = fs::read_to_string(&out).expect("read output");
    let json: Value = serde_json::from_str(&raw).expect("json file");
    assert_eq!(json["package"]["name"], "SSG_policy_package");
}

#[test]
fn convert_refuses_to_overwrite_input() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("ssg.cfg");
    fs::copy(fixture("fixtures/ssg-basic.cfg"), &input).expect("copy fixture");

    bin()
        .arg("convert")
        .arg(&input)
        .arg("--output")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing to overwrite"));

    let after = fs::read_to_string(&input).expect("read input");
    assert!(after.starts_with("set clock timezone 1"));
}

#[test]
fn convert_rejects_bad_knowledge_file() {
    let dir = tempdir().expect("tempdir");
    let knowledge = dir.path().join("kb.toml");
    fs::write(&knowledge, "this is = = not toml").expect("write knowledge");

    bin()
        .arg("convert")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--knowledge")
        .arg(&knowledge)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load knowledge"));
}

#[test]
fn parse_shows_aggregated_statements() {
    bin()
        .arg("parse")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .assert()
        .success()
        .stdout(predicate::str::contains("[policy]"))
        .stdout(predicate::str::contains("set policy id 5"));
}

#[test]
fn parse_all_json_lists_every_line() {
    let output = bin()
        .arg("parse")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--all")
        .arg("--format")
        .arg("json")
        .output()
        .expect("run parse");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json.as_array().map(Vec::len), Some(105));
}

#[test]
fn parse_rejects_multiple_vsys() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("vsys.cfg");
    fs::write(&input, "set vsys-id 0\nset vsys-id 1\n").expect("write config");

    bin()
        .arg("parse")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn stats_prints_parse_and_conversion_counts() {
    bin()
        .arg("stats")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .assert()
        .success()
        .stdout(predicate::str::contains("parse_summary lines=105"))
        .stdout(predicate::str::contains("object_summary"))
        .stdout(predicate::str::contains("convert_summary"));
}

#[test]
fn stats_json_has_both_sections() {
    let output = bin()
        .arg("stats")
        .arg(fixture("fixtures/ssg-basic.cfg"))
        .arg("--format")
        .arg("json")
        .output()
        .expect("run stats");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["parse"]["lines"], 105);
    assert!(json["conversion"]["objects"].as_u64().is_some_and(|n| n > 0));
}
