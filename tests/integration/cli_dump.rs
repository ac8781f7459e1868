#![allow(missing_docs)]

mod support;

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

const CHANGES: &str = r#"{"table":"ts_Root","op":"Inserted","new":{"ECClassId":"0x20","Name":"pump-01","FederationGuid":{"blob":"9a3c0f21445e4b6d8f0123456789abcd"}}}
{"table":"ts_Local","op":"Inserted","new":{"Name":"ignored"}}
{"table":"ts_Root","op":"Deleted","old":{"ECClassId":16,"Name":"old-root"}}
{"table":"ts_Aspect","op":"Inserted","new":{"Note":"checked"}}
"#;

struct Fixture {
    dir: TempDir,
    catalog: PathBuf,
    changes: PathBuf,
    config: PathBuf,
}

fn setup(config: &str) -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let catalog = dir.path().join("catalog.db");
    let conn = Connection::open(&catalog).expect("open catalog");
    support::seed_catalog(&conn).expect("seed catalog");
    drop(conn);
    let changes = dir.path().join("changes.jsonl");
    fs::write(&changes, CHANGES).expect("write changes");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, config).expect("write config");
    Fixture {
        dir,
        catalog,
        changes,
        config: config_path,
    }
}

fn instances(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("instance json"))
        .collect()
}

#[test]
fn dump_prints_one_instance_per_accepted_change() {
    let fx = setup("");
    let output = cargo_bin_cmd!("ecadaptor")
        .arg("--config")
        .arg(&fx.config)
        .arg("dump")
        .arg(&fx.catalog)
        .arg(&fx.changes)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows = instances(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["$meta"]["classFullName"], "TestSchema.Widget");
    assert_eq!(rows[0]["FederationGuid"], "9a3c0f21-445e-4b6d-8f01-23456789abcd");
    assert_eq!(rows[1]["$meta"]["op"], "Deleted");
    assert_eq!(rows[2]["$meta"]["fallbackClassId"], "0x50");
}

#[test]
fn dump_applies_cli_filters() {
    let fx = setup("");
    let output = cargo_bin_cmd!("ecadaptor")
        .arg("--config")
        .arg(&fx.config)
        .args(["dump", "--op", "deleted"])
        .arg(&fx.catalog)
        .arg(&fx.changes)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows = instances(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Name"], "old-root");
}

#[test]
fn dump_uses_config_profile() {
    let fx = setup(
        r#"
[profiles.widgets]
classes = ["ts:Widget"]
"#,
    );
    let output = cargo_bin_cmd!("ecadaptor")
        .arg("--config")
        .arg(&fx.config)
        .args(["--profile", "widgets", "dump"])
        .arg(&fx.catalog)
        .arg(&fx.changes)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows = instances(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Name"], "pump-01");
}

#[test]
fn unknown_profile_fails() {
    let fx = setup("");
    let stderr = cargo_bin_cmd!("ecadaptor")
        .arg("--config")
        .arg(&fx.config)
        .args(["--profile", "missing", "dump"])
        .arg(&fx.catalog)
        .arg(&fx.changes)
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&stderr).contains("profile 'missing' not found"));
}

#[test]
fn update_rows_fail_the_dump() {
    let fx = setup("");
    let changes = fx.dir.path().join("update.jsonl");
    fs::write(
        &changes,
        r#"{"table":"ts_Root","op":"Updated","old":{"ECClassId":32},"new":{"ECClassId":32}}"#,
    )
    .expect("write changes");
    let stderr = cargo_bin_cmd!("ecadaptor")
        .arg("--config")
        .arg(&fx.config)
        .arg("dump")
        .arg(&fx.catalog)
        .arg(&changes)
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&stderr).contains("ts_Root"));
}

#[test]
fn derived_lists_hierarchy() {
    let fx = setup("");
    cargo_bin_cmd!("ecadaptor")
        .arg("--config")
        .arg(&fx.config)
        .arg("derived")
        .arg(&fx.catalog)
        .arg("TestSchema.Widget")
        .assert()
        .success()
        .stdout("0x20\n0x21\n");
}
