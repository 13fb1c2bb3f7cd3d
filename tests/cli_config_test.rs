//! Integration tests for `pargolo config show` and `pargolo delete`.

mod common;

use common::{TestEnv, parse_json};
use predicates::prelude::*;

fn setting<'a>(json: &'a serde_json::Value, key: &str) -> &'a serde_json::Value {
    json["settings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["key"] == key)
        .unwrap()
}

#[test]
fn test_config_show_reports_sources() {
    let env = TestEnv::new();

    let output = env
        .pargolo()
        .args(["config", "show", "--region", "us-east-1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    assert!(json.get("config_file").is_none());
    assert_eq!(setting(&json, "backend")["value"], "file");
    assert_eq!(setting(&json, "backend")["source"], "env:PARGOLO_BACKEND");
    assert_eq!(setting(&json, "region")["value"], "us-east-1");
    assert_eq!(setting(&json, "region")["source"], "cli");
    assert_eq!(setting(&json, "page-size")["value"], "10");
    assert_eq!(setting(&json, "page-size")["source"], "default");
    assert!(setting(&json, "endpoint")["value"].is_null());
}

#[test]
fn test_config_file_is_applied_below_env_and_flags() {
    let env = TestEnv::new();
    let config = env.write_file(
        "config.kdl",
        "backend \"memory\"\nregion \"ap-south-1\"\npage-size 5\ntimeout-secs 12\n",
    );

    let output = env
        .pargolo()
        .env("PARGOLO_CONFIG", &config)
        .args(["config", "show", "--page-size", "3"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    assert!(json["config_file"].as_str().unwrap().ends_with("config.kdl"));
    assert_eq!(setting(&json, "backend")["value"], "file");
    assert_eq!(setting(&json, "region")["value"], "ap-south-1");
    assert_eq!(setting(&json, "region")["source"], "config");
    assert_eq!(setting(&json, "page-size")["value"], "3");
    assert_eq!(setting(&json, "page-size")["source"], "cli");
    assert_eq!(setting(&json, "timeout-secs")["value"], "12");
}

#[test]
fn test_config_file_output_format_human() {
    let env = TestEnv::new();
    let config = env.write_file("config.kdl", "output-format \"human\"\n");

    env.pargolo()
        .args(["config", "show", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("config file:"))
        .stdout(predicate::str::contains("(env:PARGOLO_BACKEND)"));
}

#[test]
fn test_invalid_config_file_is_an_error() {
    let env = TestEnv::new();
    let config = env.write_file("config.kdl", "page-size 0\n");

    env.pargolo()
        .env("PARGOLO_CONFIG", &config)
        .args(["config", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("page-size"));
}

#[test]
fn test_delete_removes_parameter() {
    let env = TestEnv::with_store(&[("/dev/app/api/url", "x"), ("/dev/app/api/keep", "y")]);

    let output = env
        .pargolo()
        .args(["delete", "--name", "/dev/app/api/url"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(parse_json(&output.stdout)["deleted"], true);
    assert_eq!(
        env.stored(),
        vec![("/dev/app/api/keep".to_string(), "y".to_string())]
    );
}

#[test]
fn test_delete_missing_parameter_fails() {
    let env = TestEnv::with_store(&[("/dev/app/api/keep", "y")]);

    env.pargolo()
        .args(["delete", "--name", "/dev/app/api/url"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Parameter not found: /dev/app/api/url"));
}
