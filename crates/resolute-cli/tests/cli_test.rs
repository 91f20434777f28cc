use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn resolute() -> Command {
    Command::new(env!("CARGO_BIN_EXE_resolute"))
}

#[test]
fn test_no_arguments_prints_help() {
    let output = resolute().output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--json"));
    assert!(stdout.contains("--create-json"));
}

#[test]
fn test_version_flag() {
    let output = resolute().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_create_json_writes_skeleton_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("resolute.json");

    let status = resolute().arg("--create-json").arg(&path).status().unwrap();
    assert!(status.success());
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"registration\""));
    assert!(text.contains("\"fusion\""));

    let status = resolute().arg("--create-json").arg(&path).status().unwrap();
    assert!(!status.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = resolute()
        .arg("--json")
        .arg(dir.path().join("absent.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.json"));
}

#[test]
fn test_invalid_config_fails_and_logs_to_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("resolute.json");
    let logs = dir.path().join("logs");
    fs::write(
        &config,
        r#"{
            "registration": { "outputDirectory": "reg", "outputPrefix": "" },
            "fusion": { "mask": "mask.nii.gz", "output": "pct.nii.gz" }
        }"#,
    )
    .unwrap();

    let status = resolute()
        .arg("--json")
        .arg(&config)
        .arg("--log")
        .arg(&logs)
        .status()
        .unwrap();
    assert!(!status.success());
    let log = fs::read_to_string(logs.join("resolute.log")).unwrap();
    assert!(log.contains("outputPrefix"));
    assert!(log.contains("Started:"));
    assert!(log.contains("Ended:"));
    assert!(log.contains("Time taken:"));
}

#[test]
fn test_configuration_is_logged_at_debug_level() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("resolute.json");
    let logs = dir.path().join("logs");
    fs::write(
        &config,
        r#"{
            "registration": { "outputDirectory": "reg", "outputPrefix": "" },
            "fusion": { "mask": "mask.nii.gz", "output": "pct.nii.gz" }
        }"#,
    )
    .unwrap();

    let status = resolute()
        .env("RUST_LOG", "debug")
        .arg("--json")
        .arg(&config)
        .arg("--log")
        .arg(&logs)
        .status()
        .unwrap();
    assert!(!status.success());
    let log = fs::read_to_string(logs.join("resolute.log")).unwrap();
    assert!(log.contains("Configuration:"));
    assert!(log.contains("\"outputDirectory\": \"reg\""));
}
