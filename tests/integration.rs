use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn beacon_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("beacon");
    path
}

fn setup_test_env(beacon_section: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"{}

[server]
bind = "127.0.0.1:7341"
"#,
        beacon_section
    );

    let config_path = config_dir.join("beacon.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn enabled_env() -> (TempDir, PathBuf) {
    setup_test_env(
        r#"[beacon]
enabled = true
site_shortname = "acme"
salt = "integration-salt""#,
    )
}

fn run_beacon(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = beacon_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run beacon binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_check_valid_config() {
    let (_tmp, config) = enabled_env();
    let (stdout, stderr, success) = run_beacon(&config, &["check"]);
    assert!(success, "check failed: {}", stderr);
    assert!(stdout.contains("Configuration OK"));
    assert!(stdout.contains("acme"));
    assert!(stdout.contains("90 days"));
}

#[test]
fn test_check_missing_beacon_section_fails() {
    let (_tmp, config) = setup_test_env("");
    let (_, stderr, success) = run_beacon(&config, &["check"]);
    assert!(!success);
    assert!(stderr.contains("Missing configuration"), "stderr: {}", stderr);
}

#[test]
fn test_sign_then_verify() {
    let (_tmp, config) = enabled_env();

    let (token, stderr, success) = run_beacon(&config, &["sign", "\"abc123\""]);
    assert!(success, "sign failed: {}", stderr);
    let token = token.trim();
    assert!(token.contains('.'));

    let (value, stderr, success) = run_beacon(&config, &["verify", token]);
    assert!(success, "verify failed: {}", stderr);
    assert_eq!(value.trim(), "\"abc123\"");
}

#[test]
fn test_sign_plain_string() {
    let (_tmp, config) = enabled_env();
    let (token, _, _) = run_beacon(&config, &["sign", "not json"]);
    let (value, _, success) = run_beacon(&config, &["verify", token.trim()]);
    assert!(success);
    assert_eq!(value.trim(), "\"not json\"");
}

#[test]
fn test_verify_tampered_token_fails() {
    let (_tmp, config) = enabled_env();
    let (token, _, _) = run_beacon(&config, &["sign", "\"abc123\""]);
    let mut tampered = token.trim().to_string();
    tampered.insert(0, 'X');

    let (_, stderr, success) = run_beacon(&config, &["verify", &tampered]);
    assert!(!success);
    assert!(stderr.contains("signature"), "stderr: {}", stderr);
}

#[test]
fn test_url_scenario() {
    let (_tmp, config) = enabled_env();
    let (stdout, stderr, success) = run_beacon(
        &config,
        &[
            "url",
            "--visitor",
            "abc123",
            "--referrer",
            "https://example.com/a?b=c",
            "--conversion",
            "ABC-1=19.99",
            "--conversion",
            "XYZ-2=4.50",
        ],
    );
    assert!(success, "url failed: {}", stderr);
    assert_eq!(
        stdout.trim(),
        "https://www.whitechipmunk.com/acme?uid=abc123\
         &referer=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc\
         &sku0=ABC-1&conversionvalue0=19.99&sku1=XYZ-2&conversionvalue1=4.50"
    );
}

#[test]
fn test_url_without_referrer() {
    let (_tmp, config) = enabled_env();
    let (stdout, _, success) = run_beacon(&config, &["url", "--visitor", "abc123"]);
    assert!(success);
    assert_eq!(stdout.trim(), "https://www.whitechipmunk.com/acme?uid=abc123");
}

#[test]
fn test_url_disabled() {
    let (_tmp, config) = setup_test_env(
        r#"[beacon]
enabled = false
site_shortname = "acme"
salt = "integration-salt""#,
    );
    let (stdout, _, success) = run_beacon(&config, &["url", "--visitor", "abc123"]);
    assert!(success);
    assert_eq!(stdout.trim(), "beacon disabled");
}

#[test]
fn test_url_rejects_malformed_conversion() {
    let (_tmp, config) = enabled_env();
    let (_, stderr, success) = run_beacon(
        &config,
        &["url", "--visitor", "abc123", "--conversion", "no-equals"],
    );
    assert!(!success);
    assert!(stderr.contains("SKU=VALUE"), "stderr: {}", stderr);
}
