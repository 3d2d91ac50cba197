use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn gfss_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("gfss");
    path
}

/// Writes a config whose base URL points at a closed local port, so any
/// request that reaches the network fails fast.
fn setup_test_env(api_key: Option<&str>) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("notes.txt"), "hello").unwrap();

    let key_line = api_key
        .map(|k| format!("api_key = \"{}\"\n", k))
        .unwrap_or_default();
    let config_content = format!(
        r#"[client]
base_url = "http://127.0.0.1:9/"
request_timeout_secs = 5
{}
[polling]
interval_ms = 10
timeout_ms = 1000
"#,
        key_line
    );

    let config_path = config_dir.join("gfss.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_gfss(dir: &Path, config_path: &Path, args: &[&str]) -> (String, String, i32) {
    let binary = gfss_binary();
    let output = Command::new(&binary)
        .current_dir(dir)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run gfss binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

#[test]
fn test_missing_api_key_exits_one() {
    let (tmp, config) = setup_test_env(None);
    let (_, stderr, code) = run_gfss(tmp.path(), &config, &["store", "list"]);

    assert_eq!(code, 1);
    let line = stderr.lines().last().unwrap();
    assert!(line.starts_with("Error: "), "stderr: {}", stderr);
    assert!(line.contains("GEMINI_API_KEY"), "stderr: {}", stderr);
}

#[test]
fn test_api_key_from_environment_is_used() {
    let (tmp, config) = setup_test_env(None);
    let output = Command::new(gfss_binary())
        .current_dir(tmp.path())
        .env_remove("GEMINI_API_KEY")
        .env("GOOGLE_API_KEY", "test-key")
        .arg("--config")
        .arg(&config)
        .args(["store", "list"])
        .output()
        .unwrap();

    // The key is found, so the failure is the unreachable server instead.
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("no API key"), "stderr: {}", stderr);
    assert!(stderr.contains("transport error"), "stderr: {}", stderr);
}

#[test]
fn test_missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, code) = run_gfss(tmp.path(), &missing, &["store", "list"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_meta_rejected_before_upload() {
    let (tmp, config) = setup_test_env(Some("test-key"));
    let (stdout, stderr, code) = run_gfss(
        tmp.path(),
        &config,
        &[
            "doc",
            "upload",
            "fileSearchStores/s1",
            "notes.txt",
            "--meta",
            "novalue",
        ],
    );

    assert_eq!(code, 1);
    assert!(stderr.contains("expected key=value"), "stderr: {}", stderr);
    assert!(!stdout.contains("Uploading"));
}

#[test]
fn test_unreachable_remote_is_one_line_error() {
    let (tmp, config) = setup_test_env(Some("test-key"));
    let (_, stderr, code) = run_gfss(
        tmp.path(),
        &config,
        &["query", "--store", "fileSearchStores/s1", "what is this?"],
    );

    assert_eq!(code, 1);
    let errors: Vec<&str> = stderr.lines().filter(|l| l.starts_with("Error:")).collect();
    assert_eq!(errors.len(), 1, "stderr: {}", stderr);
}

#[test]
fn test_query_requires_store() {
    let (tmp, config) = setup_test_env(Some("test-key"));
    let (_, stderr, code) = run_gfss(tmp.path(), &config, &["query", "hello"]);

    assert_eq!(code, 1);
    let lines: Vec<&str> = stderr.lines().collect();
    assert_eq!(lines.len(), 1, "stderr: {}", stderr);
    assert!(lines[0].starts_with("Error: "), "stderr: {}", stderr);
    assert!(lines[0].contains("--store"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_subcommand_exits_one() {
    let (tmp, config) = setup_test_env(Some("test-key"));
    let (_, stderr, code) = run_gfss(tmp.path(), &config, &["frobnicate"]);

    assert_eq!(code, 1);
    assert!(stderr.starts_with("Error: "), "stderr: {}", stderr);
}

#[test]
fn test_help_still_exits_zero() {
    let (tmp, config) = setup_test_env(None);
    let (stdout, _, code) = run_gfss(tmp.path(), &config, &["--help"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("Usage"));
}
