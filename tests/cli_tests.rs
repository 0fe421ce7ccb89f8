//! CLI integration tests for selfquery
//!
//! Runs the compiled binary for the help, init and config commands. Commands
//! that reach a model or the network are covered by the library tests.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_selfquery(args: &[&str], working_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_selfquery"));
    cmd.arg("--no-color").args(args).env_remove("RUST_LOG");

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    cmd.output().expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_selfquery(&["--help"], None);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Usage"));
    assert!(text.contains("ask"));
    assert!(text.contains("videos"));
    assert!(text.contains("config"));
    assert!(text.contains("init"));
}

#[test]
fn test_version_command() {
    let output = run_selfquery(&["--version"], None);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_videos_help_lists_options() {
    let output = run_selfquery(&["videos", "--help"], None);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--url"));
    assert!(text.contains("--limit"));
}

#[test]
fn test_ask_without_question_fails() {
    let output = run_selfquery(&["ask", "--file", "notes.md"], None);
    assert!(!output.status.success());
}

// =============================================================================
// Init Command Tests
// =============================================================================

#[test]
fn test_init_creates_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_selfquery(&["init"], Some(temp_dir.path()));
    assert!(output.status.success(), "{}", stderr(&output));

    let config = temp_dir.path().join("selfquery.toml");
    assert!(config.exists());
    assert!(temp_dir.path().join(".env.example").exists());
    assert!(temp_dir.path().join("data").is_dir());

    let content = fs::read_to_string(config).unwrap();
    assert!(content.contains("[retriever]"));
    assert!(content.contains("view_count"));
}

#[test]
fn test_init_keeps_existing_config_without_force() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = temp_dir.path().join("selfquery.toml");
    fs::write(&config, "# mine\n").unwrap();

    let output = run_selfquery(&["init"], Some(temp_dir.path()));
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&config).unwrap(), "# mine\n");

    let output = run_selfquery(&["init", "--force"], Some(temp_dir.path()));
    assert!(output.status.success());
    assert_ne!(fs::read_to_string(&config).unwrap(), "# mine\n");
}

// =============================================================================
// Config Command Tests
// =============================================================================

#[test]
fn test_config_without_file_shows_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_selfquery(&["config"], Some(temp_dir.path()));
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("qwen3-max"));
    assert!(text.contains("view_count"));
}

#[test]
fn test_config_validate_rejects_bad_chunking() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("selfquery.toml"),
        "[rag]\nchunk_size = 100\nchunk_overlap = 100\n",
    )
    .unwrap();

    let output = run_selfquery(&["config", "--validate"], Some(temp_dir.path()));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("chunk_overlap"), "{}", stderr(&output));
}

#[test]
fn test_config_rejects_malformed_toml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("custom.toml"), "[rag\nchunk_size = ").unwrap();

    let output = run_selfquery(&["--config", "custom.toml", "config"], Some(temp_dir.path()));
    assert!(!output.status.success());
}
