//! CLI integration tests
//!
//! These tests verify the command-line interface behavior, including:
//! - Command parsing and validation
//! - Output formatting
//! - Error handling
//! - Exit codes

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the console-hosting binary
fn console_hosting_bin() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // If we're in deps/, go up one more level
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("console-hosting")
}

/// Writes a complete deployment config into `dir` and returns its path
fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("deploy.yaml");
    let content = r#"stack_name: Web
account: "123456789012"
region: us-east-1
source_owner: acme
source_repository: app
source_token_secret: github-token
api_url: https://api.example.com
db_secret_arn: arn:aws:secretsmanager:us-east-1:123456789012:secret:db-AbC
anon_key_parameter: /console/anon
service_key_parameter: /console/service
"#;
    fs::write(&path, content).expect("Failed to write config");
    path
}

fn run(args: &[&str]) -> Output {
    let mut command = Command::new(console_hosting_bin());
    command.args(args);
    for (key, _) in env::vars() {
        if key.starts_with("CONSOLE_HOSTING_") {
            command.env_remove(key);
        }
    }
    command.output().expect("Failed to execute command")
}

fn run_with_config(subcommand: &str, config: &Path, extra: &[&str]) -> Output {
    let config = config.to_str().expect("utf-8 path");
    let mut args = vec![subcommand, "--config", config, "-q"];
    args.extend_from_slice(extra);
    run(&args)
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("synth"));
    assert!(stdout.contains("buildspec"));
    assert!(stdout.contains("outputs"));
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_synth_json_to_stdout() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = run_with_config("synth", &config, &[]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let template: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON template");
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    let app = template["Outputs"]["AppId"]["Value"]["Fn::GetAtt"][0]
        .as_str()
        .unwrap();
    assert_eq!(template["Resources"][app]["Type"], "AWS::Amplify::App");
}

#[test]
fn test_synth_yaml_to_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let target = dir.path().join("template.yaml");

    let output = run_with_config(
        "synth",
        &config,
        &["--format", "yaml", "-o", target.to_str().unwrap()],
    );

    assert!(output.status.success());
    let content = fs::read_to_string(&target).expect("template file should exist");
    assert!(content.contains("AWS::Amplify::Branch"));
    assert!(content.contains("ResourceGrants"));
}

#[test]
fn test_buildspec_prints_document() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = run_with_config("buildspec", &config, &["--app-root", "apps/console"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("appRoot: apps/console"));
    assert!(stdout.contains("corepack enable"));
    assert!(stdout.contains("turbo run build --filter=studio..."));
}

#[test]
fn test_outputs_json_uses_flag_branch() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = run_with_config(
        "outputs",
        &config,
        &["--branch", "release/v2", "--format", "json"],
    );

    assert!(output.status.success());
    let outputs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let app_id = outputs["app_id"].as_str().unwrap();
    assert_eq!(
        outputs["branch_url"],
        format!("https://release-v2.{}.amplifyapp.com", app_id)
    );
}

#[test]
fn test_config_shows_resolved_values() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = run_with_config("config", &config, &["--owner", "other"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("other/app"));
}

#[test]
fn test_missing_inputs_exit_nonzero() {
    let output = run(&["synth"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("account"), "stderr: {stderr}");
}

#[test]
fn test_missing_config_file_exit_nonzero() {
    let output = run(&["synth", "--config", "/nonexistent/deploy.yaml"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_format_rejected() {
    let output = run(&["synth", "--format", "dockerfile"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value"));
}
