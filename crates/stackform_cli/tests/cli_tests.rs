//! Drives the stackform binary against a freshly initialized project.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

fn stackform(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stackform"))
        .arg("-p")
        .arg(root)
        .args(args)
        .env_remove("STACKFORM_STACK")
        .env_remove("STACKFORM_RUNTIME")
        .env_remove("STACKFORM_PROJECT")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run stackform")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn init(root: &Path) {
    let output = stackform(root, &["init", "--name", "acme"]);
    assert!(output.status.success(), "init failed: {:?}", output);
}

#[test]
fn test_init_then_validate() {
    let dir = tempdir().unwrap();
    init(dir.path());
    assert!(dir.path().join("stackform.toml").exists());
    assert!(dir.path().join("stacks/dev.yaml").exists());

    let output = stackform(dir.path(), &["validate", "--stack", "dev"]);
    assert!(output.status.success(), "validate failed: {:?}", output);
    assert!(stdout(&output).contains("is valid"));
}

#[test]
fn test_init_twice_needs_force() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["init"]);
    assert_eq!(output.status.code(), Some(2));

    let output = stackform(dir.path(), &["init", "--force"]);
    assert!(output.status.success());
}

#[test]
fn test_resolve_json() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["resolve", "--stack", "qa", "--format", "json"]);
    assert!(output.status.success(), "resolve failed: {:?}", output);

    let topics: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = topics
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["topic_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["qa.integrations.events", "qa.integrations.dead-letter"]);
    assert_eq!(topics[0]["partitions"], 1);
    assert_eq!(topics[1]["retention_ms"], 604800000);
}

#[test]
fn test_resolve_rejects_path_like_stack() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["resolve", "--stack", "../x"]);
    assert_eq!(output.status.code(), Some(3));

    let output = stackform(dir.path(), &["render", "--stack", "../x"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_render_writes_terraform_json() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let out = dir.path().join("rendered");
    let output = stackform(dir.path(), &["render", "--stack", "dev", "--out", out.to_str().unwrap()]);
    assert!(output.status.success(), "render failed: {:?}", output);

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(out.join("main.tf.json")).unwrap()).unwrap();
    let topics = doc["resource"]["aiven_kafka_topic"].as_object().unwrap();
    assert_eq!(topics.len(), 2);
    assert!(doc["resource"].get("google_pubsub_topic").is_none());
    assert_eq!(doc["output"]["stack"]["value"], "dev");
}

#[test]
fn test_render_unknown_stack() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["render", "--stack", "staging"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_plan_dry_run_prints_commands() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["plan", "--stack", "dev", "--dry-run"]);
    assert!(output.status.success(), "plan failed: {:?}", output);

    let out = stdout(&output);
    assert!(out.contains("terraform init"));
    assert!(out.contains("workspace select -or-create dev"));
    assert!(out.contains("terraform plan"));
    assert!(dir.path().join(".stackform/dev/main.tf.json").exists());
}

#[test]
fn test_protected_apply_needs_confirm() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["apply", "--stack", "production"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--confirm"));
}

#[test]
fn test_stack_for_branch() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["stack", "--branch", "refs/heads/main"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "production");

    let output = stackform(dir.path(), &["stack", "--branch", "develop", "--approval"]);
    assert_eq!(stdout(&output).trim(), "dev false");

    let output = stackform(dir.path(), &["stack", "--branch", "feature/x"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_ci_stdout_is_yaml() {
    let dir = tempdir().unwrap();
    init(dir.path());

    let output = stackform(dir.path(), &["ci", "--platform", "gitlab", "--stdout"]);
    assert!(output.status.success(), "ci failed: {:?}", output);

    let pipeline: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
    assert!(pipeline.get("stages").is_some());
    assert!(!dir.path().join(".gitlab-ci.yml").exists());
}
