//! Terraform invocation on top of a tool runner.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use stackform_runner::{RunOptions, ToolInvocation, ToolRunner};

use crate::error::IacResult;

/// Saved plan file name inside the stack directory.
pub const PLAN_FILE: &str = "stackform.tfplan";

/// Result of a Terraform operation.
#[derive(Debug, Clone)]
pub struct TerraformResult {
    pub command: String,
    pub success: bool,
    pub output: String,
    pub exit_code: i64,
    pub dry_run: bool,
}

/// Terraform runner over any [`ToolRunner`]: host process, container or mock.
pub struct TerraformRunner {
    runner: Arc<dyn ToolRunner>,
    binary: String,
    env: BTreeMap<String, String>,
    options: RunOptions,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        let mut env = BTreeMap::new();
        env.insert("TF_IN_AUTOMATION".to_string(), "1".to_string());
        Self {
            runner,
            binary: "terraform".to_string(),
            env,
            options: RunOptions::default(),
        }
    }

    /// Set the Terraform binary name or path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Pass through host environment variables that are set.
    pub fn with_forwarded_env<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            if let Ok(value) = std::env::var(name) {
                self.env.insert(name.to_string(), value);
            }
        }
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    /// Whether the runner can execute the Terraform binary.
    pub async fn is_available(&self) -> IacResult<bool> {
        Ok(self.runner.is_available(&self.binary).await?)
    }

    /// Run terraform init.
    pub async fn init(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform init in {:?}", working_dir);
        self.run_command(working_dir, &["init", "-input=false", "-no-color"]).await
    }

    /// Select the stack's workspace, creating it when missing.
    pub async fn workspace_select(&self, working_dir: &Path, stack: &str) -> IacResult<TerraformResult> {
        info!("Selecting terraform workspace {}", stack);
        self.run_command(working_dir, &["workspace", "select", "-or-create", stack])
            .await
    }

    /// Run terraform validate.
    pub async fn validate(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform validate in {:?}", working_dir);
        self.run_command(working_dir, &["validate", "-no-color"]).await
    }

    /// Run terraform fmt check.
    pub async fn fmt_check(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform fmt check in {:?}", working_dir);
        self.run_command(working_dir, &["fmt", "-check", "-recursive"]).await
    }

    /// Run terraform plan, optionally saving it to `out`.
    pub async fn plan(&self, working_dir: &Path, out: Option<&str>, destroy: bool) -> IacResult<TerraformResult> {
        info!("Running terraform plan in {:?}", working_dir);
        let mut args = vec!["plan".to_string(), "-input=false".to_string(), "-no-color".to_string()];
        if destroy {
            args.push("-destroy".to_string());
        }
        if let Some(out) = out {
            args.push(format!("-out={}", out));
        }
        self.run_args(working_dir, args).await
    }

    /// Apply a saved plan, or auto-approve a fresh one.
    pub async fn apply(&self, working_dir: &Path, plan_file: Option<&str>) -> IacResult<TerraformResult> {
        info!("Running terraform apply in {:?}", working_dir);
        match plan_file {
            Some(file) => {
                self.run_command(working_dir, &["apply", "-input=false", "-no-color", file])
                    .await
            }
            None => {
                self.run_command(working_dir, &["apply", "-input=false", "-no-color", "-auto-approve"])
                    .await
            }
        }
    }

    /// Run terraform destroy.
    pub async fn destroy(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform destroy in {:?}", working_dir);
        self.run_command(working_dir, &["destroy", "-input=false", "-no-color", "-auto-approve"])
            .await
    }

    /// Adopt an existing object into state.
    pub async fn import(&self, working_dir: &Path, address: &str, id: &str) -> IacResult<TerraformResult> {
        info!("Importing {} as {}", id, address);
        self.run_command(working_dir, &["import", "-input=false", "-no-color", address, id])
            .await
    }

    /// Reconcile state with real infrastructure without changing it.
    pub async fn refresh(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Refreshing terraform state in {:?}", working_dir);
        self.run_command(
            working_dir,
            &["apply", "-refresh-only", "-auto-approve", "-input=false", "-no-color"],
        )
        .await
    }

    async fn run_command(&self, working_dir: &Path, args: &[&str]) -> IacResult<TerraformResult> {
        self.run_args(working_dir, args.iter().map(|s| s.to_string()).collect())
            .await
    }

    async fn run_args(&self, working_dir: &Path, args: Vec<String>) -> IacResult<TerraformResult> {
        let mut invocation = ToolInvocation::new(&self.binary).args(args).workdir(working_dir);
        for (key, value) in &self.env {
            invocation = invocation.env(key, value);
        }

        debug!("Executing {} via {} runner", invocation, self.runner.name());
        let result = self.runner.run(&invocation, &self.options).await?;

        Ok(TerraformResult {
            success: result.success(),
            output: result.combined_output(),
            exit_code: result.exit_code,
            dry_run: result.dry_run,
            command: result.command,
        })
    }
}

/// IaC validator using Terraform.
pub struct TerraformValidator {
    runner: TerraformRunner,
}

impl TerraformValidator {
    pub fn new(runner: TerraformRunner) -> Self {
        Self { runner }
    }

    /// Perform full validation of Terraform configuration.
    pub async fn full_validate(&self, working_dir: &Path) -> IacResult<ValidationReport> {
        let mut report = ValidationReport::new();

        // Check formatting
        let fmt_result = self.runner.fmt_check(working_dir).await?;
        report.add_check("format", fmt_result.success, &fmt_result.output);

        // Initialize (required before validate)
        let init_result = self.runner.init(working_dir).await?;
        if !init_result.success {
            report.add_check("init", false, &init_result.output);
            return Ok(report);
        }
        report.add_check("init", true, "Initialization successful");

        let validate_result = self.runner.validate(working_dir).await?;
        report.add_check("validate", validate_result.success, &validate_result.output);

        Ok(report)
    }
}

/// Validation report for rendered Terraform.
#[derive(Debug)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub passed: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            passed: true,
        }
    }

    pub fn add_check(&mut self, name: &str, passed: bool, message: &str) {
        if !passed {
            self.passed = false;
        }
        self.checks.push(ValidationCheck {
            name: name.to_string(),
            passed,
            message: message.to_string(),
        });
    }

    /// Messages of failed checks.
    pub fn failures(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| format!("{}: {}", c.name, c.message.trim()))
            .collect()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stackform_runner::{MockResponse, MockRunner};

    use super::*;

    fn dir() -> PathBuf {
        PathBuf::from("/tmp/stackform/dev")
    }

    #[tokio::test]
    async fn test_commands_are_non_interactive() {
        let mock = MockRunner::new();
        let terraform = TerraformRunner::new(Arc::new(mock.clone())).with_env("AIVEN_TOKEN", "t");

        terraform.init(&dir()).await.unwrap();
        terraform.plan(&dir(), Some(PLAN_FILE), false).await.unwrap();
        terraform.apply(&dir(), Some(PLAN_FILE)).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].args, vec!["init", "-input=false", "-no-color"]);
        assert_eq!(
            calls[1].args,
            vec!["plan", "-input=false", "-no-color", "-out=stackform.tfplan"]
        );
        assert_eq!(calls[2].args.last().map(String::as_str), Some(PLAN_FILE));
        assert!(calls.iter().all(|c| c.env.get("TF_IN_AUTOMATION").map(String::as_str) == Some("1")));
        assert_eq!(calls[0].env["AIVEN_TOKEN"], "t");
        assert_eq!(calls[0].workdir, Some(dir()));
    }

    #[tokio::test]
    async fn test_refresh_and_import() {
        let mock = MockRunner::new();
        let terraform = TerraformRunner::new(Arc::new(mock.clone()));

        terraform.refresh(&dir()).await.unwrap();
        terraform
            .import(&dir(), "aiven_kafka_topic.clustera-dev-events-topic", "acme/kafka/dev.events")
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(&calls[0].args[..3], &["apply", "-refresh-only", "-auto-approve"]);
        assert_eq!(calls[1].args[3], "aiven_kafka_topic.clustera-dev-events-topic");
        assert_eq!(calls[1].args[4], "acme/kafka/dev.events");
    }

    #[tokio::test]
    async fn test_full_validate_stops_after_failed_init() {
        let mock = MockRunner::new().with_responses(vec![
            MockResponse::success(""),
            MockResponse::failure(1, "provider registry unreachable"),
        ]);
        let validator = TerraformValidator::new(TerraformRunner::new(Arc::new(mock.clone())));

        let report = validator.full_validate(&dir()).await.unwrap();
        assert!(!report.passed);
        assert_eq!(report.checks.len(), 2);
        assert_eq!(mock.subcommands(), vec!["fmt", "init"]);
        assert!(report.failures()[0].contains("provider registry unreachable"));
    }
}
