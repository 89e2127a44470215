//! Containerized runner using the docker or podman CLI.
//!
//! The working directory of the invocation is bind-mounted at
//! `/workspace` and the invocation's program becomes the container
//! entrypoint, so the same `ToolInvocation` runs unchanged on the host or
//! in an image such as `hashicorp/terraform`.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::invocation::{RunOptions, ToolInvocation};
use crate::process;
use crate::runner::{ExecutionResult, ToolRunner};

/// Mount point of the invocation's working directory inside the container.
pub const CONTAINER_WORKDIR: &str = "/workspace";

/// Container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    /// Get the CLI command name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// Runs tools inside a container image.
#[derive(Debug, Clone)]
pub struct ContainerRunner {
    runtime: ContainerRuntime,
    image: String,
    tag: String,
    network: Option<String>,
}

impl ContainerRunner {
    /// Create a runner with a specific runtime.
    pub fn with_runtime(runtime: ContainerRuntime, image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            runtime,
            image: image.into(),
            tag: tag.into(),
            network: None,
        }
    }

    /// Create a runner, detecting docker or podman.
    pub async fn detect(
        preferred: Option<ContainerRuntime>,
        image: impl Into<String>,
        tag: impl Into<String>,
    ) -> RunnerResult<Self> {
        let runtime = Self::detect_runtime(preferred).await?;
        info!("Using container runtime: {}", runtime);
        Ok(Self::with_runtime(runtime, image, tag))
    }

    /// Detect available container runtime.
    pub async fn detect_runtime(preferred: Option<ContainerRuntime>) -> RunnerResult<ContainerRuntime> {
        if let Some(preferred) = preferred {
            if process::probe(preferred.command(), &["version"]).await {
                return Ok(preferred);
            }
            warn!("Preferred runtime {} not available, trying alternatives", preferred);
        }

        for runtime in [ContainerRuntime::Docker, ContainerRuntime::Podman] {
            if process::probe(runtime.command(), &["version"]).await {
                return Ok(runtime);
            }
        }

        Err(RunnerError::RuntimeNotAvailable(
            "Neither Docker nor Podman is available".to_string(),
        ))
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    /// Get the full image name with tag.
    pub fn full_image(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    fn host_path(dir: &Path) -> RunnerResult<PathBuf> {
        if !dir.is_dir() {
            return Err(RunnerError::InvalidWorkdir(dir.display().to_string()));
        }
        Ok(dir.canonicalize()?)
    }

    /// Build the runtime arguments for an invocation.
    pub fn build_run_args(&self, invocation: &ToolInvocation) -> RunnerResult<Vec<String>> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];

        args.push("--name".to_string());
        args.push(format!("stackform-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));

        if let Some(dir) = &invocation.workdir {
            let host = Self::host_path(dir)?;
            args.push("-v".to_string());
            args.push(format!("{}:{}", host.display(), CONTAINER_WORKDIR));
            args.push("-w".to_string());
            args.push(CONTAINER_WORKDIR.to_string());
        }

        for (key, value) in &invocation.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        if let Some(network) = &self.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }

        args.push("--entrypoint".to_string());
        args.push(invocation.program.clone());
        args.push(self.full_image());
        args.extend(invocation.args.iter().cloned());

        Ok(args)
    }
}

#[async_trait]
impl ToolRunner for ContainerRunner {
    fn name(&self) -> &str {
        self.runtime.command()
    }

    async fn is_available(&self, _program: &str) -> RunnerResult<bool> {
        Ok(process::probe(self.runtime.command(), &["version"]).await)
    }

    async fn version(&self, program: &str) -> RunnerResult<String> {
        let invocation = ToolInvocation::new(program).arg("version");
        let result = self.run(&invocation, &RunOptions::default().timeout(120)).await?;
        Ok(result.stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn run(&self, invocation: &ToolInvocation, options: &RunOptions) -> RunnerResult<ExecutionResult> {
        let args = self.build_run_args(invocation)?;
        // environment values stay out of the logged command line
        let command_line = format!("{} [{}] {}", self.runtime, self.full_image(), invocation.command_line());

        if options.dry_run {
            info!("[dry-run] {}", command_line);
            return Ok(ExecutionResult::dry_run(command_line));
        }

        let mut cmd = Command::new(self.runtime.command());
        cmd.args(&args);
        process::execute(cmd, command_line, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_build_run_args() {
        let dir = tempdir().unwrap();
        let runner = ContainerRunner::with_runtime(ContainerRuntime::Docker, "hashicorp/terraform", "1.6");
        let invocation = ToolInvocation::new("terraform")
            .args(["plan", "-input=false"])
            .workdir(dir.path())
            .env("TF_IN_AUTOMATION", "1");

        let args = runner.build_run_args(&invocation).unwrap();

        assert_eq!(args[0], "run");
        assert!(args.contains(&"--rm".to_string()));
        assert!(args.contains(&"TF_IN_AUTOMATION=1".to_string()));
        assert!(args.iter().any(|a| a.ends_with(":/workspace")));

        let image_pos = args.iter().position(|a| a == "hashicorp/terraform:1.6").unwrap();
        assert_eq!(args[image_pos - 1], "terraform");
        assert_eq!(args[image_pos - 2], "--entrypoint");
        assert_eq!(&args[image_pos + 1..], &["plan".to_string(), "-input=false".to_string()]);
    }

    #[test]
    fn test_missing_workdir_is_rejected() {
        let runner = ContainerRunner::with_runtime(ContainerRuntime::Podman, "hashicorp/terraform", "1.6");
        let invocation = ToolInvocation::new("terraform").workdir("/definitely/not/here");
        assert!(matches!(
            runner.build_run_args(&invocation),
            Err(RunnerError::InvalidWorkdir(_))
        ));
    }

    #[tokio::test]
    async fn test_dry_run() {
        let dir = tempdir().unwrap();
        let runner = ContainerRunner::with_runtime(ContainerRuntime::Docker, "hashicorp/terraform", "1.6");
        let invocation = ToolInvocation::new("terraform").arg("init").workdir(dir.path());

        let result = runner
            .run(&invocation, &RunOptions::default().dry_run(true))
            .await
            .unwrap();
        assert!(result.dry_run);
        assert!(result.command.contains("terraform init"));
    }
}
