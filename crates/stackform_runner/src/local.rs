//! Host process runner.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{RunnerError, RunnerResult};
use crate::invocation::{RunOptions, ToolInvocation};
use crate::process;
use crate::runner::{ExecutionResult, ToolRunner};

/// Runs tools directly on the host.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for LocalRunner {
    fn name(&self) -> &str {
        "local"
    }

    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        Ok(process::probe(program, &["version"]).await)
    }

    async fn version(&self, program: &str) -> RunnerResult<String> {
        let output = Command::new(program)
            .arg("version")
            .output()
            .await
            .map_err(|e| RunnerError::ToolNotAvailable(format!("{}: {}", program, e)))?;

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn run(&self, invocation: &ToolInvocation, options: &RunOptions) -> RunnerResult<ExecutionResult> {
        let command_line = invocation.command_line();

        if options.dry_run {
            info!("[dry-run] {}", command_line);
            return Ok(ExecutionResult::dry_run(command_line));
        }

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.envs(&invocation.env);

        if let Some(dir) = &invocation.workdir {
            if !dir.is_dir() {
                return Err(RunnerError::InvalidWorkdir(dir.display().to_string()));
            }
            cmd.current_dir(dir);
        }

        process::execute(cmd, command_line, options).await
    }
}
