//! Tool runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;
use crate::invocation::{RunOptions, ToolInvocation};

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Rendered command line
    pub command: String,
    /// Exit code from the process
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Whether the command was only printed
    pub dry_run: bool,
}

impl ExecutionResult {
    /// Result for a command that was printed but not executed.
    pub fn dry_run(command: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            command: command.into(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            dry_run: true,
        }
    }

    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs command-line tools.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Short description used in logs, e.g. `local` or `docker`.
    fn name(&self) -> &str;

    /// Check if the program can be executed.
    async fn is_available(&self, program: &str) -> RunnerResult<bool>;

    /// Get version information for the program.
    async fn version(&self, program: &str) -> RunnerResult<String>;

    /// Run an invocation to completion.
    async fn run(&self, invocation: &ToolInvocation, options: &RunOptions) -> RunnerResult<ExecutionResult>;
}
