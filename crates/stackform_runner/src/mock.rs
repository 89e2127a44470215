//! Mock tool runner for testing.
//!
//! Provides a configurable mock implementation of the ToolRunner trait
//! for use in tests without a real Terraform binary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::invocation::{RunOptions, ToolInvocation};
use crate::runner::{ExecutionResult, ToolRunner};

/// Predefined mock response for an invocation.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub dry_run: bool,
}

impl CapturedCall {
    /// First argument, i.e. the tool subcommand.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Mock tool runner for testing.
///
/// Records every invocation and replays scripted responses in order,
/// wrapping around when it runs out.
#[derive(Clone, Default)]
pub struct MockRunner {
    available: Arc<RwLock<Option<bool>>>,
    responses: Arc<RwLock<Vec<MockResponse>>>,
    response_index: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the tool reports as available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = Some(available);
        self
    }

    /// Add a mock response for the next run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every run call fail with `ExecutionFailed`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Subcommands in call order.
    pub fn subcommands(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .filter_map(|c| c.subcommand().map(str::to_string))
            .collect()
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses[index % responses.len()].clone()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self, _program: &str) -> RunnerResult<bool> {
        Ok(self.available.read().unwrap_or(true))
    }

    async fn version(&self, program: &str) -> RunnerResult<String> {
        Ok(format!("{} v0.0.0-mock", program))
    }

    async fn run(&self, invocation: &ToolInvocation, options: &RunOptions) -> RunnerResult<ExecutionResult> {
        self.captured_calls.write().push(CapturedCall {
            program: invocation.program.clone(),
            args: invocation.args.clone(),
            workdir: invocation.workdir.clone(),
            env: invocation.env.clone(),
            dry_run: options.dry_run,
        });

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(message));
        }

        if options.dry_run {
            return Ok(ExecutionResult::dry_run(invocation.command_line()));
        }

        let response = self.next_response();
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            command: invocation.command_line(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
            dry_run: false,
        })
    }
}
