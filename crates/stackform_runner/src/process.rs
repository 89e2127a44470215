//! Child process execution shared by the local and container runners.

use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::invocation::RunOptions;
use crate::runner::ExecutionResult;

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

async fn collect<R>(reader: R, stream: LogStream, echo: bool) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut output = String::new();

    while let Some(line) = lines.next_line().await? {
        if echo {
            match stream {
                LogStream::Stdout => println!("{}", line),
                LogStream::Stderr => eprintln!("{}", line),
            }
        }
        output.push_str(&line);
        output.push('\n');
    }

    Ok(output)
}

/// Spawn `cmd`, capture both streams, and enforce the timeout.
pub(crate) async fn execute(mut cmd: Command, command_line: String, options: &RunOptions) -> RunnerResult<ExecutionResult> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    debug!("Executing: {}", command_line);

    let started_at = Utc::now();
    let start = Instant::now();

    let mut child = cmd
        .spawn()
        .map_err(|e| RunnerError::ExecutionFailed(format!("Failed to spawn '{}': {}", command_line, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

    let stdout_task = tokio::spawn(collect(stdout, LogStream::Stdout, options.stream_logs));
    let stderr_task = tokio::spawn(collect(stderr, LogStream::Stderr, options.stream_logs));

    let status = if options.timeout_seconds > 0 {
        match tokio::time::timeout(Duration::from_secs(options.timeout_seconds), child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!("'{}' timed out after {}s, killing it", command_line, options.timeout_seconds);
                let _ = child.kill().await;
                return Err(RunnerError::Timeout(options.timeout_seconds));
            }
        }
    } else {
        child.wait().await?
    };

    let stdout = stdout_task
        .await
        .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))??;
    let stderr = stderr_task
        .await
        .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))??;

    // None means the process was killed by a signal
    let exit_code = status.code().map(i64::from).unwrap_or(-1);

    Ok(ExecutionResult {
        command: command_line,
        exit_code,
        stdout,
        stderr,
        started_at,
        finished_at: Utc::now(),
        duration_ms: start.elapsed().as_millis() as u64,
        dry_run: false,
    })
}

/// Run `program <args>` quietly and report whether it exited successfully.
pub(crate) async fn probe(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
