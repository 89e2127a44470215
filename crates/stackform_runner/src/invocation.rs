//! Tool invocation and run options.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single command line to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Program to execute, e.g. `terraform`.
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; mounted into the container for containerized runs.
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-like rendering for logs. Environment values are not shown.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            if arg.contains(' ') || arg.is_empty() {
                line.push_str(&format!(" '{}'", arg));
            } else {
                line.push(' ');
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Run options with timeouts and output handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    /// Echo output lines as they arrive
    pub stream_logs: bool,
    /// Print the command instead of running it
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 600, // 10 minutes
            stream_logs: false,
            dry_run: false,
        }
    }
}

impl RunOptions {
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn stream(mut self) -> Self {
        self.stream_logs = true;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_spaces() {
        let invocation = ToolInvocation::new("terraform")
            .arg("plan")
            .arg("-var")
            .arg("name=with space")
            .env("TF_IN_AUTOMATION", "1");

        assert_eq!(invocation.command_line(), "terraform plan -var 'name=with space'");
    }

    #[test]
    fn test_default_options() {
        let options = RunOptions::default();
        assert_eq!(options.timeout_seconds, 600);
        assert!(!options.dry_run);
    }
}
