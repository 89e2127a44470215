//! # stackform_runner
//!
//! Execution of the provisioning tool for stackform.
//!
//! # Features
//!
//! - **Local Runner**: run the tool on the host with `tokio::process`
//! - **Container Runner**: run it inside an image via the docker or podman CLI
//! - **Dry-Run Mode**: log commands without executing them
//! - **Mock Runner**: scripted responses for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use stackform_runner::{LocalRunner, RunOptions, ToolInvocation, ToolRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = LocalRunner::new();
//!     let invocation = ToolInvocation::new("terraform")
//!         .args(["plan", "-input=false"])
//!         .workdir(".stackform/dev");
//!
//!     let result = runner.run(&invocation, &RunOptions::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!     Ok(())
//! }
//! ```

pub mod container;
pub mod error;
pub mod invocation;
pub mod local;
pub mod mock;
mod process;
pub mod runner;

pub use container::{ContainerRunner, ContainerRuntime, CONTAINER_WORKDIR};
pub use error::{RunnerError, RunnerResult};
pub use invocation::{RunOptions, ToolInvocation};
pub use local::LocalRunner;
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::LogStream;
pub use runner::{ExecutionResult, ToolRunner};
