//! CLI command definitions.
//!
//! This module defines the command structure for the stackform CLI.
//! Each subcommand maps to one step of the catalog-to-infrastructure flow.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use thiserror::Error;

use stackform_iac::ProjectConfig;

pub mod ci;
pub mod deploy;
pub mod init;
pub mod render;
pub mod resolve;
pub mod stack;
pub mod validate;

/// stackform - Kafka topic catalogs and cloud glue as Terraform stacks
#[derive(Parser)]
#[command(name = "stackform")]
#[command(version, about = "stackform - Kafka topic catalogs and cloud glue as Terraform stacks")]
#[command(long_about = r#"
stackform reads YAML topic catalogs, resolves them against a deployment
stack, and renders the stack's Kafka topics, Gmail Pub/Sub pipeline, DNS
records and policy overrides as one Terraform JSON document.

WORKFLOWS:
  init      → Create stackform.toml, a dev stack and an example catalog
  validate  → Load, resolve and validate a stack's catalogs
  resolve   → Print the resolved topics of a stack
  render    → Write the stack's Terraform JSON
  plan      → Render, then terraform plan
  apply     → Render, then terraform apply
  destroy   → Render, then terraform destroy
  import    → Adopt an existing object into a stack's state
  refresh   → Reconcile a stack's state with reality
  stack     → Print the stack mapped to a branch
  ci        → Generate a CI pipeline

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Validation failure
  5 - IaC error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root (defaults to the nearest directory with stackform.toml)
    #[arg(short, long, global = true, env = "STACKFORM_PROJECT")]
    pub project: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "STACKFORM_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new stackform project
    Init(init::InitArgs),

    /// Validate a stack's catalogs and configuration
    Validate(validate::ValidateArgs),

    /// Print the resolved topics of a stack
    Resolve(resolve::ResolveArgs),

    /// Render a stack to Terraform JSON
    Render(render::RenderArgs),

    /// Render and plan a stack
    Plan(deploy::DeployArgs),

    /// Render and apply a stack
    Apply(deploy::DeployArgs),

    /// Render and destroy a stack
    Destroy(deploy::DeployArgs),

    /// Refresh a stack's state without changing infrastructure
    Refresh(deploy::DeployArgs),

    /// Import an existing object into a stack's state
    Import(deploy::ImportArgs),

    /// Print the stack mapped to a branch
    Stack(stack::StackArgs),

    /// Generate a CI pipeline
    Ci(ci::CiArgs),
}

/// Errors raised by the CLI itself.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Validation failed with {0} error(s)")]
    ValidationFailed(usize),

    #[error("Stack '{0}' is protected; pass --confirm to proceed")]
    ConfirmationRequired(String),

    #[error("No stack is mapped to branch '{0}'")]
    UnmappedBranch(String),

    #[error("Project already initialized at {0}; use --force to overwrite")]
    AlreadyInitialized(PathBuf),
}

/// Locate and load the project configuration.
pub fn load_project(project: Option<&Path>) -> Result<ProjectConfig> {
    let root = match project {
        Some(dir) => dir.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()?;
            ProjectConfig::find_root(&cwd).ok_or_else(|| {
                anyhow!(
                    "No {} found in {} or any parent directory",
                    ProjectConfig::FILE_NAME,
                    cwd.display()
                )
            })?
        }
    };

    ProjectConfig::load(&root).with_context(|| format!("Failed to load project at {}", root.display()))
}
