//! Stack command - Map a branch to its stack.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use stackform_iac::EnvironmentMap;

use super::{load_project, CliError};

#[derive(Args)]
pub struct StackArgs {
    /// Branch name, with or without refs/heads/
    #[arg(short, long, env = "STACKFORM_BRANCH")]
    branch: String,

    /// Also print whether the stack requires approval
    #[arg(long)]
    approval: bool,
}

/// Prints only the stack name so pipelines can capture it.
pub async fn execute(args: StackArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;
    let map = EnvironmentMap::new(&project.branches)?;

    let mapping = map
        .mapping_for_branch(&args.branch)
        .ok_or_else(|| CliError::UnmappedBranch(args.branch.clone()))?;

    if args.approval {
        println!("{} {}", mapping.stack, mapping.requires_approval);
    } else {
        println!("{}", mapping.stack);
    }
    Ok(())
}
