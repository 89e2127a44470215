//! CI command - Generate a pipeline for the project's branch mappings.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use stackform_iac::{CiGenerator, CiPlatform};

use super::load_project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// GitHub Actions
    Github,
    /// GitLab CI
    Gitlab,
    /// Azure Pipelines
    Azure,
}

impl From<PlatformArg> for CiPlatform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Github => CiPlatform::GitHub,
            PlatformArg::Gitlab => CiPlatform::GitLab,
            PlatformArg::Azure => CiPlatform::Azure,
        }
    }
}

#[derive(Args)]
pub struct CiArgs {
    /// CI platform
    #[arg(long, value_enum)]
    platform: PlatformArg,

    /// Directory to write into (defaults to the project root)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the pipeline instead of writing it
    #[arg(long)]
    stdout: bool,
}

pub async fn execute(args: CiArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;
    let platform = CiPlatform::from(args.platform);

    if args.stdout {
        print!("{}", CiGenerator::render(platform, &project)?);
        return Ok(());
    }

    let dir = args.out.unwrap_or_else(|| project.root().to_path_buf());
    let path = CiGenerator::generate(platform, &project, &dir)?;

    println!("✅ Generated {} pipeline: {}", platform, path.display());
    println!();
    println!("Required CI secrets:");
    for name in CiGenerator::required_secrets() {
        println!("  🔑 {}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_mapping() {
        assert_eq!(CiPlatform::from(PlatformArg::Github), CiPlatform::GitHub);
        assert_eq!(CiPlatform::from(PlatformArg::Azure).file_path(), "azure-pipelines.yml");
    }
}
