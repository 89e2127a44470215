//! Render command - Write a stack's Terraform JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use stackform_iac::{InfraPlan, TerraformWriter};

use super::load_project;

#[derive(Args)]
pub struct RenderArgs {
    /// Stack to render
    #[arg(short, long, env = "STACKFORM_STACK")]
    stack: String,

    /// Output directory (defaults to .stackform/<stack>)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the document instead of writing it
    #[arg(long)]
    stdout: bool,
}

pub async fn execute(args: RenderArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;
    let plan = InfraPlan::load(&project, &args.stack)?;

    for warning in &plan.warnings {
        eprintln!("⚠️  {}", warning);
    }

    if args.stdout {
        println!("{}", serde_json::to_string_pretty(&plan.to_terraform_json())?);
        return Ok(());
    }

    let dir = args.out.unwrap_or_else(|| project.stack_output_dir(&args.stack));
    let path = TerraformWriter::write(&plan, &dir)?;
    info!("Rendered stack {} to {:?}", args.stack, path);

    println!("📦 {}", plan.summary());
    println!("✅ Wrote {}", path.display());
    Ok(())
}
