//! Validate command - Validate a stack's catalogs and configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use stackform_catalog::{CatalogReader, CatalogValidator, TopicResolver};
use stackform_iac::{IacError, IacValidator, InfraPlan, TerraformWriter};

use super::deploy::{tool_runner, RuntimeArg};
use super::{load_project, CliError};

#[derive(Args)]
pub struct ValidateArgs {
    /// Stack to validate
    #[arg(short, long, env = "STACKFORM_STACK")]
    stack: String,

    /// Also render and run terraform fmt/init/validate
    #[arg(long)]
    terraform: bool,

    /// Where to run Terraform (with --terraform)
    #[arg(long, value_enum, default_value = "local", env = "STACKFORM_RUNTIME")]
    runtime: RuntimeArg,
}

pub async fn execute(args: ValidateArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;
    info!("Validating stack: {}", args.stack);

    println!("📋 Validating catalogs for stack '{}'...", args.stack);

    let mut result = CatalogValidator::validate_stack_name(&args.stack);
    let catalogs = CatalogReader::load_all(&project.catalogs, project.root())?;
    let resolver = TopicResolver::new(&args.stack, project.resource_prefix());
    let topics = resolver.resolve_all(&catalogs);
    result.merge(CatalogValidator::validate_topics(&topics));

    for catalog in &catalogs {
        println!("   📁 {} ({} topics)", catalog.name, catalog.len());
    }

    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }

    if !result.valid {
        println!("   ❌ Catalog validation failed:");
        for error in &result.errors {
            println!("      - {}", error);
        }
        return Err(CliError::ValidationFailed(result.errors.len()).into());
    }
    println!("   ✅ {} topics resolved", topics.len());

    println!("🏗️  Checking stack configuration...");
    let stack_config = project.load_stack(&args.stack)?;
    let plan = InfraPlan::build(&project, &stack_config, &args.stack, &catalogs)?;
    println!("   ✅ {} resources declared", plan.resources().len());

    if args.terraform {
        println!("🔧 Running terraform checks...");
        let dir = project.stack_output_dir(&args.stack);
        TerraformWriter::write(&plan, &dir)?;

        let runner = tool_runner(args.runtime, &project, false).await?;
        let report = IacValidator::new(runner)
            .with_binary(&project.terraform.binary)
            .validate(&dir)
            .await?;

        for check in &report.checks {
            let mark = if check.passed { "✅" } else { "❌" };
            println!("   {} {}", mark, check.name);
        }

        if !report.passed {
            return Err(IacError::ValidationFailed(report.failures().join("\n")).into());
        }
    }

    println!();
    println!("✅ Stack '{}' is valid", args.stack);
    Ok(())
}
