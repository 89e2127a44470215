//! Plan, apply, destroy, refresh and import commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use stackform_iac::{
    Action, InfraPlan, ProjectConfig, Provisioner, TerraformRunner, TerraformWriter, WEBHOOK_SECRET_ENV,
    WEBHOOK_SECRET_VARIABLE,
};
use stackform_runner::{ContainerRunner, ContainerRuntime, LocalRunner, RunOptions, ToolRunner};

use super::{load_project, CliError};

/// Where Terraform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeArg {
    /// Terraform binary on the host
    Local,
    /// Terraform image under Docker
    Docker,
    /// Terraform image under Podman
    Podman,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Stack to operate on
    #[arg(short, long, env = "STACKFORM_STACK")]
    pub stack: String,

    /// Where to run Terraform
    #[arg(long, value_enum, default_value = "local", env = "STACKFORM_RUNTIME")]
    pub runtime: RuntimeArg,

    /// Print the Terraform commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Allow apply or destroy on a protected stack
    #[arg(long)]
    pub confirm: bool,

    /// Timeout per Terraform command in seconds
    #[arg(long, default_value_t = 1800)]
    pub timeout: u64,
}

#[derive(Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub deploy: DeployArgs,

    /// Resource address, e.g. aiven_kafka_topic.clustera-dev-events-topic
    pub address: String,

    /// Provider-specific id of the existing object
    pub id: String,
}

/// Build the tool runner for a runtime choice.
pub async fn tool_runner(runtime: RuntimeArg, project: &ProjectConfig, dry_run: bool) -> Result<Arc<dyn ToolRunner>> {
    let tf = &project.terraform;
    let preferred = match runtime {
        RuntimeArg::Local => return Ok(Arc::new(LocalRunner::new())),
        RuntimeArg::Docker => ContainerRuntime::Docker,
        RuntimeArg::Podman => ContainerRuntime::Podman,
    };

    if dry_run {
        return Ok(Arc::new(ContainerRunner::with_runtime(preferred, &tf.image, &tf.tag)));
    }

    let runner = ContainerRunner::detect(Some(preferred), &tf.image, &tf.tag)
        .await
        .context("No container runtime available")?;
    Ok(Arc::new(runner))
}

/// Terraform runner carrying provider credentials and plan secrets.
pub fn terraform_runner(
    runner: Arc<dyn ToolRunner>,
    project: &ProjectConfig,
    plan: &InfraPlan,
    options: RunOptions,
) -> TerraformRunner {
    let providers = plan.providers();
    let mut terraform = TerraformRunner::new(runner)
        .with_binary(&project.terraform.binary)
        .with_options(options)
        .with_forwarded_env(providers.iter().map(|p| p.credentials_env()));

    if plan.variables.contains_key(WEBHOOK_SECRET_VARIABLE) {
        let tf_var = format!("TF_VAR_{}", WEBHOOK_SECRET_VARIABLE);
        match std::env::var(WEBHOOK_SECRET_ENV).or_else(|_| std::env::var(&tf_var)) {
            Ok(secret) => terraform = terraform.with_env(tf_var, secret),
            Err(_) => warn!(
                "{} is not set; the Gmail push endpoint will carry no token",
                WEBHOOK_SECRET_ENV
            ),
        }
    }

    terraform
}

pub async fn execute(action: Action, args: DeployArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;
    run(&project, action, &args).await
}

pub async fn import(args: ImportArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;
    let action = Action::Import {
        address: args.address,
        id: args.id,
    };
    run(&project, action, &args.deploy).await
}

async fn run(project: &ProjectConfig, action: Action, args: &DeployArgs) -> Result<()> {
    let stack = &args.stack;
    if action.is_destructive() && project.is_protected(stack) && !args.confirm && !args.dry_run {
        return Err(CliError::ConfirmationRequired(stack.clone()).into());
    }

    info!("Preparing {} for stack {}", action, stack);
    let plan = InfraPlan::load(project, stack)?;
    let dir = project.stack_output_dir(stack);
    TerraformWriter::write(&plan, &dir)?;

    println!("📦 {}", plan.summary());

    let runner = tool_runner(args.runtime, project, args.dry_run).await?;
    let options = RunOptions::default()
        .timeout(args.timeout)
        .stream()
        .dry_run(args.dry_run);
    let terraform = terraform_runner(runner, project, &plan, options);

    let steps = Provisioner::new(terraform).run(&dir, stack, &action).await?;

    if args.dry_run {
        println!("🔍 Dry run, commands not executed:");
        for step in &steps {
            println!("   $ {}", step.command);
        }
    } else {
        println!("✅ {} completed for stack '{}'", action, stack);
    }

    Ok(())
}
