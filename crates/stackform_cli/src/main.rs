//! stackform CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Validation failure
//! - 5: IaC error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, CliError, Commands};
use stackform_catalog::CatalogError;
use stackform_iac::{Action, IacError};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const IAC_ERROR: u8 = 5;
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "stackform=debug"
    } else if cli.quiet {
        "stackform=warn"
    } else {
        "stackform=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn").add_directive(level.parse().expect("valid log directive"))
    });

    // stdout carries command output, logs go to stderr
    let result = if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    };

    if result.is_err() {
        // Logging already initialized, continue
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let project = cli.project.clone();
    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, project).await,
        Commands::Validate(args) => commands::validate::execute(args, project).await,
        Commands::Resolve(args) => commands::resolve::execute(args, project).await,
        Commands::Render(args) => commands::render::execute(args, project).await,
        Commands::Plan(args) => commands::deploy::execute(Action::Plan, args, project).await,
        Commands::Apply(args) => commands::deploy::execute(Action::Apply, args, project).await,
        Commands::Destroy(args) => commands::deploy::execute(Action::Destroy, args, project).await,
        Commands::Refresh(args) => commands::deploy::execute(Action::Refresh, args, project).await,
        Commands::Import(args) => commands::deploy::import(args, project).await,
        Commands::Stack(args) => commands::stack::execute(args, project).await,
        Commands::Ci(args) => commands::ci::execute(args, project).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn categorize_iac(e: &IacError) -> u8 {
    match e {
        IacError::Validation(_) | IacError::ValidationFailed(_) => ExitCodes::VALIDATION_FAILURE,
        IacError::ProjectNotFound(_)
        | IacError::StackNotFound { .. }
        | IacError::MissingConfig { .. }
        | IacError::InvalidConfig(_)
        | IacError::DuplicateResource(_)
        | IacError::Yaml(_)
        | IacError::Toml(_)
        | IacError::Catalog(_) => ExitCodes::INVALID_ARGS,
        IacError::Io(_) | IacError::Json(_) => ExitCodes::GENERAL_ERROR,
        _ => ExitCodes::IAC_ERROR,
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(cli) = cause.downcast_ref::<CliError>() {
            return match cli {
                CliError::ValidationFailed(_) => ExitCodes::VALIDATION_FAILURE,
                CliError::ConfirmationRequired(_) | CliError::UnmappedBranch(_) | CliError::AlreadyInitialized(_) => {
                    ExitCodes::INVALID_ARGS
                }
            };
        }
        if let Some(iac) = cause.downcast_ref::<IacError>() {
            return categorize_iac(iac);
        }
        if cause.downcast_ref::<CatalogError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("terraform") {
        ExitCodes::IAC_ERROR
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_exit_codes() {
        let validation = anyhow::Error::new(IacError::Validation(vec!["dup".to_string()]));
        assert_eq!(categorize_error(&validation), ExitCodes::VALIDATION_FAILURE);

        let missing = anyhow::Error::new(IacError::ProjectNotFound(PathBuf::from("stackform.toml")))
            .context("Failed to load project");
        assert_eq!(categorize_error(&missing), ExitCodes::INVALID_ARGS);

        let apply = anyhow::Error::new(IacError::ApplyFailed("quota exceeded".to_string()));
        assert_eq!(categorize_error(&apply), ExitCodes::IAC_ERROR);

        let confirm = anyhow::Error::new(CliError::ConfirmationRequired("production".to_string()));
        assert_eq!(categorize_error(&confirm), ExitCodes::INVALID_ARGS);

        assert_eq!(categorize_error(&anyhow::anyhow!("boom")), ExitCodes::GENERAL_ERROR);
    }
}
