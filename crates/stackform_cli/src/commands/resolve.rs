//! Resolve command - Print a stack's resolved topics.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use stackform_catalog::{CatalogReader, CatalogValidator, ResolvedTopic, TopicResolver};

use super::{load_project, CliError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Stack to resolve against
    #[arg(short, long, env = "STACKFORM_STACK")]
    stack: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Only topics of this catalog
    #[arg(short, long)]
    catalog: Option<String>,
}

pub async fn execute(args: ResolveArgs, project: Option<PathBuf>) -> Result<()> {
    let project = load_project(project.as_deref())?;

    let stack_check = CatalogValidator::validate_stack_name(&args.stack);
    if !stack_check.valid {
        for error in &stack_check.errors {
            eprintln!("   ❌ {}", error);
        }
        return Err(CliError::ValidationFailed(stack_check.errors.len()).into());
    }

    let catalogs = CatalogReader::load_all(&project.catalogs, project.root())?;
    let topics = TopicResolver::new(&args.stack, project.resource_prefix()).resolve_all(&catalogs);

    let result = CatalogValidator::validate_topics(&topics);
    if !result.valid {
        for error in &result.errors {
            eprintln!("   ❌ {}", error);
        }
        return Err(CliError::ValidationFailed(result.errors.len()).into());
    }

    let topics: Vec<ResolvedTopic> = match &args.catalog {
        Some(name) => topics.into_iter().filter(|t| &t.catalog == name).collect(),
        None => topics,
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&topics)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&topics)?),
        OutputFormat::Table => print!("{}", table(&topics)),
    }

    Ok(())
}

fn table(topics: &[ResolvedTopic]) -> String {
    let width = topics
        .iter()
        .map(|t| t.topic_name.len())
        .max()
        .unwrap_or(0)
        .max("TOPIC".len());

    let mut out = format!(
        "{:<width$}  {:>10}  {:>11}  {:>13}  {:<14}  {}\n",
        "TOPIC", "PARTITIONS", "REPLICATION", "RETENTION_MS", "CLEANUP", "CATALOG"
    );
    for t in topics {
        out.push_str(&format!(
            "{:<width$}  {:>10}  {:>11}  {:>13}  {:<14}  {}\n",
            t.topic_name,
            t.partitions,
            t.replication,
            t.retention_ms,
            t.cleanup_policy.as_str(),
            t.catalog
        ));
    }
    out
}
