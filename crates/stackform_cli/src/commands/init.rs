//! Init command - Create a new project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stackform_iac::ProjectConfig;

use super::CliError;

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to the directory name)
    #[arg(short, long)]
    name: Option<String>,

    /// Overwrite existing files
    #[arg(short, long)]
    force: bool,
}

pub async fn execute(args: InitArgs, project: Option<PathBuf>) -> Result<()> {
    let path = match project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    let name = args.name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "stackform".to_string())
    });

    info!("Initializing stackform project '{}' at {:?}", name, path);
    let created = scaffold(&path, &name, args.force)?;

    println!("✅ Project '{}' initialized", name);
    println!();
    println!("Created:");
    for file in &created {
        println!("  📄 {}", file);
    }
    println!();
    println!("Next steps:");
    println!("  stackform validate --stack dev");
    println!("  stackform render --stack dev");

    Ok(())
}

/// Write the starter files; returns their project-relative paths.
pub fn scaffold(root: &Path, name: &str, force: bool) -> Result<Vec<String>> {
    if ProjectConfig::exists(root) && !force {
        return Err(CliError::AlreadyInitialized(root.to_path_buf()).into());
    }

    let files = [
        (ProjectConfig::FILE_NAME.to_string(), project_file(name)),
        ("stacks/dev.yaml".to_string(), STACK_FILE.to_string()),
        (
            "infrastructure/integrations/kafka-topics.yaml".to_string(),
            CATALOG_FILE.to_string(),
        ),
    ];

    let mut created = Vec::new();
    for (relative, content) in files {
        let path = root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        created.push(relative);
    }

    Ok(created)
}

fn project_file(name: &str) -> String {
    format!(
        r#"# stackform project configuration
name = "{name}"
protected_stacks = ["production", "prod"]

[backend]
type = "local"

[terraform]
image = "hashicorp/terraform"
tag = "1.6"

[[catalogs]]
name = "integrations"
path = "infrastructure/integrations"
recursive = true
profile = "integrations"

[[branches]]
pattern = "main"
stack = "production"
requires_approval = true

[[branches]]
pattern = "develop"
stack = "dev"
"#
    )
}

const STACK_FILE: &str = r#"# Settings for the dev stack
aiven_project: my-aiven-project
kafka_service: kafka
gcp_project: my-gcp-project

gmail:
  enabled: false
  # webhook_endpoint: https://example.com/webhooks/gmail

# cloudflare_zone_id: your-zone-id
nodes: []

org_policy_override: false
"#;

const CATALOG_FILE: &str = r#"# Topics owned by the integrations plane.
# {stack} is replaced with the stack name at resolution time.
defaults:
  partitions: 1

topics:
  - name: "{stack}.integrations.events"
  - name: "{stack}.integrations.dead-letter"
    retention_ms: 604800000
"#;
