//! Project and stack configuration.
//!
//! A project is a directory holding `stackform.toml` plus one YAML file per
//! stack under `stacks/`:
//!
//! ```toml
//! name = "clustera"
//! protected_stacks = ["production", "prod"]
//!
//! [backend]
//! type = "gcs"
//! bucket = "clustera-terraform-state"
//!
//! [[catalogs]]
//! name = "integrations"
//! path = "infrastructure/integrations"
//! recursive = true
//! profile = "integrations"
//!
//! [[branches]]
//! pattern = "main"
//! stack = "production"
//! requires_approval = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use stackform_catalog::{CatalogSource, CatalogValidator};

use crate::error::{IacError, IacResult};

/// Where the provisioning tool keeps its state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Local,
    Gcs {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
    },
    S3 {
        bucket: String,
        key: String,
        region: String,
    },
}

/// Maps a source-control branch (glob pattern) to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMapping {
    pub pattern: String,
    pub stack: String,
    /// Gate deployments to this stack behind manual approval.
    #[serde(default)]
    pub requires_approval: bool,
}

/// Terraform binary and image settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformSettings {
    pub binary: String,
    pub image: String,
    pub tag: String,
    pub required_version: String,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            image: "hashicorp/terraform".to_string(),
            tag: "1.6".to_string(),
            required_version: ">= 1.6.0".to_string(),
        }
    }
}

/// Settings for generated CI pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiSettings {
    /// Command that makes the `stackform` binary available on the CI runner.
    pub install_command: String,
    /// Job image for platforms that run in containers (GitLab).
    pub image: String,
}

impl Default for CiSettings {
    fn default() -> Self {
        Self {
            install_command: "cargo install --locked --path crates/stackform_cli".to_string(),
            image: "rust:1-bookworm".to_string(),
        }
    }
}

fn default_protected_stacks() -> Vec<String> {
    vec!["production".to_string(), "prod".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".stackform")
}

fn default_stacks_dir() -> PathBuf {
    PathBuf::from("stacks")
}

/// Contents of `stackform.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Prefix for logical resource names; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_prefix: Option<String>,
    /// Value of the `platform` tag; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default = "default_protected_stacks")]
    pub protected_stacks: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_stacks_dir")]
    pub stacks_dir: PathBuf,
    #[serde(default)]
    pub backend: StateBackend,
    #[serde(default)]
    pub terraform: TerraformSettings,
    #[serde(default)]
    pub ci: CiSettings,
    #[serde(default)]
    pub catalogs: Vec<CatalogSource>,
    #[serde(default)]
    pub branches: Vec<BranchMapping>,
    #[serde(skip)]
    root: PathBuf,
}

impl ProjectConfig {
    /// Project file name.
    pub const FILE_NAME: &'static str = "stackform.toml";

    /// Create an in-memory project rooted at `root`.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            resource_prefix: None,
            platform: None,
            protected_stacks: default_protected_stacks(),
            output_dir: default_output_dir(),
            stacks_dir: default_stacks_dir(),
            backend: StateBackend::default(),
            terraform: TerraformSettings::default(),
            ci: CiSettings::default(),
            catalogs: Vec::new(),
            branches: Vec::new(),
            root: root.into(),
        }
    }

    /// Check if a project exists at the given path.
    pub fn exists(root: impl AsRef<Path>) -> bool {
        root.as_ref().join(Self::FILE_NAME).exists()
    }

    /// Find the project root by walking up the directory tree.
    pub fn find_root(start_path: impl AsRef<Path>) -> Option<PathBuf> {
        let mut current = start_path.as_ref().to_path_buf();
        loop {
            if Self::exists(&current) {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load `stackform.toml` from a project root.
    pub fn load(root: impl AsRef<Path>) -> IacResult<Self> {
        let root = root.as_ref();
        let path = root.join(Self::FILE_NAME);
        if !path.exists() {
            return Err(IacError::ProjectNotFound(path));
        }

        debug!("Reading project configuration from {:?}", path);
        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content, root)
    }

    /// Parse project configuration from TOML text.
    pub fn from_toml(content: &str, root: impl Into<PathBuf>) -> IacResult<Self> {
        let mut config: ProjectConfig = toml::from_str(content)?;
        config.root = root.into();
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> IacResult<()> {
        if self.name.trim().is_empty() {
            return Err(IacError::InvalidConfig("project name cannot be empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for catalog in &self.catalogs {
            if !seen.insert(catalog.name.as_str()) {
                return Err(IacError::InvalidConfig(format!(
                    "catalog '{}' is defined more than once",
                    catalog.name
                )));
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resource_prefix(&self) -> &str {
        self.resource_prefix.as_deref().unwrap_or(&self.name)
    }

    pub fn platform(&self) -> &str {
        self.platform.as_deref().unwrap_or(&self.name)
    }

    /// Whether resources of this stack must be protected from destruction.
    pub fn is_protected(&self, stack: &str) -> bool {
        self.protected_stacks.iter().any(|s| s == stack)
    }

    pub fn stack_config_path(&self, stack: &str) -> PathBuf {
        self.root.join(&self.stacks_dir).join(format!("{}.yaml", stack))
    }

    /// Directory the stack's Terraform document is rendered into.
    pub fn stack_output_dir(&self, stack: &str) -> PathBuf {
        self.root.join(&self.output_dir).join(stack)
    }

    /// Load the configuration of one stack.
    ///
    /// The name is checked first so it cannot point outside the stacks dir.
    pub fn load_stack(&self, stack: &str) -> IacResult<StackConfig> {
        let check = CatalogValidator::validate_stack_name(stack);
        if !check.valid {
            return Err(IacError::Validation(check.errors));
        }

        let path = self.stack_config_path(stack);
        if !path.exists() {
            return Err(IacError::StackNotFound {
                stack: stack.to_string(),
                path,
            });
        }
        StackConfig::load(&path, stack)
    }
}

/// Gmail push notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    pub enabled: bool,
    /// Push endpoint; a pull subscription is declared when absent.
    pub webhook_endpoint: Option<String>,
    /// Append `?token=<secret>` to the push endpoint when the secret is set.
    pub webhook_token: bool,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_endpoint: None,
            webhook_token: true,
        }
    }
}

/// Contents of `stacks/<stack>.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default)]
    pub aiven_project: Option<String>,
    #[serde(default)]
    pub kafka_service: Option<String>,
    #[serde(default)]
    pub gcp_project: Option<String>,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub cloudflare_zone_id: Option<String>,
    /// Cluster nodes for DNS records; entries are validated leniently.
    #[serde(default)]
    pub nodes: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub org_policy_override: bool,
    #[serde(skip)]
    stack: String,
}

impl StackConfig {
    /// Load a stack file.
    pub fn load(path: impl AsRef<Path>, stack: &str) -> IacResult<Self> {
        let path = path.as_ref();
        debug!("Reading stack configuration from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content, stack)
    }

    /// Parse a stack file from YAML text. An empty document is valid.
    pub fn from_yaml(content: &str, stack: &str) -> IacResult<Self> {
        let config: Option<StackConfig> = serde_yaml::from_str(content)?;
        let mut config = config.unwrap_or_default();
        config.stack = stack.to_string();
        Ok(config)
    }

    /// Empty configuration for a stack.
    pub fn for_stack(stack: &str) -> Self {
        Self {
            stack: stack.to_string(),
            ..Default::default()
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Look up an optional string setting by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "aiven_project" => self.aiven_project.as_deref(),
            "kafka_service" => self.kafka_service.as_deref(),
            "gcp_project" => self.gcp_project.as_deref(),
            "cloudflare_zone_id" => self.cloudflare_zone_id.as_deref(),
            "gmail_webhook_endpoint" => self.gmail.webhook_endpoint.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Look up a setting that must be present.
    pub fn require(&self, key: &str) -> IacResult<&str> {
        self.get(key).ok_or_else(|| IacError::MissingConfig {
            stack: self.stack.clone(),
            key: key.to_string(),
        })
    }
}
