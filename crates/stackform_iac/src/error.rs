//! Error types for IaC module.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur during IaC operations.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Project configuration not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("Stack configuration not found for '{stack}': {path}")]
    StackNotFound { stack: String, path: PathBuf },

    #[error("Missing required configuration '{key}' for stack '{stack}'")]
    MissingConfig { stack: String, key: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Catalog validation failed with {} error(s):\n  - {}", .0.len(), .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("Duplicate resource address: {0}")]
    DuplicateResource(String),

    #[error("Terraform not available: {0}")]
    TerraformNotAvailable(String),

    #[error("Terraform init failed: {0}")]
    InitFailed(String),

    #[error("Terraform workspace selection failed: {0}")]
    WorkspaceFailed(String),

    #[error("Terraform validation failed: {0}")]
    ValidationFailed(String),

    #[error("Terraform plan failed: {0}")]
    PlanFailed(String),

    #[error("Terraform apply failed: {0}")]
    ApplyFailed(String),

    #[error("Terraform destroy failed: {0}")]
    DestroyFailed(String),

    #[error("Terraform import failed: {0}")]
    ImportFailed(String),

    #[error("Terraform refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] stackform_catalog::CatalogError),

    #[error("Runner error: {0}")]
    Runner(#[from] stackform_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
