//! Error types for the catalog module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while loading or resolving topic catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Invalid catalog format in file {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error("Topic at index {index} in {path} must be a mapping with a 'name' field")]
    MissingName { path: PathBuf, index: usize },

    #[error("Unknown placeholder '{{{placeholder}}}' in name template '{template}'")]
    UnknownPlaceholder { template: String, placeholder: String },

    #[error("Invalid stack name: {0}")]
    InvalidStack(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
