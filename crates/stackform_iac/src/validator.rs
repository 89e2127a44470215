//! Validation of rendered stack directories.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use stackform_runner::ToolRunner;

use crate::error::IacResult;
use crate::terraform::{TerraformRunner, TerraformValidator, ValidationReport};

/// What a directory contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedLayout {
    /// `*.tf` or `*.tf.json` files.
    Terraform,
    Unknown,
}

/// Validates rendered stack directories with Terraform.
pub struct IacValidator {
    runner: Arc<dyn ToolRunner>,
    binary: String,
}

impl IacValidator {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            binary: "terraform".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Validate a rendered directory.
    pub async fn validate(&self, dir: &Path) -> IacResult<ValidationReport> {
        info!("Validating rendered Terraform at {:?}", dir);

        match Self::detect(dir)? {
            DetectedLayout::Terraform => {
                let terraform = TerraformRunner::new(self.runner.clone()).with_binary(&self.binary);
                TerraformValidator::new(terraform).full_validate(dir).await
            }
            DetectedLayout::Unknown => {
                let mut report = ValidationReport::new();
                report.add_check("detection", false, "No Terraform files found; run `stackform render` first");
                Ok(report)
            }
        }
    }

    /// Detect whether `dir` holds Terraform configuration.
    pub fn detect(dir: &Path) -> IacResult<DetectedLayout> {
        if !dir.is_dir() {
            return Ok(DetectedLayout::Unknown);
        }

        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".tf") || name.ends_with(".tf.json") {
                return Ok(DetectedLayout::Terraform);
            }
        }

        Ok(DetectedLayout::Unknown)
    }
}
