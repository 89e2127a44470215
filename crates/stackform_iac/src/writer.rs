//! Writes rendered plans to disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::IacResult;
use crate::plan::InfraPlan;

/// Name of the rendered Terraform document.
pub const MAIN_FILE: &str = "main.tf.json";

const GITIGNORE: &str = r#"# Terraform gitignore

# Local .terraform directories
**/.terraform/*

# .tfstate files
*.tfstate
*.tfstate.*

# Saved plans
*.tfplan

# Crash log files
crash.log
crash.*.log

# Exclude all .tfvars files, which are likely to contain sensitive data
*.tfvars
*.tfvars.json
"#;

/// Writer for a stack's Terraform directory.
pub struct TerraformWriter;

impl TerraformWriter {
    /// Write `main.tf.json`, `.gitignore` and `.terraform-version` into `dir`.
    ///
    /// Rendering the same plan twice produces identical files.
    pub fn write(plan: &InfraPlan, dir: impl AsRef<Path>) -> IacResult<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let document = plan.to_terraform_json();
        let mut content = serde_json::to_string_pretty(&document)?;
        content.push('\n');

        let main = dir.join(MAIN_FILE);
        fs::write(&main, content)?;
        debug!("Wrote {:?}", main);

        fs::write(dir.join(".gitignore"), GITIGNORE)?;
        fs::write(
            dir.join(".terraform-version"),
            format!("{}\n", pinned_version(&plan.required_version)),
        )?;

        info!(
            "Rendered {} resources for stack {} into {}",
            plan.resources().len(),
            plan.stack(),
            dir.display()
        );
        Ok(main)
    }
}

/// Version for `.terraform-version` from a constraint like `>= 1.6.0`.
fn pinned_version(constraint: &str) -> String {
    let version = constraint
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    if version.is_empty() {
        "latest".to_string()
    } else {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectConfig, StackConfig};
    use tempfile::tempdir;

    #[test]
    fn test_write_is_deterministic() {
        let dir = tempdir().unwrap();
        let project = ProjectConfig::new("clustera", dir.path());
        let plan = InfraPlan::build(&project, &StackConfig::for_stack("dev"), "dev", &[]).unwrap();

        let main = TerraformWriter::write(&plan, dir.path().join("out")).unwrap();
        let first = fs::read_to_string(&main).unwrap();
        TerraformWriter::write(&plan, dir.path().join("out")).unwrap();
        let second = fs::read_to_string(&main).unwrap();

        assert_eq!(first, second);
        assert!(dir.path().join("out/.gitignore").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("out/.terraform-version")).unwrap(),
            "1.6.0\n"
        );
    }

    #[test]
    fn test_pinned_version() {
        assert_eq!(pinned_version(">= 1.6.0"), "1.6.0");
        assert_eq!(pinned_version("~> 1.7, < 2.0"), "1.7");
        assert_eq!(pinned_version(""), "latest");
    }
}
