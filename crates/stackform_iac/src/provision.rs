//! Provisioning workflows for a rendered stack.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{IacError, IacResult};
use crate::terraform::{TerraformResult, TerraformRunner, PLAN_FILE};

/// What to do with a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Plan,
    Apply,
    Destroy,
    Refresh,
    Import { address: String, id: String },
}

impl Action {
    /// Whether the action can delete or replace live resources.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Apply | Action::Destroy)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Plan => write!(f, "plan"),
            Action::Apply => write!(f, "apply"),
            Action::Destroy => write!(f, "destroy"),
            Action::Refresh => write!(f, "refresh"),
            Action::Import { .. } => write!(f, "import"),
        }
    }
}

/// Runs init, workspace selection and the action, stopping at the first
/// failed step.
pub struct Provisioner {
    terraform: TerraformRunner,
}

impl Provisioner {
    pub fn new(terraform: TerraformRunner) -> Self {
        Self { terraform }
    }

    pub fn terraform(&self) -> &TerraformRunner {
        &self.terraform
    }

    /// Execute `action` for `stack` in its rendered directory.
    ///
    /// Returns every step's result on success.
    pub async fn run(&self, dir: &Path, stack: &str, action: &Action) -> IacResult<Vec<TerraformResult>> {
        if !self.terraform.is_dry_run() && !self.terraform.is_available().await? {
            return Err(IacError::TerraformNotAvailable(format!(
                "'{}' cannot be run by the {} runner",
                self.terraform.binary(),
                self.terraform.runner_name()
            )));
        }

        info!("Running {} for stack {}", action, stack);
        let mut steps = Vec::new();

        let init = self.terraform.init(dir).await?;
        steps.push(check(init, IacError::InitFailed)?);

        let workspace = self.terraform.workspace_select(dir, stack).await?;
        steps.push(check(workspace, IacError::WorkspaceFailed)?);

        match action {
            Action::Plan => {
                let plan = self.terraform.plan(dir, None, false).await?;
                steps.push(check(plan, IacError::PlanFailed)?);
            }
            Action::Apply => {
                let plan = self.terraform.plan(dir, Some(PLAN_FILE), false).await?;
                steps.push(check(plan, IacError::PlanFailed)?);
                let apply = self.terraform.apply(dir, Some(PLAN_FILE)).await?;
                steps.push(check(apply, IacError::ApplyFailed)?);
            }
            Action::Destroy => {
                let destroy = self.terraform.destroy(dir).await?;
                steps.push(check(destroy, IacError::DestroyFailed)?);
            }
            Action::Refresh => {
                let refresh = self.terraform.refresh(dir).await?;
                steps.push(check(refresh, IacError::RefreshFailed)?);
            }
            Action::Import { address, id } => {
                let import = self.terraform.import(dir, address, id).await?;
                steps.push(check(import, IacError::ImportFailed)?);
            }
        }

        info!("{} for stack {} completed", action, stack);
        Ok(steps)
    }
}

fn check(result: TerraformResult, fail: fn(String) -> IacError) -> IacResult<TerraformResult> {
    if result.success {
        Ok(result)
    } else {
        warn!("`{}` exited with code {}", result.command, result.exit_code);
        Err(fail(result.output))
    }
}
