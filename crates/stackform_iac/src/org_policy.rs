//! Project-level organization policy overrides.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::error::IacResult;
use crate::provider::Provider;
use crate::resources::{StackContext, TerraformResource};

pub const RESOURCE_TYPE: &str = "google_org_policy_policy";

/// Constraint that restricts IAM members to allowed domains.
pub const ALLOWED_MEMBER_DOMAINS: &str = "iam.allowedPolicyMemberDomains";

/// Allow-all override of one constraint on a project.
#[derive(Debug, Clone)]
pub struct OrgPolicyOverride {
    pub name: String,
    pub project: String,
    pub constraint: String,
    pub protected: bool,
}

impl TerraformResource for OrgPolicyOverride {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn body(&self) -> Value {
        json!({
            "name": format!("projects/{}/policies/{}", self.project, self.constraint),
            "parent": format!("projects/{}", self.project),
            "spec": [{
                "rules": [{ "allow_all": "TRUE" }],
            }],
        })
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

/// Lift the member-domain restriction so Gmail's push account can be granted
/// publish rights.
pub fn declare_overrides(stack: &StackConfig, ctx: &StackContext) -> IacResult<Vec<OrgPolicyOverride>> {
    if !stack.org_policy_override {
        debug!("No org policy overrides for stack {}", ctx.stack);
        return Ok(Vec::new());
    }

    let project = stack.require("gcp_project")?;
    info!("Declared {} override on project {}", ALLOWED_MEMBER_DOMAINS, project);

    Ok(vec![OrgPolicyOverride {
        name: "iam-allowed-policy-member-domains".to_string(),
        project: project.to_string(),
        constraint: ALLOWED_MEMBER_DOMAINS.to_string(),
        protected: ctx.protected,
    }])
}
