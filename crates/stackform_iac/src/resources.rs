//! Resource declaration primitives.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::config::ProjectConfig;
use crate::provider::Provider;

/// Value of the `managed_by` tag on every declared resource.
pub const MANAGED_BY: &str = "stackform";

/// Everything a declaration needs to know about the target stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackContext {
    pub stack: String,
    pub prefix: String,
    pub platform: String,
    pub protected: bool,
}

impl StackContext {
    pub fn new(project: &ProjectConfig, stack: impl Into<String>) -> Self {
        let stack = stack.into();
        Self {
            protected: project.is_protected(&stack),
            prefix: project.resource_prefix().to_string(),
            platform: project.platform().to_string(),
            stack,
        }
    }

    /// `environment`, `managed_by` and `platform`.
    pub fn base_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("environment".to_string(), self.stack.clone());
        tags.insert("managed_by".to_string(), MANAGED_BY.to_string());
        tags.insert("platform".to_string(), self.platform.clone());
        tags
    }
}

/// A single Terraform resource block.
pub trait TerraformResource: Send + Sync {
    /// Terraform resource type, e.g. `aiven_kafka_topic`.
    fn resource_type(&self) -> &'static str;

    /// Logical name, unique per resource type.
    fn name(&self) -> &str;

    fn provider(&self) -> Provider;

    /// Resource arguments, without `lifecycle`.
    fn body(&self) -> Value;

    fn protected(&self) -> bool;

    /// `type.name` address used by plan, import and state commands.
    fn address(&self) -> String {
        format!("{}.{}", self.resource_type(), self.name())
    }

    /// Body plus lifecycle rules.
    fn render(&self) -> Value {
        let mut body = self.body();
        if self.protected() {
            if let Value::Object(map) = &mut body {
                map.insert("lifecycle".to_string(), json!({ "prevent_destroy": true }));
            }
        }
        body
    }
}

/// Reference to another resource's attribute.
pub fn reference(resource_type: &str, name: &str, attribute: &str) -> String {
    format!("${{{}.{}.{}}}", resource_type, name, attribute)
}

/// Reference to an input variable.
pub fn variable_reference(name: &str) -> String {
    format!("${{var.{}}}", name)
}

/// Turn an arbitrary string into a Terraform identifier fragment.
pub fn identifier(value: &str) -> String {
    let mut out = name_fragment(value);
    if out.chars().next().map_or(true, |c| c.is_ascii_digit() || c == '-') {
        out.insert(0, '_');
    }
    out
}

/// Sanitize a value used inside a logical name that already starts with a
/// valid identifier.
pub fn name_fragment(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
