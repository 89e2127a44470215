//! Catalog validation.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::ResolvedTopic;
use crate::template;

/// Kafka's topic name length limit.
pub const MAX_TOPIC_NAME_LEN: usize = 249;

fn topic_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid topic name regex"))
}

fn stack_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid stack name regex"))
}

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validator for resolved topics.
pub struct CatalogValidator;

impl CatalogValidator {
    /// Validate a stack identifier.
    pub fn validate_stack_name(stack: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        if stack.is_empty() {
            result.add_error("Stack name cannot be empty");
        } else if !stack_name_regex().is_match(stack) {
            result.add_error(format!(
                "Stack name '{}' may only contain letters, digits, '-' and '_'",
                stack
            ));
        }
        result
    }

    /// Validate one topic in isolation.
    pub fn validate_topic(topic: &ResolvedTopic) -> ValidationResult {
        let mut result = ValidationResult::new();
        let name = &topic.topic_name;
        let at = &topic.source;

        if name.is_empty() {
            result.add_error(format!("Topic at {} has an empty name", at));
        } else if name == "." || name == ".." {
            result.add_error(format!("Topic at {} cannot be named '{}'", at, name));
        } else if name.len() > MAX_TOPIC_NAME_LEN {
            result.add_error(format!(
                "Topic '{}' ({}) is longer than {} characters",
                name, at, MAX_TOPIC_NAME_LEN
            ));
        }

        if template::has_unresolved(name) {
            result.add_error(format!(
                "Topic '{}' ({}) has an unresolved placeholder",
                name, at
            ));
        } else if !name.is_empty() && !topic_name_regex().is_match(name) {
            result.add_error(format!(
                "Topic '{}' ({}) contains characters outside [A-Za-z0-9._-]",
                name, at
            ));
        }

        if topic.partitions == 0 {
            result.add_error(format!("Topic '{}' must have at least one partition", name));
        }

        if topic.replication == 0 {
            result.add_error(format!("Topic '{}' must have a replication factor of at least 1", name));
        } else if topic.replication == 1 {
            result.add_warning(format!(
                "Topic '{}' has replication factor 1 and will not survive a broker loss",
                name
            ));
        }

        if topic.retention_ms < -1 {
            result.add_error(format!("Topic '{}' has invalid retention_ms {}", name, topic.retention_ms));
        }

        if topic.retention_bytes < -1 {
            result.add_error(format!(
                "Topic '{}' has invalid retention_bytes {}",
                name, topic.retention_bytes
            ));
        }

        if let Some(max) = topic.max_message_bytes {
            if max <= 0 {
                result.add_error(format!("Topic '{}' has invalid max_message_bytes {}", name, max));
            }
        }

        if !template::is_stack_scoped(&topic.template) {
            result.add_warning(format!(
                "Topic '{}' ({}) has no {{stack}} token and is shared by every stack on the cluster",
                name, at
            ));
        }

        result
    }

    /// Validate that resolved names are unique within the stack.
    ///
    /// Both the topic name and the derived resource name must be unique:
    /// `a.b` and `a_b` are different topics but the same resource.
    pub fn validate_unique(topics: &[ResolvedTopic]) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut by_name: HashMap<&str, &ResolvedTopic> = HashMap::new();
        let mut by_resource: HashMap<&str, &ResolvedTopic> = HashMap::new();

        for topic in topics {
            if let Some(first) = by_name.get(topic.topic_name.as_str()) {
                result.add_error(format!(
                    "Duplicate topic '{}': defined in {} (catalog '{}') and {} (catalog '{}')",
                    topic.topic_name, first.source, first.catalog, topic.source, topic.catalog
                ));
                continue;
            }
            by_name.insert(&topic.topic_name, topic);

            if let Some(first) = by_resource.get(topic.resource_name.as_str()) {
                result.add_error(format!(
                    "Topics '{}' ({}) and '{}' ({}) both map to resource '{}'",
                    first.topic_name, first.source, topic.topic_name, topic.source, topic.resource_name
                ));
                continue;
            }
            by_resource.insert(&topic.resource_name, topic);
        }

        result
    }

    /// Validate every topic and their uniqueness.
    pub fn validate_topics(topics: &[ResolvedTopic]) -> ValidationResult {
        let mut result = ValidationResult::new();
        for topic in topics {
            result.merge(Self::validate_topic(topic));
        }
        result.merge(Self::validate_unique(topics));
        result
    }
}
