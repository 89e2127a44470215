//! Topic name templating.
//!
//! Name templates use `{placeholder}` tokens. `{stack}` is substituted at
//! resolution time; `{transport}` and `{node}` only exist inside
//! `transport_node_topics` and are substituted while the file is expanded.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CatalogError, CatalogResult};

pub const STACK_TOKEN: &str = "{stack}";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"))
}

/// Placeholder names appearing in a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Whether the template contains the stack token.
pub fn is_stack_scoped(template: &str) -> bool {
    template.contains(STACK_TOKEN)
}

/// Whether a resolved name still carries a `{...}` placeholder.
pub fn has_unresolved(name: &str) -> bool {
    placeholder_regex().is_match(name)
}

/// Expand a transport/node template, leaving `{stack}` in place.
pub fn expand_transport_node(template: &str, transport: &str, node: &str) -> CatalogResult<String> {
    for name in placeholders(template) {
        if !matches!(name, "stack" | "transport" | "node") {
            return Err(CatalogError::UnknownPlaceholder {
                template: template.to_string(),
                placeholder: name.to_string(),
            });
        }
    }

    Ok(template
        .replace("{transport}", transport)
        .replace("{node}", node))
}

/// Substitute the stack identifier into a name template.
pub fn resolve_stack(template: &str, stack: &str) -> String {
    template.replace(STACK_TOKEN, stack)
}

/// Turn a topic name into something usable as a resource identifier.
pub fn sanitize(name: &str) -> String {
    name.replace(['.', '_'], "-")
}

/// Logical resource name for a topic: `{prefix}-{sanitized}-topic`.
pub fn resource_name(prefix: &str, topic_name: &str) -> String {
    format!("{}-{}-topic", prefix, sanitize(topic_name))
}
