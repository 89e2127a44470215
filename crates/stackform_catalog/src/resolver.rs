//! Name resolution and default merging.

use tracing::debug;

use crate::models::{Catalog, ResolvedTopic};
use crate::template;

/// Resolves catalogs against one stack.
#[derive(Debug, Clone)]
pub struct TopicResolver {
    stack: String,
    prefix: String,
}

impl TopicResolver {
    pub fn new(stack: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            prefix: prefix.into(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Resolve every topic in a catalog.
    ///
    /// Precedence is topic override, then file defaults, then the catalog's
    /// profile defaults. Output order matches input order.
    pub fn resolve(&self, catalog: &Catalog) -> Vec<ResolvedTopic> {
        catalog
            .topics
            .iter()
            .map(|loaded| {
                let effective = catalog
                    .defaults
                    .overlay(&loaded.file_defaults)
                    .overlay(&loaded.spec.settings);

                let topic_name = template::resolve_stack(&loaded.spec.name, &self.stack);
                let resource_name = template::resource_name(&self.prefix, &topic_name);
                debug!("Resolved {} -> {}", loaded.spec.name, topic_name);

                ResolvedTopic {
                    catalog: catalog.name.clone(),
                    plane: catalog.plane.clone(),
                    template: loaded.spec.name.clone(),
                    topic_name,
                    resource_name,
                    partitions: effective.partitions,
                    replication: effective.replication,
                    retention_ms: effective.retention_ms,
                    retention_bytes: effective.retention_bytes,
                    cleanup_policy: effective.cleanup_policy,
                    compression_type: effective.compression_type,
                    max_message_bytes: effective.max_message_bytes,
                    tags: catalog.tags.clone(),
                    source: loaded.source.clone(),
                }
            })
            .collect()
    }

    /// Resolve several catalogs, concatenated in order.
    pub fn resolve_all(&self, catalogs: &[Catalog]) -> Vec<ResolvedTopic> {
        catalogs.iter().flat_map(|c| self.resolve(c)).collect()
    }
}
