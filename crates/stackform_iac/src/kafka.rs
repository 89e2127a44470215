//! Kafka topic declarations on Aiven.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use stackform_catalog::ResolvedTopic;

use crate::config::StackConfig;
use crate::error::IacResult;
use crate::provider::Provider;
use crate::resources::{StackContext, TerraformResource};

pub const RESOURCE_TYPE: &str = "aiven_kafka_topic";

/// One `aiven_kafka_topic` resource.
#[derive(Debug, Clone)]
pub struct KafkaTopicResource {
    pub topic: ResolvedTopic,
    pub project: String,
    pub service_name: String,
    pub tags: BTreeMap<String, String>,
    pub protected: bool,
}

impl KafkaTopicResource {
    pub fn new(topic: ResolvedTopic, project: &str, service_name: &str, ctx: &StackContext) -> Self {
        let mut tags = ctx.base_tags();
        if let Some(plane) = &topic.plane {
            tags.insert("plane".to_string(), plane.clone());
        }
        tags.extend(topic.tags.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            topic,
            project: project.to_string(),
            service_name: service_name.to_string(),
            tags,
            protected: ctx.protected,
        }
    }

    fn config(&self) -> Value {
        let t = &self.topic;
        let mut config = Map::new();
        config.insert("retention_ms".to_string(), json!(t.retention_ms.to_string()));
        config.insert("retention_bytes".to_string(), json!(t.retention_bytes.to_string()));
        config.insert("cleanup_policy".to_string(), json!(t.cleanup_policy.as_str()));
        config.insert("compression_type".to_string(), json!(t.compression_type.as_str()));
        if let Some(max) = t.max_message_bytes {
            config.insert("max_message_bytes".to_string(), json!(max.to_string()));
        }
        Value::Object(config)
    }
}

impl TerraformResource for KafkaTopicResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn name(&self) -> &str {
        &self.topic.resource_name
    }

    fn provider(&self) -> Provider {
        Provider::Aiven
    }

    fn body(&self) -> Value {
        let tags: Vec<Value> = self
            .tags
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();

        json!({
            "project": self.project,
            "service_name": self.service_name,
            "topic_name": self.topic.topic_name,
            "partitions": self.topic.partitions,
            "replication": self.topic.replication,
            "config": [self.config()],
            "tag": tags,
        })
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

/// Declare one topic resource per resolved topic.
///
/// `aiven_project` and `kafka_service` are only required when there is at
/// least one topic.
pub fn declare_topics(
    topics: &[ResolvedTopic],
    stack: &StackConfig,
    ctx: &StackContext,
) -> IacResult<Vec<KafkaTopicResource>> {
    if topics.is_empty() {
        debug!("No Kafka topics for stack {}", ctx.stack);
        return Ok(Vec::new());
    }

    let project = stack.require("aiven_project")?;
    let service = stack.require("kafka_service")?;

    let resources: Vec<_> = topics
        .iter()
        .map(|topic| {
            debug!("Declaring topic {} as {}", topic.topic_name, topic.resource_name);
            KafkaTopicResource::new(topic.clone(), project, service, ctx)
        })
        .collect();

    info!("Declared {} Kafka topics for stack {}", resources.len(), ctx.stack);
    Ok(resources)
}
