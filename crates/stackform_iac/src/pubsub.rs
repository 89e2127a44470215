//! Pub/Sub resources for Gmail push notifications.
//!
//! Gmail publishes mailbox change notifications to a Pub/Sub topic. The
//! stack declares the topic, grants Gmail's push service account publish
//! rights on it, and subscribes to it either by push (webhook endpoint
//! configured) or by pull.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::error::IacResult;
use crate::provider::Provider;
use crate::resources::{reference, variable_reference, StackContext, TerraformResource};

pub const TOPIC_TYPE: &str = "google_pubsub_topic";
pub const IAM_MEMBER_TYPE: &str = "google_pubsub_topic_iam_member";
pub const SUBSCRIPTION_TYPE: &str = "google_pubsub_subscription";

/// Service account Gmail publishes notifications from.
pub const GMAIL_PUSH_SERVICE_ACCOUNT: &str = "gmail-api-push@system.gserviceaccount.com";

/// Sensitive variable holding the webhook token.
pub const WEBHOOK_SECRET_VARIABLE: &str = "gmail_webhook_secret";

/// Environment variable the webhook token is read from.
pub const WEBHOOK_SECRET_ENV: &str = "STACKFORM_GMAIL_WEBHOOK_SECRET";

const TOPIC_RETENTION: &str = "86400s";
const PUSH_RETENTION: &str = "600s";
const PULL_RETENTION: &str = "3600s";
const ACK_DEADLINE_SECONDS: u32 = 30;
const MIN_BACKOFF: &str = "10s";
const MAX_BACKOFF: &str = "600s";

fn labels(ctx: &StackContext) -> BTreeMap<String, String> {
    let mut labels = ctx.base_tags();
    labels.insert("integration".to_string(), "gmail".to_string());
    labels
}

#[derive(Debug, Clone)]
pub struct PubSubTopic {
    pub name: String,
    pub topic_name: String,
    pub project: String,
    pub labels: BTreeMap<String, String>,
    pub protected: bool,
}

impl TerraformResource for PubSubTopic {
    fn resource_type(&self) -> &'static str {
        TOPIC_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn body(&self) -> Value {
        json!({
            "name": self.topic_name,
            "project": self.project,
            "labels": self.labels,
            "message_retention_duration": TOPIC_RETENTION,
        })
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

#[derive(Debug, Clone)]
pub struct PubSubTopicIamMember {
    pub name: String,
    pub project: String,
    pub topic: String,
    pub role: String,
    pub member: String,
    pub protected: bool,
}

impl TerraformResource for PubSubTopicIamMember {
    fn resource_type(&self) -> &'static str {
        IAM_MEMBER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn body(&self) -> Value {
        json!({
            "project": self.project,
            "topic": self.topic,
            "role": self.role,
            "member": self.member,
        })
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

/// How subscribers receive messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Push { endpoint: String },
    Pull,
}

#[derive(Debug, Clone)]
pub struct PubSubSubscription {
    pub name: String,
    pub subscription_name: String,
    pub project: String,
    pub topic: String,
    pub delivery: Delivery,
    pub labels: BTreeMap<String, String>,
    pub protected: bool,
}

impl TerraformResource for PubSubSubscription {
    fn resource_type(&self) -> &'static str {
        SUBSCRIPTION_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "name": self.subscription_name,
            "project": self.project,
            "topic": self.topic,
            "ack_deadline_seconds": ACK_DEADLINE_SECONDS,
            "retain_acked_messages": false,
            "expiration_policy": [{ "ttl": "" }],
            "labels": self.labels,
        });

        match &self.delivery {
            Delivery::Push { endpoint } => {
                body["message_retention_duration"] = json!(PUSH_RETENTION);
                body["push_config"] = json!([{
                    "push_endpoint": endpoint,
                    "attributes": { "x-goog-version": "v1" },
                }]);
                body["retry_policy"] = json!([{
                    "minimum_backoff": MIN_BACKOFF,
                    "maximum_backoff": MAX_BACKOFF,
                }]);
            }
            Delivery::Pull => {
                body["message_retention_duration"] = json!(PULL_RETENTION);
            }
        }

        body
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

/// The Gmail notification pipeline of one stack.
#[derive(Debug, Clone)]
pub struct GmailPubSub {
    pub project: String,
    pub topic: PubSubTopic,
    pub publisher: PubSubTopicIamMember,
    pub subscription: PubSubSubscription,
    /// Whether the push endpoint references the webhook secret variable.
    pub uses_secret: bool,
}

impl GmailPubSub {
    pub fn resources(&self) -> Vec<Box<dyn TerraformResource>> {
        vec![
            Box::new(self.topic.clone()),
            Box::new(self.publisher.clone()),
            Box::new(self.subscription.clone()),
        ]
    }

    /// `gmail_topic_name`, `gmail_topic_path` and `gmail_subscription_name`.
    pub fn outputs(&self) -> BTreeMap<String, String> {
        let topic_name = reference(TOPIC_TYPE, &self.topic.name, "name");
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "gmail_topic_path".to_string(),
            format!("projects/{}/topics/{}", self.project, topic_name),
        );
        outputs.insert("gmail_topic_name".to_string(), topic_name);
        outputs.insert(
            "gmail_subscription_name".to_string(),
            reference(SUBSCRIPTION_TYPE, &self.subscription.name, "name"),
        );
        outputs
    }
}

/// Push endpoint with the token appended only when the secret is non-empty.
fn push_endpoint(endpoint: &str, with_token: bool) -> String {
    if !with_token {
        return endpoint.to_string();
    }
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    let secret = format!("var.{}", WEBHOOK_SECRET_VARIABLE);
    format!(
        "{endpoint}${{{secret} == \"\" ? \"\" : \"{separator}token=\"}}{}",
        variable_reference(WEBHOOK_SECRET_VARIABLE)
    )
}

/// Declare the Gmail pipeline when enabled for the stack.
pub fn declare_gmail(stack: &StackConfig, ctx: &StackContext) -> IacResult<Option<GmailPubSub>> {
    if !stack.gmail.enabled {
        debug!("Gmail integration disabled for stack {}", ctx.stack);
        return Ok(None);
    }

    let project = stack.require("gcp_project")?.to_string();
    let labels = labels(ctx);

    let topic = PubSubTopic {
        name: "integration-gmail-webhook-topic".to_string(),
        topic_name: format!("{}-integration-gmail-webhook", ctx.stack),
        project: project.clone(),
        labels: labels.clone(),
        protected: ctx.protected,
    };

    let publisher = PubSubTopicIamMember {
        name: "gmail-api-publisher".to_string(),
        project: project.clone(),
        topic: reference(TOPIC_TYPE, &topic.name, "name"),
        role: "roles/pubsub.publisher".to_string(),
        member: format!("serviceAccount:{}", GMAIL_PUSH_SERVICE_ACCOUNT),
        protected: ctx.protected,
    };

    let (delivery, uses_secret) = match stack.get("gmail_webhook_endpoint") {
        Some(endpoint) => {
            let with_token = stack.gmail.webhook_token;
            (
                Delivery::Push {
                    endpoint: push_endpoint(endpoint, with_token),
                },
                with_token,
            )
        }
        None => (Delivery::Pull, false),
    };

    let subscription = PubSubSubscription {
        name: "integration-gmail-webhook-subscription".to_string(),
        subscription_name: format!("{}-integration-gmail-webhook-sub", ctx.stack),
        project: project.clone(),
        topic: reference(TOPIC_TYPE, &topic.name, "name"),
        delivery,
        labels,
        protected: ctx.protected,
    };

    info!(
        "Declared Gmail Pub/Sub pipeline for stack {} ({} subscription)",
        ctx.stack,
        if matches!(subscription.delivery, Delivery::Push { .. }) { "push" } else { "pull" }
    );

    Ok(Some(GmailPubSub {
        project,
        topic,
        publisher,
        subscription,
        uses_secret,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> StackContext {
        StackContext {
            stack: "staging".to_string(),
            prefix: "clustera".to_string(),
            platform: "clustera".to_string(),
            protected: false,
        }
    }

    #[test]
    fn test_disabled() {
        let stack = StackConfig::from_yaml("gcp_project: acme\n", "staging").unwrap();
        assert!(declare_gmail(&stack, &ctx()).unwrap().is_none());
    }

    #[test]
    fn test_push_subscription() {
        let stack = StackConfig::from_yaml(
            "gcp_project: acme\ngmail:\n  enabled: true\n  webhook_endpoint: https://hooks.example.com/gmail\n",
            "staging",
        )
        .unwrap();
        let gmail = declare_gmail(&stack, &ctx()).unwrap().unwrap();

        assert_eq!(gmail.topic.topic_name, "staging-integration-gmail-webhook");
        assert_eq!(gmail.subscription.subscription_name, "staging-integration-gmail-webhook-sub");
        assert!(gmail.uses_secret);

        let sub = gmail.subscription.render();
        assert_eq!(
            sub["push_config"][0]["push_endpoint"],
            r#"https://hooks.example.com/gmail${var.gmail_webhook_secret == "" ? "" : "?token="}${var.gmail_webhook_secret}"#
        );
        assert_eq!(sub["push_config"][0]["attributes"]["x-goog-version"], "v1");
        assert_eq!(sub["message_retention_duration"], "600s");
        assert_eq!(sub["retry_policy"][0]["maximum_backoff"], "600s");
        assert_eq!(sub["ack_deadline_seconds"], 30);
        assert_eq!(sub["expiration_policy"][0]["ttl"], "");

        let iam = gmail.publisher.render();
        assert_eq!(iam["role"], "roles/pubsub.publisher");
        assert_eq!(iam["member"], "serviceAccount:gmail-api-push@system.gserviceaccount.com");
        assert_eq!(iam["topic"], "${google_pubsub_topic.integration-gmail-webhook-topic.name}");

        let topic = gmail.topic.render();
        assert_eq!(topic["labels"]["integration"], "gmail");
        assert_eq!(topic["message_retention_duration"], "86400s");
    }

    #[test]
    fn test_pull_subscription_without_endpoint() {
        let stack = StackConfig::from_yaml("gcp_project: acme\ngmail:\n  enabled: true\n", "staging").unwrap();
        let gmail = declare_gmail(&stack, &ctx()).unwrap().unwrap();

        assert_eq!(gmail.subscription.delivery, Delivery::Pull);
        assert!(!gmail.uses_secret);
        let sub = gmail.subscription.render();
        assert_eq!(sub["message_retention_duration"], "3600s");
        assert!(sub.get("push_config").is_none());
    }

    #[test]
    fn test_outputs() {
        let stack = StackConfig::from_yaml("gcp_project: acme\ngmail:\n  enabled: true\n", "staging").unwrap();
        let outputs = declare_gmail(&stack, &ctx()).unwrap().unwrap().outputs();
        assert_eq!(
            outputs["gmail_topic_path"],
            "projects/acme/topics/${google_pubsub_topic.integration-gmail-webhook-topic.name}"
        );
    }

    #[test]
    fn test_endpoint_without_token() {
        assert_eq!(push_endpoint("https://x/y?a=1", false), "https://x/y?a=1");
        assert_eq!(
            push_endpoint("https://x/y?a=1", true),
            r#"https://x/y?a=1${var.gmail_webhook_secret == "" ? "" : "&token="}${var.gmail_webhook_secret}"#
        );
    }

    #[test]
    fn test_gcp_project_required() {
        let stack = StackConfig::from_yaml("gmail:\n  enabled: true\n", "staging").unwrap();
        assert!(declare_gmail(&stack, &ctx()).is_err());
    }
}
