//! Infrastructure plan: everything one stack declares.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use stackform_catalog::{Catalog, CatalogReader, CatalogValidator, ResolvedTopic, TopicResolver};

use crate::config::{ProjectConfig, StackConfig, StateBackend};
use crate::error::{IacError, IacResult};
use crate::provider::Provider;
use crate::resources::{identifier, StackContext, TerraformResource};
use crate::{dns, kafka, org_policy, pubsub};

/// A Terraform input variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    #[serde(rename = "type")]
    pub var_type: String,
    pub description: String,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A Terraform output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Resources, variables and outputs declared for one stack.
pub struct InfraPlan {
    pub context: StackContext,
    pub backend: StateBackend,
    pub required_version: String,
    pub variables: BTreeMap<String, Variable>,
    pub outputs: BTreeMap<String, Output>,
    /// Resolved topics, in declaration order.
    pub topics: Vec<ResolvedTopic>,
    pub warnings: Vec<String>,
    resources: Vec<Box<dyn TerraformResource>>,
    addresses: HashSet<String>,
}

impl fmt::Debug for InfraPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraPlan")
            .field("stack", &self.context.stack)
            .field("resources", &self.addresses())
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InfraPlan {
    pub fn new(context: StackContext, backend: StateBackend, required_version: impl Into<String>) -> Self {
        Self {
            context,
            backend,
            required_version: required_version.into(),
            variables: BTreeMap::new(),
            outputs: BTreeMap::new(),
            topics: Vec::new(),
            warnings: Vec::new(),
            resources: Vec::new(),
            addresses: HashSet::new(),
        }
    }

    /// Load the stack file and every configured catalog, then build.
    pub fn load(project: &ProjectConfig, stack: &str) -> IacResult<Self> {
        let stack_config = project.load_stack(stack)?;
        let catalogs = CatalogReader::load_all(&project.catalogs, project.root())?;
        Self::build(project, &stack_config, stack, &catalogs)
    }

    /// Resolve, validate and declare everything for `stack`.
    ///
    /// Catalog validation errors abort the build; warnings are kept on the
    /// plan.
    pub fn build(
        project: &ProjectConfig,
        stack_config: &StackConfig,
        stack: &str,
        catalogs: &[Catalog],
    ) -> IacResult<Self> {
        let stack_check = CatalogValidator::validate_stack_name(stack);
        if !stack_check.valid {
            return Err(IacError::Validation(stack_check.errors));
        }

        let context = StackContext::new(project, stack);
        let mut plan = Self::new(
            context.clone(),
            project.backend.clone(),
            project.terraform.required_version.clone(),
        );

        let resolver = TopicResolver::new(stack, &context.prefix);
        let topics = resolver.resolve_all(catalogs);
        let validation = CatalogValidator::validate_topics(&topics);
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        if !validation.valid {
            return Err(IacError::Validation(validation.errors));
        }
        plan.warnings.extend(validation.warnings);

        for resource in kafka::declare_topics(&topics, stack_config, &context)? {
            plan.add_resource(resource)?;
        }
        for catalog in catalogs {
            let names: Vec<&str> = topics
                .iter()
                .filter(|t| t.catalog == catalog.name)
                .map(|t| t.topic_name.as_str())
                .collect();
            plan.add_output(
                format!("{}_topic_names", identifier(&catalog.name)),
                json!(names),
                Some(format!("Kafka topics declared by catalog '{}'", catalog.name)),
            );
        }
        plan.topics = topics;

        if let Some(gmail) = pubsub::declare_gmail(stack_config, &context)? {
            for resource in gmail.resources() {
                plan.add_boxed(resource)?;
            }
            for (name, value) in gmail.outputs() {
                plan.add_output(name, json!(value), None);
            }
            if gmail.uses_secret {
                plan.add_variable(
                    pubsub::WEBHOOK_SECRET_VARIABLE,
                    Variable {
                        var_type: "string".to_string(),
                        description: "Token appended to the Gmail push endpoint; empty sends none".to_string(),
                        sensitive: true,
                        default: Some(json!("")),
                    },
                );
            }
        }

        let dns = dns::declare_records(stack_config, &context);
        for record in dns.records {
            plan.add_resource(record)?;
        }
        if !dns.domains.is_empty() {
            plan.add_output("dns_domains", json!(dns.domains), None);
        }

        for policy in org_policy::declare_overrides(stack_config, &context)? {
            plan.add_resource(policy)?;
        }

        plan.add_output("stack", json!(stack), None);

        info!(
            "Built plan for stack {}: {} resources{}",
            stack,
            plan.resources.len(),
            if context.protected { " (protected)" } else { "" }
        );
        Ok(plan)
    }

    /// Add a resource; its address must be new.
    pub fn add_resource<R: TerraformResource + 'static>(&mut self, resource: R) -> IacResult<()> {
        self.add_boxed(Box::new(resource))
    }

    pub fn add_boxed(&mut self, resource: Box<dyn TerraformResource>) -> IacResult<()> {
        let address = resource.address();
        if !self.addresses.insert(address.clone()) {
            return Err(IacError::DuplicateResource(address));
        }
        self.resources.push(resource);
        Ok(())
    }

    pub fn add_variable(&mut self, name: impl Into<String>, variable: Variable) {
        self.variables.insert(name.into(), variable);
    }

    pub fn add_output(&mut self, name: impl Into<String>, value: Value, description: Option<String>) {
        self.outputs.insert(name.into(), Output { value, description });
    }

    pub fn stack(&self) -> &str {
        &self.context.stack
    }

    pub fn resources(&self) -> &[Box<dyn TerraformResource>] {
        &self.resources
    }

    pub fn addresses(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.address()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Providers used by at least one resource.
    pub fn providers(&self) -> BTreeSet<Provider> {
        self.resources.iter().map(|r| r.provider()).collect()
    }

    fn backend_json(&self) -> Value {
        match &self.backend {
            StateBackend::Local => json!({ "local": {} }),
            StateBackend::Gcs { bucket, prefix } => {
                let mut gcs = Map::new();
                gcs.insert("bucket".to_string(), json!(bucket));
                if let Some(prefix) = prefix {
                    gcs.insert("prefix".to_string(), json!(prefix));
                }
                json!({ "gcs": gcs })
            }
            StateBackend::S3 { bucket, key, region } => json!({
                "s3": { "bucket": bucket, "key": key, "region": region }
            }),
        }
    }

    /// Render the plan as one Terraform JSON document.
    pub fn to_terraform_json(&self) -> Value {
        let required_providers: BTreeMap<&str, Value> = self
            .providers()
            .into_iter()
            .map(|p| (p.as_str(), json!({ "source": p.source(), "version": p.version() })))
            .collect();

        let mut resources: BTreeMap<&str, BTreeMap<&str, Value>> = BTreeMap::new();
        for resource in &self.resources {
            resources
                .entry(resource.resource_type())
                .or_default()
                .insert(resource.name(), resource.render());
        }

        let mut document = Map::new();
        document.insert(
            "terraform".to_string(),
            json!({
                "required_version": self.required_version,
                "required_providers": required_providers,
                "backend": self.backend_json(),
            }),
        );
        if !self.variables.is_empty() {
            document.insert("variable".to_string(), json!(self.variables));
        }
        if !resources.is_empty() {
            document.insert("resource".to_string(), json!(resources));
        }
        if !self.outputs.is_empty() {
            document.insert("output".to_string(), json!(self.outputs));
        }
        Value::Object(document)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut by_type = BTreeMap::new();
        for resource in &self.resources {
            *by_type.entry(resource.resource_type().to_string()).or_insert(0) += 1;
        }
        PlanSummary {
            stack: self.context.stack.clone(),
            protected: self.context.protected,
            total: self.resources.len(),
            by_type,
            warnings: self.warnings.len(),
        }
    }
}

/// Resource counts of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub stack: String,
    pub protected: bool,
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub warnings: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Stack '{}'{}: {} resources",
            self.stack,
            if self.protected { " (protected)" } else { "" },
            self.total
        )?;
        for (resource_type, count) in &self.by_type {
            writeln!(f, "  {:<34} {}", resource_type, count)?;
        }
        if self.warnings > 0 {
            writeln!(f, "  {} warning(s)", self.warnings)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stackform_catalog::{LoadedTopic, TopicDefaults, TopicSettings, TopicSource, TopicSpec};

    use super::*;

    fn catalog(name: &str, topics: &[&str]) -> Catalog {
        let mut catalog = Catalog::new(name, TopicDefaults::integrations());
        for (index, topic) in topics.iter().enumerate() {
            catalog.topics.push(LoadedTopic {
                spec: TopicSpec::new(*topic),
                source: TopicSource {
                    file: PathBuf::from(format!("{}/kafka-topics.yaml", name)),
                    index,
                },
                file_defaults: TopicSettings::default(),
            });
        }
        catalog
    }

    fn stack_config() -> StackConfig {
        StackConfig::from_yaml(
            "aiven_project: acme\nkafka_service: kafka\ngcp_project: acme-gcp\ngmail:\n  enabled: true\n  webhook_endpoint: https://hooks.example.com\n",
            "dev",
        )
        .unwrap()
    }

    #[test]
    fn test_build_plan() {
        let project = ProjectConfig::new("clustera", "/repo");
        let catalogs = vec![catalog("integrations", &["{stack}.gmail.inbound", "{stack}.events"])];
        let plan = InfraPlan::build(&project, &stack_config(), "dev", &catalogs).unwrap();

        assert_eq!(plan.resources().len(), 5);
        assert_eq!(
            plan.providers().into_iter().collect::<Vec<_>>(),
            vec![Provider::Aiven, Provider::Google]
        );

        let doc = plan.to_terraform_json();
        assert_eq!(doc["terraform"]["required_providers"]["aiven"]["source"], "aiven/aiven");
        assert!(doc["terraform"]["required_providers"].get("cloudflare").is_none());
        assert_eq!(doc["terraform"]["backend"]["local"], json!({}));
        assert_eq!(
            doc["resource"]["aiven_kafka_topic"]["clustera-dev-gmail-inbound-topic"]["topic_name"],
            "dev.gmail.inbound"
        );
        assert_eq!(
            doc["output"]["integrations_topic_names"]["value"],
            json!(["dev.gmail.inbound", "dev.events"])
        );
        assert_eq!(doc["output"]["stack"]["value"], "dev");
        assert_eq!(doc["variable"]["gmail_webhook_secret"]["sensitive"], true);
        // plans must not stop on a missing secret
        assert_eq!(doc["variable"]["gmail_webhook_secret"]["default"], "");
    }

    #[test]
    fn test_validation_errors_abort() {
        let project = ProjectConfig::new("clustera", "/repo");
        let catalogs = vec![catalog("a", &["{stack}.events"]), catalog("b", &["{stack}.events"])];

        let err = InfraPlan::build(&project, &stack_config(), "dev", &catalogs).unwrap_err();
        match err {
            IacError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_stack_name() {
        let project = ProjectConfig::new("clustera", "/repo");
        assert!(matches!(
            InfraPlan::build(&project, &stack_config(), "bad/stack", &[]),
            Err(IacError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let project = ProjectConfig::new("clustera", "/repo");
        let mut plan = InfraPlan::build(&project, &StackConfig::for_stack("dev"), "dev", &[]).unwrap();
        let policy = org_policy::OrgPolicyOverride {
            name: "p".to_string(),
            project: "x".to_string(),
            constraint: "c".to_string(),
            protected: false,
        };

        plan.add_resource(policy.clone()).unwrap();
        assert!(matches!(plan.add_resource(policy), Err(IacError::DuplicateResource(_))));
    }

    #[test]
    fn test_summary() {
        let project = ProjectConfig::new("clustera", "/repo");
        let catalogs = vec![catalog("integrations", &["{stack}.a", "{stack}.b"])];
        let plan = InfraPlan::build(&project, &stack_config(), "production", &catalogs).unwrap();
        let summary = plan.summary();

        assert!(summary.protected);
        assert_eq!(summary.by_type["aiven_kafka_topic"], 2);
        assert_eq!(summary.by_type["google_pubsub_subscription"], 1);
        assert!(summary.to_string().contains("(protected)"));
    }

    #[test]
    fn test_backend_rendering() {
        let project = ProjectConfig::new("clustera", "/repo");
        let mut plan = InfraPlan::build(&project, &StackConfig::for_stack("dev"), "dev", &[]).unwrap();
        plan.backend = StateBackend::Gcs {
            bucket: "state".to_string(),
            prefix: None,
        };
        let doc = plan.to_terraform_json();
        assert_eq!(doc["terraform"]["backend"]["gcs"], json!({ "bucket": "state" }));
        assert!(doc.get("resource").is_none());
    }
}
