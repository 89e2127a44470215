//! # stackform_iac
//!
//! Resource declaration and provisioning orchestration for stackform.
//!
//! This crate turns a project (`stackform.toml`), a stack file
//! (`stacks/<stack>.yaml`) and the resolved topic catalogs into a single
//! Terraform JSON document, and drives Terraform through a
//! [`stackform_runner::ToolRunner`].
//!
//! ## Features
//!
//! - Kafka topics on Aiven, one resource per resolved topic
//! - Gmail Pub/Sub topic, publisher grant and push or pull subscription
//! - Cloudflare A records for cluster nodes
//! - Organization policy override for Google's system service accounts
//! - `prevent_destroy` on every resource of a protected stack
//! - Branch to stack mapping and CI pipeline generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stackform_iac::{Action, InfraPlan, ProjectConfig, Provisioner, TerraformRunner, TerraformWriter};
//! use stackform_runner::LocalRunner;
//!
//! # async fn run() -> stackform_iac::IacResult<()> {
//! let project = ProjectConfig::load(".")?;
//! let plan = InfraPlan::load(&project, "staging")?;
//!
//! let dir = project.stack_output_dir("staging");
//! TerraformWriter::write(&plan, &dir)?;
//!
//! let terraform = TerraformRunner::new(Arc::new(LocalRunner::new()));
//! Provisioner::new(terraform).run(&dir, "staging", &Action::Plan).await?;
//! # Ok(())
//! # }
//! ```

pub mod ci;
pub mod config;
pub mod dns;
pub mod environments;
pub mod error;
pub mod kafka;
pub mod org_policy;
pub mod plan;
pub mod provider;
pub mod provision;
pub mod pubsub;
pub mod resources;
pub mod terraform;
pub mod validator;
pub mod writer;

pub use ci::{CiGenerator, CiPlatform};
pub use config::{BranchMapping, CiSettings, GmailConfig, ProjectConfig, StackConfig, StateBackend, TerraformSettings};
pub use dns::{DnsDeclaration, DnsRecord, NodeEntry};
pub use environments::EnvironmentMap;
pub use error::{IacError, IacResult};
pub use kafka::KafkaTopicResource;
pub use org_policy::OrgPolicyOverride;
pub use plan::{InfraPlan, Output, PlanSummary, Variable};
pub use provider::Provider;
pub use provision::{Action, Provisioner};
pub use pubsub::{Delivery, GmailPubSub, WEBHOOK_SECRET_ENV, WEBHOOK_SECRET_VARIABLE};
pub use resources::{StackContext, TerraformResource, MANAGED_BY};
pub use terraform::{TerraformResult, TerraformRunner, TerraformValidator, ValidationCheck, ValidationReport, PLAN_FILE};
pub use validator::{DetectedLayout, IacValidator};
pub use writer::{TerraformWriter, MAIN_FILE};
