//! Cloudflare A records for cluster nodes.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::StackConfig;
use crate::provider::Provider;
use crate::resources::{name_fragment, StackContext, TerraformResource, MANAGED_BY};

pub const RESOURCE_TYPE: &str = "cloudflare_record";

const RECORD_TTL: u32 = 300;

/// A node entry that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub name: String,
    pub domain: String,
    pub ips: Vec<String>,
}

impl NodeEntry {
    /// Parse a loosely typed node entry; `None` (with a warning) when malformed.
    pub fn parse(index: usize, value: &serde_yaml::Value) -> Option<Self> {
        let Some(map) = value.as_mapping() else {
            warn!("Node at index {} is not a mapping, skipping", index);
            return None;
        };

        let text = |key: &str| {
            map.get(key)
                .and_then(|v| match v {
                    serde_yaml::Value::String(s) => Some(s.trim().to_string()),
                    serde_yaml::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|v| !v.is_empty())
        };

        let Some(name) = text("name") else {
            warn!("Node at index {} missing 'name' field, skipping", index);
            return None;
        };
        let Some(domain) = text("domain") else {
            warn!("Node '{}' missing 'domain' field, skipping", name);
            return None;
        };

        let ips: Vec<String> = map
            .get("ips")
            .and_then(|v| v.as_sequence())
            .map(|seq| {
                seq.iter()
                    .filter_map(|ip| ip.as_str())
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if ips.is_empty() {
            warn!("Node '{}' has no IPs configured, skipping", name);
            return None;
        }

        Some(Self { name, domain, ips })
    }
}

/// One `cloudflare_record` of type A.
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub name: String,
    pub zone_id: String,
    pub node: String,
    pub domain: String,
    pub address: String,
    pub comment: String,
    pub tags: Vec<String>,
    pub protected: bool,
}

impl TerraformResource for DnsRecord {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> Provider {
        Provider::Cloudflare
    }

    fn body(&self) -> Value {
        json!({
            "zone_id": self.zone_id,
            "name": self.domain,
            "type": "A",
            "content": self.address,
            "ttl": RECORD_TTL,
            "proxied": false,
            "allow_overwrite": true,
            "comment": self.comment,
            "tags": self.tags,
        })
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

/// Declared records plus the domains they cover.
#[derive(Debug, Clone, Default)]
pub struct DnsDeclaration {
    pub records: Vec<DnsRecord>,
    pub domains: Vec<String>,
}

/// Declare one A record per node IP.
///
/// Without a zone id nothing is declared.
pub fn declare_records(stack: &StackConfig, ctx: &StackContext) -> DnsDeclaration {
    let Some(zone_id) = stack.get("cloudflare_zone_id") else {
        warn!("No cloudflare_zone_id configured for stack {}, skipping DNS records", ctx.stack);
        return DnsDeclaration::default();
    };

    if stack.nodes.is_empty() {
        debug!("No nodes configured for DNS records");
        return DnsDeclaration::default();
    }

    let mut declaration = DnsDeclaration::default();

    for (index, value) in stack.nodes.iter().enumerate() {
        let Some(node) = NodeEntry::parse(index, value) else {
            continue;
        };

        for (ip_index, ip) in node.ips.iter().enumerate() {
            declaration.records.push(DnsRecord {
                name: format!(
                    "{}-dns-{}-{}-{}",
                    ctx.prefix,
                    name_fragment(&ctx.stack),
                    name_fragment(&node.name),
                    ip_index
                ),
                zone_id: zone_id.to_string(),
                node: node.name.clone(),
                domain: node.domain.clone(),
                address: ip.clone(),
                comment: format!("{} node {} (managed by {})", ctx.platform, node.name, MANAGED_BY),
                tags: vec![
                    format!("environment:{}", ctx.stack),
                    format!("managed-by:{}", MANAGED_BY),
                    format!("platform:{}", ctx.platform),
                    format!("node:{}", node.name),
                ],
                protected: ctx.protected,
            });
            debug!("A record {} -> {} (node {})", node.domain, ip, node.name);
        }

        declaration.domains.push(node.domain);
    }

    info!(
        "Declared {} DNS A records for {} nodes",
        declaration.records.len(),
        declaration.domains.len()
    );
    declaration
}
