//! Data models for topic catalogs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kafka cleanup policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CleanupPolicy {
    #[default]
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "compact,delete", alias = "delete,compact")]
    CompactDelete,
}

impl CleanupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupPolicy::Delete => "delete",
            CleanupPolicy::Compact => "compact",
            CleanupPolicy::CompactDelete => "compact,delete",
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broker-side compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[default]
    Snappy,
    Gzip,
    Lz4,
    Zstd,
    Producer,
    Uncompressed,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::Snappy => "snappy",
            CompressionType::Gzip => "gzip",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
            CompressionType::Producer => "producer",
            CompressionType::Uncompressed => "uncompressed",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional per-topic (or per-file) overrides.
///
/// Numeric fields accept plain YAML integers as well as quoted numbers,
/// since retention values are commonly written as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSettings {
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub partitions: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub replication: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub retention_ms: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub retention_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup_policy: Option<CleanupPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_type: Option<CompressionType>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub max_message_bytes: Option<i64>,
}

impl TopicSettings {
    pub fn is_empty(&self) -> bool {
        self == &TopicSettings::default()
    }
}

/// A single topic definition as written in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpec {
    /// Name template, usually containing `{stack}`.
    pub name: String,
    #[serde(flatten)]
    pub settings: TopicSettings,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: TopicSettings::default(),
        }
    }

    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.settings.partitions = Some(partitions);
        self
    }

    pub fn with_replication(mut self, replication: u32) -> Self {
        self.settings.replication = Some(replication);
        self
    }

    pub fn with_retention_ms(mut self, retention_ms: i64) -> Self {
        self.settings.retention_ms = Some(retention_ms);
        self
    }
}

/// Fully populated topic configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDefaults {
    pub partitions: u32,
    pub replication: u32,
    pub retention_ms: i64,
    pub retention_bytes: i64,
    pub cleanup_policy: CleanupPolicy,
    pub compression_type: CompressionType,
    pub max_message_bytes: Option<i64>,
}

/// 3 days.
pub const THREE_DAYS_MS: i64 = 259_200_000;
/// 7 days.
pub const SEVEN_DAYS_MS: i64 = 604_800_000;
/// 25 MB, large enough for enrichment payloads.
pub const LARGE_MESSAGE_BYTES: i64 = 26_214_400;

impl TopicDefaults {
    /// Root-level topics: wide partitioning, 5 GB retention.
    pub fn legacy() -> Self {
        Self {
            partitions: 5,
            replication: 2,
            retention_ms: THREE_DAYS_MS,
            retention_bytes: 5_368_709_120,
            cleanup_policy: CleanupPolicy::Delete,
            compression_type: CompressionType::Snappy,
            max_message_bytes: None,
        }
    }

    /// Integration topics: single partition, 600 MB retention.
    pub fn integrations() -> Self {
        Self {
            partitions: 1,
            replication: 2,
            retention_ms: THREE_DAYS_MS,
            retention_bytes: 629_145_600,
            cleanup_policy: CleanupPolicy::Delete,
            compression_type: CompressionType::Snappy,
            max_message_bytes: Some(LARGE_MESSAGE_BYTES),
        }
    }

    /// Data plane topics: replication 3, 7 days, unlimited size.
    pub fn data_plane() -> Self {
        Self {
            partitions: 1,
            replication: 3,
            retention_ms: SEVEN_DAYS_MS,
            retention_bytes: -1,
            cleanup_policy: CleanupPolicy::Delete,
            compression_type: CompressionType::Snappy,
            max_message_bytes: Some(LARGE_MESSAGE_BYTES),
        }
    }

    /// Return a copy with every field set in `overrides` replaced.
    pub fn overlay(&self, overrides: &TopicSettings) -> Self {
        Self {
            partitions: overrides.partitions.unwrap_or(self.partitions),
            replication: overrides.replication.unwrap_or(self.replication),
            retention_ms: overrides.retention_ms.unwrap_or(self.retention_ms),
            retention_bytes: overrides.retention_bytes.unwrap_or(self.retention_bytes),
            cleanup_policy: overrides.cleanup_policy.unwrap_or(self.cleanup_policy),
            compression_type: overrides.compression_type.unwrap_or(self.compression_type),
            max_message_bytes: overrides.max_message_bytes.or(self.max_message_bytes),
        }
    }
}

impl Default for TopicDefaults {
    fn default() -> Self {
        Self::integrations()
    }
}

/// Named set of built-in defaults a catalog starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultsProfile {
    Legacy,
    #[default]
    Integrations,
    DataPlane,
}

impl DefaultsProfile {
    pub fn defaults(&self) -> TopicDefaults {
        match self {
            DefaultsProfile::Legacy => TopicDefaults::legacy(),
            DefaultsProfile::Integrations => TopicDefaults::integrations(),
            DefaultsProfile::DataPlane => TopicDefaults::data_plane(),
        }
    }
}

/// Cartesian product of transports and nodes, one topic per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportNodeTopics {
    #[serde(default = "default_transport_node_template")]
    pub template: String,
    #[serde(default)]
    pub transports: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<String>,
}

pub const DEFAULT_TRANSPORT_NODE_TEMPLATE: &str = "{stack}-{transport}-responses-{node}";

fn default_transport_node_template() -> String {
    DEFAULT_TRANSPORT_NODE_TEMPLATE.to_string()
}

/// Raw shape of a `kafka-topics.yaml` file.
///
/// Entries are kept as YAML values so that malformed entries can be
/// reported with their position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub topics: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    pub shared_topics: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    pub transport_node_topics: Option<TransportNodeTopics>,
    #[serde(default)]
    pub defaults: Option<TopicSettings>,
}

/// Where a topic definition came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSource {
    pub file: PathBuf,
    pub index: usize,
}

impl fmt::Display for TopicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.display(), self.index)
    }
}

/// A topic definition together with its provenance and file-level defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTopic {
    pub spec: TopicSpec,
    pub source: TopicSource,
    pub file_defaults: TopicSettings,
}

/// One parsed and expanded catalog file.
#[derive(Debug, Clone, Default)]
pub struct CatalogDocument {
    pub path: PathBuf,
    pub defaults: TopicSettings,
    pub topics: Vec<LoadedTopic>,
}

fn default_catalog_file_name() -> String {
    "kafka-topics.yaml".to_string()
}

/// A configured catalog: where to find topic files and how to default them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Catalog identifier, used in output names.
    pub name: String,
    /// File, or directory to scan for `file_name`.
    pub path: PathBuf,
    #[serde(default = "default_catalog_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub recursive: bool,
    /// Plane tag attached to every topic in the catalog.
    #[serde(default)]
    pub plane: Option<String>,
    #[serde(default)]
    pub profile: DefaultsProfile,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl CatalogSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file_name: default_catalog_file_name(),
            recursive: false,
            plane: None,
            profile: DefaultsProfile::default(),
            tags: BTreeMap::new(),
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn with_plane(mut self, plane: impl Into<String>) -> Self {
        self.plane = Some(plane.into());
        self
    }

    pub fn with_profile(mut self, profile: DefaultsProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// All topics of one configured catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub name: String,
    pub plane: Option<String>,
    pub defaults: TopicDefaults,
    pub tags: BTreeMap<String, String>,
    pub topics: Vec<LoadedTopic>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, defaults: TopicDefaults) -> Self {
        Self {
            name: name.into(),
            plane: None,
            defaults,
            tags: BTreeMap::new(),
            topics: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }
}

/// A topic with its final name and effective configuration for one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTopic {
    pub catalog: String,
    pub plane: Option<String>,
    pub template: String,
    pub topic_name: String,
    pub resource_name: String,
    pub partitions: u32,
    pub replication: u32,
    pub retention_ms: i64,
    pub retention_bytes: i64,
    pub cleanup_policy: CleanupPolicy,
    pub compression_type: CompressionType,
    pub max_message_bytes: Option<i64>,
    pub tags: BTreeMap<String, String>,
    pub source: TopicSource,
}

mod lenient {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<IntOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(IntOrString::Int(v)) => Ok(Some(v)),
            Some(IntOrString::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("expected an integer, got '{}'", s))),
        }
    }

    pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match opt_i64(deserializer)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| de::Error::custom(format!("expected a non-negative integer, got {}", v))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_accept_quoted_numbers() {
        let yaml = r#"
name: "{stack}.events"
partitions: 3
retention_ms: "604800000"
retention_bytes: -1
cleanup_policy: compact
"#;
        let spec: TopicSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.name, "{stack}.events");
        assert_eq!(spec.settings.partitions, Some(3));
        assert_eq!(spec.settings.retention_ms, Some(SEVEN_DAYS_MS));
        assert_eq!(spec.settings.retention_bytes, Some(-1));
        assert_eq!(spec.settings.cleanup_policy, Some(CleanupPolicy::Compact));
        assert_eq!(spec.settings.replication, None);
    }

    #[test]
    fn test_settings_reject_garbage_numbers() {
        let yaml = "name: t\nretention_ms: three-days\n";
        assert!(serde_yaml::from_str::<TopicSpec>(yaml).is_err());

        let yaml = "name: t\npartitions: -2\n";
        assert!(serde_yaml::from_str::<TopicSpec>(yaml).is_err());
    }

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let base = TopicDefaults::data_plane();
        let overrides = TopicSettings {
            partitions: Some(6),
            compression_type: Some(CompressionType::Zstd),
            ..Default::default()
        };

        let merged = base.overlay(&overrides);
        assert_eq!(merged.partitions, 6);
        assert_eq!(merged.compression_type, CompressionType::Zstd);
        assert_eq!(merged.replication, 3);
        assert_eq!(merged.retention_bytes, -1);
        assert_eq!(merged.max_message_bytes, Some(LARGE_MESSAGE_BYTES));
    }

    #[test]
    fn test_profiles() {
        assert_eq!(DefaultsProfile::Legacy.defaults().partitions, 5);
        assert_eq!(DefaultsProfile::Legacy.defaults().max_message_bytes, None);
        assert_eq!(DefaultsProfile::Integrations.defaults().retention_bytes, 629_145_600);
        assert_eq!(DefaultsProfile::DataPlane.defaults().retention_ms, SEVEN_DAYS_MS);
    }

    #[test]
    fn test_cleanup_policy_names() {
        let policy: CleanupPolicy = serde_yaml::from_str("\"compact,delete\"").unwrap();
        assert_eq!(policy, CleanupPolicy::CompactDelete);
        assert_eq!(policy.to_string(), "compact,delete");
    }
}
