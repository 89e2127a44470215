//! Integration tests for catalog loading and resolution.

use std::fs;
use std::path::Path;

use stackform_catalog::{
    CatalogError, CatalogReader, CatalogSource, CatalogValidator, CleanupPolicy, CompressionType,
    DefaultsProfile, TopicResolver, LARGE_MESSAGE_BYTES, SEVEN_DAYS_MS,
};
use tempfile::tempdir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_integrations_catalog_discovers_nested_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("integrations");

    write(
        &root.join("shared/kafka-topics.yaml"),
        r#"
topics:
  - name: "{stack}.integrations.events"
    partitions: 3
"#,
    );
    write(
        &root.join("integration-gmail/kafka-topics.yaml"),
        r#"
topics:
  - name: "{stack}.gmail.messages"
    retention_ms: "86400000"
    compression_type: zstd
"#,
    );
    write(&root.join("integration-gmail/README.md"), "not a catalog");

    let source = CatalogSource::new("integrations", "integrations").recursive();
    let catalog = CatalogReader::load(&source, dir.path()).unwrap();

    // sorted by path: integration-gmail before shared
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.topics[0].spec.name, "{stack}.gmail.messages");
    assert_eq!(catalog.topics[1].spec.name, "{stack}.integrations.events");

    let topics = TopicResolver::new("production", "clustera").resolve(&catalog);
    assert_eq!(topics[0].topic_name, "production.gmail.messages");
    assert_eq!(topics[0].retention_ms, 86_400_000);
    assert_eq!(topics[0].compression_type, CompressionType::Zstd);
    assert_eq!(topics[0].partitions, 1);
    assert_eq!(topics[0].max_message_bytes, Some(LARGE_MESSAGE_BYTES));
    assert_eq!(topics[1].partitions, 3);
    assert_eq!(topics[1].retention_bytes, 629_145_600);

    let result = CatalogValidator::validate_topics(&topics);
    assert!(result.valid, "{:?}", result.errors);
}

#[test]
fn test_non_recursive_catalog_ignores_subdirectories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("infra/kafka-topics.yaml"), "topics:\n  - name: \"{stack}.root\"\n");
    write(&dir.path().join("infra/nested/kafka-topics.yaml"), "topics:\n  - name: \"{stack}.nested\"\n");

    let source = CatalogSource::new("root", "infra");
    let catalog = CatalogReader::load(&source, dir.path()).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.topics[0].spec.name, "{stack}.root");
}

#[test]
fn test_file_defaults_stay_with_their_file() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("integrations");

    write(
        &root.join("a/kafka-topics.yaml"),
        r#"
defaults:
  partitions: 9
topics:
  - name: "{stack}.a.events"
"#,
    );
    write(&root.join("b/kafka-topics.yaml"), "topics:\n  - name: \"{stack}.b.events\"\n");

    let source = CatalogSource::new("integrations", "integrations")
        .recursive()
        .with_profile(DefaultsProfile::Integrations);
    let catalog = CatalogReader::load(&source, dir.path()).unwrap();
    let topics = TopicResolver::new("dev", "clustera").resolve(&catalog);

    assert_eq!(topics[0].topic_name, "dev.a.events");
    assert_eq!(topics[0].partitions, 9);
    assert_eq!(topics[1].topic_name, "dev.b.events");
    assert_eq!(topics[1].partitions, 1);
}

#[test]
fn test_data_plane_catalog_with_file_defaults_and_product() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("data_plane/kafka-topics.yaml");
    write(
        &file,
        r#"
defaults:
  partitions: 2
  cleanup_policy: "compact,delete"
shared_topics:
  - name: "{stack}.enrichment.requests"
  - name: "{stack}.enrichment.results"
    partitions: 8
transport_node_topics:
  template: "{stack}-{transport}-responses-{node}"
  transports: [http, ws]
  nodes: [n1, n2, n3]
"#,
    );

    let source = CatalogSource::new("data_plane", "data_plane/kafka-topics.yaml")
        .with_plane("data-plane")
        .with_profile(DefaultsProfile::DataPlane);
    let catalog = CatalogReader::load(&source, dir.path()).unwrap();
    assert_eq!(catalog.len(), 8);

    let topics = TopicResolver::new("staging", "clustera").resolve(&catalog);
    assert_eq!(topics[0].partitions, 2);
    assert_eq!(topics[0].cleanup_policy, CleanupPolicy::CompactDelete);
    assert_eq!(topics[0].replication, 3);
    assert_eq!(topics[0].retention_ms, SEVEN_DAYS_MS);
    assert_eq!(topics[1].partitions, 8);
    assert_eq!(topics[2].topic_name, "staging-http-responses-n1");
    assert_eq!(topics[7].topic_name, "staging-ws-responses-n3");
    assert!(topics.iter().all(|t| t.plane.as_deref() == Some("data-plane")));
}

#[test]
fn test_overlapping_catalogs_report_duplicates() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a/kafka-topics.yaml"), "topics:\n  - name: \"{stack}.events\"\n");
    write(&dir.path().join("b/kafka-topics.yaml"), "shared_topics:\n  - name: \"{stack}.events\"\n");

    let sources = vec![CatalogSource::new("a", "a"), CatalogSource::new("b", "b")];
    let catalogs = CatalogReader::load_all(&sources, dir.path()).unwrap();
    let topics = TopicResolver::new("dev", "clustera").resolve_all(&catalogs);

    let result = CatalogValidator::validate_topics(&topics);
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("catalog 'a'"));
    assert!(result.errors[0].contains("catalog 'b'"));
}

#[test]
fn test_same_catalog_distinct_per_stack() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("kafka-topics.yaml"), "topics:\n  - name: \"{stack}.events\"\n");

    let catalog = CatalogReader::load(&CatalogSource::new("root", "kafka-topics.yaml"), dir.path()).unwrap();
    let dev = TopicResolver::new("dev", "clustera").resolve(&catalog);
    let prod = TopicResolver::new("prod", "clustera").resolve(&catalog);

    assert_ne!(dev[0].topic_name, prod[0].topic_name);
    assert_ne!(dev[0].resource_name, prod[0].resource_name);
}

#[test]
fn test_unknown_placeholder_in_product_template() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("kafka-topics.yaml");
    write(
        &file,
        "transport_node_topics:\n  template: \"{stack}-{zone}-{node}\"\n  transports: [http]\n  nodes: [a]\n",
    );

    let err = CatalogReader::read_document(&file).unwrap_err();
    assert!(matches!(err, CatalogError::UnknownPlaceholder { .. }));
}

#[test]
fn test_invalid_yaml_is_reported_with_path() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("kafka-topics.yaml");
    write(&file, "topics: [unclosed\n");

    let err = CatalogReader::read_document(&file).unwrap_err();
    match err {
        CatalogError::InvalidFormat { path, .. } => assert_eq!(path, file),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_resolved_topics_serialize() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("kafka-topics.yaml"), "topics:\n  - name: \"{stack}.events\"\n");

    let catalog = CatalogReader::load(&CatalogSource::new("root", "."), dir.path()).unwrap();
    let topics = TopicResolver::new("dev", "clustera").resolve(&catalog);
    let json = serde_json::to_value(&topics).unwrap();

    assert_eq!(json[0]["topic_name"], "dev.events");
    assert_eq!(json[0]["cleanup_policy"], "delete");
    assert_eq!(json[0]["compression_type"], "snappy");
}
