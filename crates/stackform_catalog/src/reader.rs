//! Catalog file reading and discovery.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Catalog, CatalogDocument, CatalogFile, CatalogSource, LoadedTopic, TopicSource, TopicSpec};
use crate::template;

impl CatalogFile {
    /// Expand the file into concrete topic specs.
    ///
    /// Order: `topics`, then `shared_topics`, then the transport x node
    /// product (transport-major).
    pub fn expand(&self, path: &Path) -> CatalogResult<Vec<LoadedTopic>> {
        let file_defaults = self.defaults.clone().unwrap_or_default();
        let mut specs = Vec::new();

        let listed = self
            .topics
            .iter()
            .flatten()
            .chain(self.shared_topics.iter().flatten());

        for (index, value) in listed.enumerate() {
            specs.push(parse_entry(path, index, value)?);
        }

        if let Some(product) = &self.transport_node_topics {
            for transport in &product.transports {
                for node in &product.nodes {
                    let name = template::expand_transport_node(&product.template, transport, node)?;
                    specs.push(TopicSpec::new(name));
                }
            }
        }

        Ok(specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| LoadedTopic {
                spec,
                source: TopicSource {
                    file: path.to_path_buf(),
                    index,
                },
                file_defaults: file_defaults.clone(),
            })
            .collect())
    }
}

fn parse_entry(path: &Path, index: usize, value: &serde_yaml::Value) -> CatalogResult<TopicSpec> {
    let has_name = value
        .as_mapping()
        .and_then(|m| m.get("name"))
        .map_or(false, |n| n.is_string());

    if !has_name {
        return Err(CatalogError::MissingName {
            path: path.to_path_buf(),
            index,
        });
    }

    serde_yaml::from_value(value.clone()).map_err(|e| CatalogError::InvalidFormat {
        path: path.to_path_buf(),
        message: format!("topic at index {}: {}", index, e),
    })
}

/// Reader for topic catalog files.
pub struct CatalogReader;

impl CatalogReader {
    /// Read and expand a single catalog file.
    pub fn read_document(path: impl AsRef<Path>) -> CatalogResult<CatalogDocument> {
        let path = path.as_ref();
        debug!("Reading catalog file {:?}", path);

        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(CatalogDocument {
                path: path.to_path_buf(),
                ..Default::default()
            });
        }

        let file: Option<CatalogFile> = serde_yaml::from_str(&content).map_err(|e| CatalogError::InvalidFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file = file.unwrap_or_default();

        let topics = file.expand(path)?;
        Ok(CatalogDocument {
            path: path.to_path_buf(),
            defaults: file.defaults.unwrap_or_default(),
            topics,
        })
    }

    /// Find catalog files named `file_name` under `dir`, sorted by path.
    pub fn discover(dir: impl AsRef<Path>, file_name: &str, recursive: bool) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == file_name)
            .map(|e| e.into_path())
            .collect();

        files.sort();
        files
    }

    /// Load every file belonging to a configured catalog.
    ///
    /// Relative catalog paths are taken from `base_dir`. A missing path is
    /// not an error: the catalog is simply empty.
    pub fn load(source: &CatalogSource, base_dir: impl AsRef<Path>) -> CatalogResult<Catalog> {
        let root = if source.path.is_absolute() {
            source.path.clone()
        } else {
            base_dir.as_ref().join(&source.path)
        };

        let mut catalog = Catalog::new(&source.name, source.profile.defaults());
        catalog.plane = source.plane.clone();
        catalog.tags = source.tags.clone();

        let files = if root.is_file() {
            vec![root.clone()]
        } else if root.is_dir() {
            Self::discover(&root, &source.file_name, source.recursive)
        } else {
            warn!(
                "Catalog '{}': {:?} not found, no topics will be declared",
                source.name, root
            );
            return Ok(catalog);
        };

        if files.is_empty() {
            warn!("Catalog '{}': no {} files found under {:?}", source.name, source.file_name, root);
            return Ok(catalog);
        }

        for file in files {
            let document = Self::read_document(&file)?;
            if !document.topics.is_empty() {
                info!(
                    "Loaded {} topics from {}",
                    document.topics.len(),
                    file.strip_prefix(base_dir.as_ref()).unwrap_or(&file).display()
                );
            }
            catalog.topics.extend(document.topics);
        }

        Ok(catalog)
    }

    /// Load several catalogs in order.
    pub fn load_all(sources: &[CatalogSource], base_dir: impl AsRef<Path>) -> CatalogResult<Vec<Catalog>> {
        sources
            .iter()
            .map(|source| Self::load(source, base_dir.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_expand_orders_sections() {
        let yaml = r#"
topics:
  - name: "{stack}.legacy"
shared_topics:
  - name: "{stack}.shared"
    partitions: 4
transport_node_topics:
  transports: [http, grpc]
  nodes: ["1", "2"]
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let topics = file.expand(Path::new("kafka-topics.yaml")).unwrap();
        let names: Vec<_> = topics.iter().map(|t| t.spec.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "{stack}.legacy",
                "{stack}.shared",
                "{stack}-http-responses-1",
                "{stack}-http-responses-2",
                "{stack}-grpc-responses-1",
                "{stack}-grpc-responses-2",
            ]
        );
        assert_eq!(topics[1].spec.settings.partitions, Some(4));
        assert_eq!(topics[5].source.index, 5);
    }

    #[test]
    fn test_entry_without_name_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kafka-topics.yaml");
        fs::write(&path, "topics:\n  - name: ok\n  - partitions: 3\n").unwrap();

        let err = CatalogReader::read_document(&path).unwrap_err();
        assert!(matches!(err, CatalogError::MissingName { index: 1, .. }));
    }

    #[test]
    fn test_scalar_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kafka-topics.yaml");
        fs::write(&path, "topics:\n  - just-a-string\n").unwrap();

        let err = CatalogReader::read_document(&path).unwrap_err();
        assert!(matches!(err, CatalogError::MissingName { index: 0, .. }));
    }

    #[test]
    fn test_empty_file_yields_no_topics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kafka-topics.yaml");
        fs::write(&path, "").unwrap();

        let doc = CatalogReader::read_document(&path).unwrap();
        assert!(doc.topics.is_empty());

        fs::write(&path, "topics:\n").unwrap();
        let doc = CatalogReader::read_document(&path).unwrap();
        assert!(doc.topics.is_empty());
    }

    #[test]
    fn test_missing_catalog_path_is_empty() {
        let dir = tempdir().unwrap();
        let source = CatalogSource::new("integrations", "does/not/exist");

        let catalog = CatalogReader::load(&source, dir.path()).unwrap();
        assert!(catalog.is_empty());
    }
}
