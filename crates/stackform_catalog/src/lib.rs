//! # stackform_catalog
//!
//! Topic catalogs for stackform: YAML topic definitions, `{stack}` name
//! resolution, default merging, and validation.
//!
//! A catalog is one or more `kafka-topics.yaml` files. Each file may list
//! topics under `topics` or `shared_topics`, generate a transport x node
//! product under `transport_node_topics`, and set file-level `defaults`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stackform_catalog::{CatalogReader, CatalogSource, CatalogValidator, DefaultsProfile, TopicResolver};
//!
//! let source = CatalogSource::new("data-plane", "infrastructure/data_plane")
//!     .with_plane("data-plane")
//!     .with_profile(DefaultsProfile::DataPlane);
//!
//! let catalog = CatalogReader::load(&source, ".").unwrap();
//! let topics = TopicResolver::new("staging", "clustera").resolve(&catalog);
//!
//! let result = CatalogValidator::validate_topics(&topics);
//! for error in &result.errors {
//!     eprintln!("Error: {}", error);
//! }
//! ```

pub mod error;
pub mod models;
pub mod reader;
pub mod resolver;
pub mod template;
pub mod validator;

pub use error::{CatalogError, CatalogResult};
pub use models::*;
pub use reader::CatalogReader;
pub use resolver::TopicResolver;
pub use validator::{CatalogValidator, ValidationResult};
