#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Category schema store.
//!
//! Resolves a category name to its [`CategorySchema`]. Schemas come from
//! the YAML files embedded at compile time (see [`registry`]) unless a
//! data-models directory is configured, in which case `<dir>/<name>.yaml`
//! is read instead.

pub mod registry;

use std::path::PathBuf;

use data_extract_category_models::{CategoryDocument, CategorySchema};

/// Errors that can occur while loading a category schema.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    /// No YAML document exists for the requested category.
    #[error("No schema found for category '{category}'")]
    SchemaNotFound {
        /// The category that was requested.
        category: String,
    },

    /// The YAML document could not be parsed.
    #[error("Failed to parse schema for category '{category}': {source}")]
    Parse {
        /// The category being parsed.
        category: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The schema file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Path of the schema file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Parses a category YAML document into a schema named `category`.
///
/// # Errors
///
/// Returns [`CategoryError::Parse`] if the document is not valid YAML or
/// does not match the category document shape.
pub fn parse_category_yaml(category: &str, yaml: &str) -> Result<CategorySchema, CategoryError> {
    let document: CategoryDocument =
        serde_yaml::from_str(yaml).map_err(|source| CategoryError::Parse {
            category: category.to_string(),
            source,
        })?;

    Ok(CategorySchema::from_document(category, document))
}

/// Where category schemas are loaded from.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    dir: Option<PathBuf>,
}

impl SchemaStore {
    /// A store backed by the embedded category definitions.
    #[must_use]
    pub const fn embedded() -> Self {
        Self { dir: None }
    }

    /// A store that reads `<dir>/<category>.yaml`.
    #[must_use]
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Loads the schema for `category`.
    ///
    /// # Errors
    ///
    /// * [`CategoryError::SchemaNotFound`] if no YAML matches the name
    /// * [`CategoryError::Parse`] if the YAML is malformed
    /// * [`CategoryError::Io`] if the file exists but cannot be read
    pub fn load(&self, category: &str) -> Result<CategorySchema, CategoryError> {
        let Some(dir) = &self.dir else {
            let yaml = registry::embedded_yaml(category).ok_or_else(|| {
                CategoryError::SchemaNotFound {
                    category: category.to_string(),
                }
            })?;
            log::debug!("Using embedded schema for category '{category}'");
            return parse_category_yaml(category, yaml);
        };

        let path = dir.join(format!("{category}.yaml"));
        let yaml = match std::fs::read_to_string(&path) {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CategoryError::SchemaNotFound {
                    category: category.to_string(),
                });
            }
            Err(source) => return Err(CategoryError::Io { path, source }),
        };

        log::debug!("Loaded schema for category '{category}' from {}", path.display());
        parse_category_yaml(category, &yaml)
    }
}
