#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Category extraction from Postgres, Overpass, or a local file.
//!
//! One [`DataSource`] is chosen per run. It turns a category schema and a
//! boundary into raw rows, which [`normalize`] maps to output features;
//! [`output`] writes the resulting collection as `GeoJSON`.

pub mod file;
pub mod form;
pub mod normalize;
pub mod output;
pub mod overpass;
pub mod postgres;

use std::path::Path;

use data_extract_boundary::{Boundary, BoundaryError};
use data_extract_category::{CategoryError, SchemaStore};
use data_extract_category_models::CategorySchema;
use data_extract_models::{BackendKind, FeatureCollection};
use data_extract_query::QueryError;

pub use file::FileClient;
pub use overpass::OverpassClient;
pub use postgres::{PostgresClient, PostgresConfig};

/// Errors that can occur during an extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Category schema lookup failed.
    #[error(transparent)]
    Category(#[from] CategoryError),

    /// The boundary file is missing or unusable.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    /// Query construction failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The category is not supported by the selected backend.
    #[error("Category '{category}' is not supported by the {backend} backend")]
    UnsupportedCategory {
        /// The category that was requested.
        category: String,
        /// The backend in use.
        backend: BackendKind,
    },

    /// The backend needs a boundary and none was given.
    #[error("The {backend} backend requires a boundary (--boundary)")]
    MissingBoundary {
        /// The backend in use.
        backend: BackendKind,
    },

    /// A feature geometry could not be parsed.
    #[error("Invalid geometry: {message}")]
    Geometry {
        /// Description of what went wrong.
        message: String,
    },

    /// The backend is unreachable.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// The backend rejected a query.
    #[error("Query rejected: {message}")]
    Rejected {
        /// Description of what went wrong.
        message: String,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A database row could not be converted.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The `XForm` used to name the output file does not exist.
    #[error("{path} not found; run xls2xform to produce it")]
    FormNotFound {
        /// Expected path of the `XForm`.
        path: String,
    },

    /// The `XForm` has no `jr://file/*.geojson` reference.
    #[error("No jr://file GeoJSON reference in {path}")]
    FormReference {
        /// Path of the `XForm`.
        path: String,
    },
}

/// The backend selected for a run. Chosen once at startup.
pub enum DataSource {
    /// Local Postgres/PostGIS database.
    Postgres(PostgresClient),
    /// Overpass API.
    Overpass(OverpassClient),
    /// Local vector file.
    File(FileClient),
}

impl DataSource {
    /// Which backend this is.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Postgres(_) => BackendKind::Postgres,
            Self::Overpass(_) => BackendKind::Overpass,
            Self::File(_) => BackendKind::File,
        }
    }

    /// Fetches and normalizes the features of `schema` inside `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the backend cannot be reached, the query
    /// is rejected, or a returned row cannot be normalized.
    pub async fn get_features(
        &self,
        boundary: Option<&Boundary>,
        schema: &CategorySchema,
    ) -> Result<FeatureCollection, ExtractError> {
        match self {
            Self::Postgres(client) => client.get_features(boundary, schema).await,
            Self::Overpass(client) => client.get_features(boundary, schema).await,
            Self::File(client) => client.get_features(boundary, schema).await,
        }
    }
}

/// A single extraction request.
pub struct ExtractRequest<'a> {
    /// Category name (e.g. `"buildings"`).
    pub category: &'a str,
    /// Boundary file, if any.
    pub boundary: Option<&'a Path>,
    /// Output `GeoJSON` path.
    pub output: &'a Path,
}

/// Runs one extraction end to end: load the schema and boundary, query
/// the source, and write the collection to `request.output`.
///
/// Returns the number of features written.
///
/// # Errors
///
/// Returns [`ExtractError`] on the first failure; nothing is written in
/// that case.
pub async fn run(
    source: &DataSource,
    store: &SchemaStore,
    request: &ExtractRequest<'_>,
) -> Result<usize, ExtractError> {
    let schema = store.load(request.category)?;
    let boundary = request.boundary.map(Boundary::from_file).transpose()?;

    log::info!("Extracting '{}' from {}...", schema.name, source.kind());
    let collection = source.get_features(boundary.as_ref(), &schema).await?;
    let count = collection.len();

    output::write_geojson(request.output, collection)?;
    log::info!("Wrote {count} feature(s) to {}", request.output.display());

    Ok(count)
}
