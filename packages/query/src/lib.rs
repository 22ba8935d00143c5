#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query builders for the extraction backends.
//!
//! Both builders take a [`CategorySchema`](data_extract_category_models::CategorySchema)
//! and compose typed clause parts that are only rendered to text through
//! `Display`:
//!
//! * [`sql`] produces `PostGIS` statements (spatial views plus one projected
//!   `SELECT` per source table).
//! * [`overpass`] produces an Overpass QL query over the boundary's
//!   bounding box.
//! * [`raw_data`] produces the JSON request body of the raw-data API.

pub mod overpass;
pub mod raw_data;
pub mod sql;

/// Errors that can occur while building a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The category has no mapping for the requested backend.
    #[error("Category '{category}' is not supported by the {backend} backend")]
    UnsupportedCategory {
        /// The category that was requested.
        category: String,
        /// Backend name (e.g. `"overpass"`).
        backend: &'static str,
    },

    /// The schema does not name any source tables.
    #[error("Category '{category}' has no source tables ('from' is missing or empty)")]
    NoSourceTables {
        /// The category being built.
        category: String,
    },
}
