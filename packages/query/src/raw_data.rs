//! Raw-data API request bodies.
//!
//! The request carries the boundary geometry, an OR-joined presence filter
//! over the schema's `not null` tags, and the geometry types to return:
//!
//! ```json
//! {
//!   "geometry": { "type": "Polygon", "coordinates": [...] },
//!   "filters": { "tags": { "all_geometry": { "join_or": { "building": [] } } } },
//!   "geometryType": ["point", "polygon"]
//! }
//! ```

use std::collections::BTreeMap;

use data_extract_boundary::Boundary;
use data_extract_category_models::{CategorySchema, GeometryType};
use serde::Serialize;

/// A raw-data API request for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDataRequest {
    /// Area to extract.
    pub geometry: geojson::Geometry,
    /// Tag filters.
    pub filters: RawDataFilters,
    /// Geometry types to return. Never contains relations.
    #[serde(rename = "geometryType")]
    pub geometry_type: Vec<GeometryType>,
}

/// The `filters` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawDataFilters {
    /// Tag filters applied to every geometry type.
    pub tags: TagFilters,
}

/// The `filters.tags` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagFilters {
    /// Filters shared by all geometry types.
    pub all_geometry: JoinOr,
}

/// Tags of which at least one must be present. An empty value list
/// matches any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinOr {
    /// `tag: [values]`
    pub join_or: BTreeMap<String, Vec<String>>,
}

impl RawDataRequest {
    /// Builds the request for `schema` inside `boundary`.
    #[must_use]
    pub fn for_category(schema: &CategorySchema, boundary: &Boundary) -> Self {
        let join_or = schema
            .not_null_tags()
            .map(|tag| (tag.to_string(), Vec::new()))
            .collect();

        Self {
            geometry: boundary.to_geojson(),
            filters: RawDataFilters {
                tags: TagFilters {
                    all_geometry: JoinOr { join_or },
                },
            },
            geometry_type: schema.geometry_types(),
        }
    }

    /// Serializes the request body.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
