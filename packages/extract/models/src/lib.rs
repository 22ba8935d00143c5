#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature types shared by the extraction backends.
//!
//! Every backend turns its native rows into [`RawFeature`]s. The
//! normalizer maps those to [`NormalizedFeature`]s, which are collected in
//! query order into a [`FeatureCollection`] and written out as `GeoJSON`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which backend produced a collection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendKind {
    /// Local Postgres/PostGIS database.
    Postgres,
    /// Overpass API.
    Overpass,
    /// Local vector file.
    File,
}

/// Geometry as delivered by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// `GeoJSON` geometry text (e.g. from `ST_AsGeoJSON`).
    GeoJsonText(String),
    /// Already-parsed `GeoJSON` geometry.
    GeoJson(geojson::Geometry),
}

/// One backend record before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Source identifier (OSM id, or the file's feature id).
    pub id: serde_json::Value,
    /// Feature geometry.
    pub geometry: RawGeometry,
    /// Tag values keyed by tag name. `Null` marks a projected tag that the
    /// source row does not carry.
    pub tags: BTreeMap<String, serde_json::Value>,
}

/// A feature ready for output: geometry plus flat, sorted properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeature {
    /// Feature geometry.
    pub geometry: geojson::Geometry,
    /// Scalar properties, always including `id`, `title`, and `label`.
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl NormalizedFeature {
    /// The derived `title`, if the source carried a `name`.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.properties.get("title").and_then(serde_json::Value::as_str)
    }

    /// Converts to a `geojson` feature.
    #[must_use]
    pub fn into_geojson(self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(self.geometry),
            id: None,
            properties: Some(self.properties.into_iter().collect()),
            foreign_members: None,
        }
    }
}

/// Normalized features in query-result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<NormalizedFeature>,
}

impl FeatureCollection {
    /// An empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Appends a feature.
    pub fn push(&mut self, feature: NormalizedFeature) {
        self.features.push(feature);
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in insertion order.
    #[must_use]
    pub fn features(&self) -> &[NormalizedFeature] {
        &self.features
    }

    /// Converts to a `geojson` feature collection.
    #[must_use]
    pub fn into_geojson(self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self
                .features
                .into_iter()
                .map(NormalizedFeature::into_geojson)
                .collect(),
            foreign_members: None,
        }
    }
}

impl FromIterator<NormalizedFeature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = NormalizedFeature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl Extend<NormalizedFeature> for FeatureCollection {
    fn extend<I: IntoIterator<Item = NormalizedFeature>>(&mut self, iter: I) {
        self.features.extend(iter);
    }
}
