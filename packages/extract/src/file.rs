//! Local `GeoJSON` file backend.
//!
//! Only building footprints are supported. Features are read from the
//! file, clipped to the boundary by containment, and kept when their
//! `building` tag is set.

use std::collections::BTreeMap;
use std::path::PathBuf;

use data_extract_boundary::Boundary;
use data_extract_category_models::{Category, CategorySchema, DEFAULT_ID_COLUMN};
use data_extract_models::{BackendKind, FeatureCollection, RawFeature, RawGeometry};
use geojson::GeoJson;
use serde_json::Value;

use crate::ExtractError;
use crate::normalize::normalize;

/// Tag a record must carry to be extracted.
const BUILDING_TAG: &str = "building";

/// Extracts building footprints from a local `GeoJSON` file.
#[derive(Debug, Clone)]
pub struct FileClient {
    infile: PathBuf,
}

impl FileClient {
    /// Creates a client reading `infile`.
    #[must_use]
    pub fn new(infile: impl Into<PathBuf>) -> Self {
        Self {
            infile: infile.into(),
        }
    }

    /// Reads the buildings inside `boundary` (all of them if `None`).
    ///
    /// # Errors
    ///
    /// * [`ExtractError::UnsupportedCategory`] for any category other than
    ///   buildings
    /// * [`ExtractError::Io`] or [`ExtractError::GeoJson`] if the file can't
    ///   be read
    /// * [`ExtractError::Geometry`] if a feature has no usable geometry
    pub async fn get_features(
        &self,
        boundary: Option<&Boundary>,
        schema: &CategorySchema,
    ) -> Result<FeatureCollection, ExtractError> {
        if !matches!(schema.name.parse::<Category>(), Ok(Category::Buildings)) {
            return Err(ExtractError::UnsupportedCategory {
                category: schema.name.clone(),
                backend: BackendKind::File,
            });
        }

        log::info!("Extracting buildings from {}...", self.infile.display());
        let text = tokio::fs::read_to_string(&self.infile).await?;
        let geojson: GeoJson = text.parse()?;

        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                log::warn!(
                    "{} holds a bare geometry; no tags to filter on",
                    self.infile.display()
                );
                Vec::new()
            }
        };
        log::debug!("Read {} record(s)", features.len());

        let mut collection = FeatureCollection::new();

        for (index, feature) in features.into_iter().enumerate() {
            let Some(raw) = raw_feature(feature, index)? else {
                continue;
            };
            if !is_building(&raw.tags) {
                continue;
            }
            if let Some(boundary) = boundary {
                if !within(boundary, &raw)? {
                    continue;
                }
            }
            collection.push(normalize(&raw)?);
        }

        log::info!("Kept {} building(s)", collection.len());

        Ok(collection)
    }
}

/// Converts one file feature. Features without geometry are skipped.
fn raw_feature(feature: geojson::Feature, index: usize) -> Result<Option<RawFeature>, ExtractError> {
    let Some(geometry) = feature.geometry else {
        log::debug!("Skipping record {index} without geometry");
        return Ok(None);
    };
    let properties = feature.properties.unwrap_or_default();

    let id = feature
        .id
        .map(|id| match id {
            geojson::feature::Id::String(s) => Value::String(s),
            geojson::feature::Id::Number(n) => Value::Number(n),
        })
        .or_else(|| properties.get(DEFAULT_ID_COLUMN).cloned())
        .or_else(|| properties.get("id").cloned())
        .unwrap_or_else(|| Value::from(index));

    Ok(Some(RawFeature {
        id,
        geometry: RawGeometry::GeoJson(geometry),
        tags: tags_of(&properties)?,
    }))
}

/// Tags come from a nested `tags` object (or its JSON text) when present,
/// else from the flat properties.
fn tags_of(
    properties: &serde_json::Map<String, Value>,
) -> Result<BTreeMap<String, Value>, ExtractError> {
    match properties.get("tags") {
        Some(Value::Object(tags)) => Ok(tags.clone().into_iter().collect()),
        Some(Value::String(text)) => Ok(serde_json::from_str(text)?),
        _ => Ok(properties
            .iter()
            .filter(|(key, _)| key.as_str() != DEFAULT_ID_COLUMN && key.as_str() != "id")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()),
    }
}

fn is_building(tags: &BTreeMap<String, Value>) -> bool {
    tags.get(BUILDING_TAG).is_some_and(|value| !value.is_null())
}

fn within(boundary: &Boundary, raw: &RawFeature) -> Result<bool, ExtractError> {
    let RawGeometry::GeoJson(geometry) = &raw.geometry else {
        return Ok(false);
    };
    let geometry = geo::Geometry::<f64>::try_from(geometry.value.clone()).map_err(|e| {
        ExtractError::Geometry {
            message: format!("feature {}: {e}", raw.id),
        }
    })?;

    Ok(boundary.contains(&geometry))
}
