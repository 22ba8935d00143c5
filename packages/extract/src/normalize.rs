//! Maps [`RawFeature`]s to [`NormalizedFeature`]s.
//!
//! Normalization copies the tags, sets `id` from the source identifier,
//! and derives `title` and `label` from `name`. Both derived fields are
//! always present; they are `null` when the feature has no name.

use std::collections::BTreeMap;

use data_extract_models::{NormalizedFeature, RawFeature, RawGeometry};
use serde_json::Value;

use crate::ExtractError;

/// Normalizes one raw feature.
///
/// # Errors
///
/// Returns [`ExtractError::Geometry`] if the raw geometry text is not a
/// valid `GeoJSON` geometry.
pub fn normalize(raw: &RawFeature) -> Result<NormalizedFeature, ExtractError> {
    let geometry = match &raw.geometry {
        RawGeometry::GeoJson(geometry) => geometry.clone(),
        RawGeometry::GeoJsonText(text) => {
            serde_json::from_str::<geojson::Geometry>(text).map_err(|e| {
                ExtractError::Geometry {
                    message: format!("feature {}: {e}", raw.id),
                }
            })?
        }
    };

    let mut properties = raw.tags.clone();
    properties.insert("id".to_string(), raw.id.clone());

    let name = properties.get("name").cloned().unwrap_or(Value::Null);
    properties.insert("title".to_string(), name.clone());
    properties.insert("label".to_string(), name);

    Ok(NormalizedFeature {
        geometry,
        properties,
    })
}

/// Restricts `tags` to `select_tags`, filling absent tags with `null`.
/// An empty selection keeps every tag.
#[must_use]
pub fn project_tags(
    tags: &BTreeMap<String, String>,
    select_tags: &[String],
) -> BTreeMap<String, Value> {
    if select_tags.is_empty() {
        return tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
    }

    select_tags
        .iter()
        .map(|tag| {
            let value = tags
                .get(tag)
                .map_or(Value::Null, |v| Value::String(v.clone()));
            (tag.clone(), value)
        })
        .collect()
}
