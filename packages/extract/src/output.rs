//! `GeoJSON` output.

use std::path::Path;

use data_extract_models::FeatureCollection;

use crate::ExtractError;

/// Renders `collection` as an indented `GeoJSON` `FeatureCollection`.
///
/// Property keys are emitted in sorted order and features in collection
/// order, so equal inputs render to identical text.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] if serialization fails.
pub fn render_geojson(collection: FeatureCollection) -> Result<String, ExtractError> {
    Ok(serde_json::to_string_pretty(&collection.into_geojson())?)
}

/// Writes `collection` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] or [`ExtractError::Io`] on failure.
pub fn write_geojson(path: &Path, collection: FeatureCollection) -> Result<(), ExtractError> {
    let json = render_geojson(collection)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_extract_models::NormalizedFeature;
    use serde_json::json;

    fn feature(id: i64, name: Option<&str>) -> NormalizedFeature {
        let name = name.map_or(serde_json::Value::Null, |n| json!(n));
        NormalizedFeature {
            geometry: geojson::Geometry::new(geojson::Value::Point(vec![1.0, 2.0])),
            properties: [
                ("label".to_string(), name.clone()),
                ("title".to_string(), name),
                ("id".to_string(), json!(id)),
                ("amenity".to_string(), json!("toilets")),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn collection() -> FeatureCollection {
        [feature(1, Some("WC")), feature(2, None)]
            .into_iter()
            .collect()
    }

    #[test]
    fn renders_feature_collection() {
        let text = render_geojson(collection()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["type"], json!("FeatureCollection"));
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
        assert_eq!(value["features"][0]["properties"]["title"], json!("WC"));
        assert_eq!(
            value["features"][1]["properties"]["label"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn sorts_property_keys() {
        let text = render_geojson(collection()).unwrap();
        let amenity = text.find("\"amenity\"").unwrap();
        let id = text.find("\"id\"").unwrap();
        let label = text.find("\"label\"").unwrap();
        let title = text.find("\"title\"").unwrap();

        assert!(amenity < id && id < label && label < title);
    }

    #[test]
    fn empty_collection_is_valid() {
        let text = render_geojson(FeatureCollection::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["features"], json!([]));
    }

    #[test]
    fn writes_identical_files_for_identical_input() {
        let dir = std::env::temp_dir();
        let a = dir.join(format!("data_extract_out_a_{}.geojson", std::process::id()));
        let b = dir.join(format!("data_extract_out_b_{}.geojson", std::process::id()));

        std::fs::write(&a, "stale").unwrap();
        write_geojson(&a, collection()).unwrap();
        write_geojson(&b, collection()).unwrap();

        let left = std::fs::read_to_string(&a).unwrap();
        let right = std::fs::read_to_string(&b).unwrap();
        std::fs::remove_file(&a).ok();
        std::fs::remove_file(&b).ok();

        assert_eq!(left, right);
        assert!(!left.contains("stale"));
    }
}
