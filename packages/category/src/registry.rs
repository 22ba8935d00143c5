//! Compile-time registry of category schemas.
//!
//! Each entry is a `(name, yaml_content)` pair embedded via `include_str!`.
//! Adding a category requires creating a YAML file in `data_models/` and
//! adding a corresponding entry here.

use data_extract_category_models::CategorySchema;

use crate::{CategoryError, parse_category_yaml};

/// Number of registered categories. Enforced by a test.
#[cfg(test)]
const EXPECTED_CATEGORY_COUNT: usize = 10;

/// Embedded YAML category definitions.
const CATEGORY_YAMLS: &[(&str, &str)] = &[
    ("buildings", include_str!("../data_models/buildings.yaml")),
    ("amenities", include_str!("../data_models/amenities.yaml")),
    ("toilets", include_str!("../data_models/toilets.yaml")),
    ("landuse", include_str!("../data_models/landuse.yaml")),
    ("emergency", include_str!("../data_models/emergency.yaml")),
    ("shops", include_str!("../data_models/shops.yaml")),
    ("waste", include_str!("../data_models/waste.yaml")),
    ("water", include_str!("../data_models/water.yaml")),
    ("education", include_str!("../data_models/education.yaml")),
    ("healthcare", include_str!("../data_models/healthcare.yaml")),
];

/// Returns the embedded YAML for `name`, if registered.
#[must_use]
pub fn embedded_yaml(name: &str) -> Option<&'static str> {
    CATEGORY_YAMLS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, yaml)| *yaml)
}

/// Names of all registered categories, in registration order.
#[must_use]
pub fn names() -> Vec<&'static str> {
    CATEGORY_YAMLS.iter().map(|(name, _)| *name).collect()
}

/// Parses every embedded category.
///
/// # Errors
///
/// Returns [`CategoryError::Parse`] for the first malformed document.
pub fn all_schemas() -> Result<Vec<CategorySchema>, CategoryError> {
    CATEGORY_YAMLS
        .iter()
        .map(|(name, yaml)| parse_category_yaml(name, yaml))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use data_extract_category_models::{Category, FilterCondition, SourceTable};
    use strum::VariantNames;

    #[test]
    fn loads_all_categories() {
        let schemas = all_schemas().unwrap();
        assert_eq!(
            schemas.len(),
            EXPECTED_CATEGORY_COUNT,
            "Expected {EXPECTED_CATEGORY_COUNT} categories, found {}. \
             Update EXPECTED_CATEGORY_COUNT after adding/removing categories.",
            schemas.len()
        );
    }

    #[test]
    fn category_names_are_unique() {
        let mut seen = BTreeSet::new();
        for name in names() {
            assert!(seen.insert(name), "Duplicate category: {name}");
        }
    }

    #[test]
    fn every_cli_category_is_registered() {
        for name in Category::VARIANTS {
            assert!(
                embedded_yaml(name).is_some(),
                "Category {name} has no embedded schema"
            );
        }
    }

    #[test]
    fn all_categories_have_source_tables() {
        for schema in &all_schemas().unwrap() {
            assert!(
                !schema.source_tables.is_empty(),
                "Category {} has no source tables",
                schema.name
            );
        }
    }

    #[test]
    fn buildings_schema_shape() {
        let schemas = all_schemas().unwrap();
        let buildings = schemas.iter().find(|s| s.name == "buildings").unwrap();

        assert_eq!(
            buildings.source_tables,
            vec![SourceTable::Nodes, SourceTable::WaysPoly]
        );
        assert_eq!(buildings.select_tags.first().map(String::as_str), Some("name"));
        assert_eq!(
            buildings.filter_condition("building"),
            Some(&FilterCondition::NotNull)
        );
        assert_eq!(buildings.id_column, "osm_id");
    }

    #[test]
    fn healthcare_filters_keep_document_order() {
        let schemas = all_schemas().unwrap();
        let healthcare = schemas.iter().find(|s| s.name == "healthcare").unwrap();
        let tags: Vec<&str> = healthcare.not_null_tags().collect();
        assert_eq!(
            tags,
            vec!["healthcare", "social_facility", "healthcare:speciality"]
        );
    }

    #[test]
    fn landuse_selects_everything() {
        let schemas = all_schemas().unwrap();
        let landuse = schemas.iter().find(|s| s.name == "landuse").unwrap();
        assert!(landuse.select_tags.is_empty());
        assert!(landuse.source_tables.contains(&SourceTable::Relations));
    }
}
