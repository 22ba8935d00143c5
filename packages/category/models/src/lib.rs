#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Category schema types.
//!
//! A category (e.g. `buildings`) is described by a small YAML document
//! naming the source tables to read, the tags to project, and the tags
//! that must be present. [`CategoryDocument`] mirrors that document
//! one-to-one; [`CategorySchema`] is the flattened, read-only form the
//! query builders consume.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, VariantNames};

/// Column that carries the OSM identifier when a schema does not name one.
pub const DEFAULT_ID_COLUMN: &str = "osm_id";

/// The categories that can be extracted from the command line.
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
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Building footprints and entrances.
    Buildings,
    /// Any `amenity=*` feature.
    Amenities,
    /// Public toilets.
    Toilets,
    /// Land use areas.
    Landuse,
    /// Emergency services and infrastructure.
    Emergency,
    /// Shops of any kind.
    Shops,
    /// Waste disposal and recycling points.
    Waste,
    /// Drinking water points.
    Water,
    /// Schools and kindergartens.
    Education,
    /// Health facilities.
    Healthcare,
}

/// A logical source table in the OSM database schema.
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
pub enum SourceTable {
    /// Tagged nodes.
    Nodes,
    /// Closed ways stored as polygons.
    WaysPoly,
    /// Open ways stored as linestrings.
    WaysLine,
    /// Relations. Not supported by any backend yet.
    Relations,
}

impl SourceTable {
    /// The geometry type stored in this table, or `None` for relations.
    #[must_use]
    pub const fn geometry_type(self) -> Option<GeometryType> {
        match self {
            Self::Nodes => Some(GeometryType::Point),
            Self::WaysPoly => Some(GeometryType::Polygon),
            Self::WaysLine => Some(GeometryType::LineString),
            Self::Relations => None,
        }
    }

    /// Name of the temporary spatial view created over this table.
    #[must_use]
    pub fn view_name(self) -> String {
        format!("{}_view", self.as_ref())
    }
}

/// Output geometry type of a source table.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeometryType {
    /// `point`
    Point,
    /// `polygon`
    Polygon,
    /// `linestring`
    LineString,
}

/// Condition a filter tag must satisfy.
///
/// Only `not null` is understood by the query builders. Other values are
/// kept so the schema round-trips, but they never reach a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterCondition {
    /// The tag must be present.
    NotNull,
    /// Any other condition string.
    Other(String),
}

impl From<String> for FilterCondition {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("not null") {
            Self::NotNull
        } else {
            Self::Other(value)
        }
    }
}

impl From<FilterCondition> for String {
    fn from(value: FilterCondition) -> Self {
        match value {
            FilterCondition::NotNull => "not null".to_string(),
            FilterCondition::Other(other) => other,
        }
    }
}

/// The `select` section of a category document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectSection {
    /// Tags to project, in output order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source column aliased as `id`. Also accepted as `osm_id`.
    #[serde(default, alias = "osm_id")]
    pub id: Option<String>,
    /// Per-tag column overrides (`tag: column expression`).
    #[serde(flatten)]
    pub columns: BTreeMap<String, String>,
}

/// The `where` section of a category document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhereSection {
    /// Single-key maps of `tag: condition`, merged in order. A repeated
    /// tag keeps its first position and takes the last condition.
    #[serde(default)]
    pub tags: Vec<BTreeMap<String, FilterCondition>>,
}

/// A category YAML document as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDocument {
    /// Projection.
    pub select: Option<SelectSection>,
    /// Source tables, in query order.
    pub from: Option<Vec<SourceTable>>,
    /// Filter predicates.
    #[serde(rename = "where")]
    pub filter: Option<WhereSection>,
}

/// A loaded category schema.
///
/// Built once per run by the schema store and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySchema {
    /// Category name (e.g. `"buildings"`). Identity of the schema.
    pub name: String,
    /// Source tables, in query order.
    pub source_tables: Vec<SourceTable>,
    /// Tags to project. Empty means every column.
    pub select_tags: Vec<String>,
    /// Column expressions overriding the default `tags->>'<tag>'`.
    pub column_overrides: BTreeMap<String, String>,
    /// Column aliased as `id` in projected queries.
    pub id_column: String,
    /// Tags with their required condition, in document order.
    pub filter_tags: Vec<(String, FilterCondition)>,
}

impl CategorySchema {
    /// Flattens a parsed YAML document into a schema named `name`.
    #[must_use]
    pub fn from_document(name: impl Into<String>, document: CategoryDocument) -> Self {
        let select = document.select.unwrap_or_default();

        let mut filter_tags: Vec<(String, FilterCondition)> = Vec::new();
        for (tag, condition) in document.filter.unwrap_or_default().tags.into_iter().flatten() {
            match filter_tags.iter_mut().find(|(existing, _)| *existing == tag) {
                Some(entry) => entry.1 = condition,
                None => filter_tags.push((tag, condition)),
            }
        }

        Self {
            name: name.into(),
            source_tables: document.from.unwrap_or_default(),
            select_tags: select.tags,
            column_overrides: select.columns,
            id_column: select.id.unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string()),
            filter_tags,
        }
    }

    /// Column expression that yields `tag`.
    #[must_use]
    pub fn mapped_column(&self, tag: &str) -> String {
        self.column_overrides
            .get(tag)
            .cloned()
            .unwrap_or_else(|| format!("tags->>'{tag}'"))
    }

    /// Condition required for `tag`, if it is filtered on.
    #[must_use]
    pub fn filter_condition(&self, tag: &str) -> Option<&FilterCondition> {
        self.filter_tags
            .iter()
            .find(|(candidate, _)| candidate == tag)
            .map(|(_, condition)| condition)
    }

    /// Tags marked `not null`, in document order.
    pub fn not_null_tags(&self) -> impl Iterator<Item = &str> {
        self.filter_tags
            .iter()
            .filter(|(_, condition)| *condition == FilterCondition::NotNull)
            .map(|(tag, _)| tag.as_str())
    }

    /// Geometry types of the source tables. Relations are dropped.
    #[must_use]
    pub fn geometry_types(&self) -> Vec<GeometryType> {
        self.source_tables
            .iter()
            .filter_map(|table| table.geometry_type())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(tables: Vec<SourceTable>) -> CategorySchema {
        CategorySchema::from_document(
            "test",
            CategoryDocument {
                select: None,
                from: Some(tables),
                filter: None,
            },
        )
    }

    #[test]
    fn maps_tables_to_geometry_types() {
        let schema = schema(vec![
            SourceTable::Nodes,
            SourceTable::WaysPoly,
            SourceTable::WaysLine,
            SourceTable::Relations,
        ]);
        assert_eq!(
            schema.geometry_types(),
            vec![
                GeometryType::Point,
                GeometryType::Polygon,
                GeometryType::LineString
            ]
        );
    }

    #[test]
    fn relations_never_produce_a_geometry_type() {
        let schema = schema(vec![SourceTable::Relations, SourceTable::Relations]);
        assert!(schema.geometry_types().is_empty());
    }

    #[test]
    fn geometry_type_names() {
        assert_eq!(GeometryType::Point.to_string(), "point");
        assert_eq!(GeometryType::Polygon.to_string(), "polygon");
        assert_eq!(GeometryType::LineString.to_string(), "linestring");
    }

    #[test]
    fn parses_filter_conditions() {
        assert_eq!(
            FilterCondition::from("not null".to_string()),
            FilterCondition::NotNull
        );
        assert_eq!(
            FilterCondition::from("NOT NULL ".to_string()),
            FilterCondition::NotNull
        );
        assert_eq!(
            FilterCondition::from("yes".to_string()),
            FilterCondition::Other("yes".to_string())
        );
    }

    #[test]
    fn default_mapped_column_reads_tags_json() {
        let schema = schema(vec![SourceTable::Nodes]);
        assert_eq!(schema.mapped_column("name"), "tags->>'name'");
        assert_eq!(schema.id_column, DEFAULT_ID_COLUMN);
    }

    #[test]
    fn category_names_round_trip() {
        assert_eq!(Category::Healthcare.as_ref(), "healthcare");
        assert_eq!("landuse".parse::<Category>().unwrap(), Category::Landuse);
        assert!("camping".parse::<Category>().is_err());
    }
}
