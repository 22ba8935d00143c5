//! `PostGIS` query construction.
//!
//! A [`SqlPlan`] holds, per source table, the spatial view that clips the
//! table to the boundary and the projected [`SelectQuery`] that reads from
//! that view. Clauses are kept as typed parts and joined only when
//! rendered, so an empty predicate list simply omits `WHERE`.

use std::fmt;

use data_extract_boundary::Boundary;
use data_extract_category_models::{CategorySchema, GeometryType, SourceTable};

use crate::QueryError;

/// Alias of the `GeoJSON` geometry column added to feature queries.
pub const GEOMETRY_ALIAS: &str = "geometry";
/// Alias of the identifier column.
pub const ID_ALIAS: &str = "id";
/// Alias of the raw tags column in `*` feature queries.
pub const TAGS_ALIAS: &str = "tags";

/// A projected column: `<expr> AS <alias>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column expression (e.g. `tags->>'name'`).
    pub expr: String,
    /// Output name.
    pub alias: String,
}

impl Column {
    /// Creates a column.
    #[must_use]
    pub fn new(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: alias.into(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.expr, quote_identifier(&self.alias))
    }
}

/// The projection of a `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    /// An explicit column list.
    Columns(Vec<Column>),
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Columns(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{column}")?;
                }
                Ok(())
            }
        }
    }
}

/// A single `WHERE` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `tags->>'<tag>' IS NOT NULL`
    TagNotNull(String),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagNotNull(tag) => write!(f, "tags->>{} IS NOT NULL", quote_literal(tag)),
        }
    }
}

/// `SELECT <projection> FROM <from> [WHERE <p1> OR <p2> ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// What to project.
    pub projection: Projection,
    /// Table or view to read.
    pub from: String,
    /// Predicates, joined with `OR`.
    pub predicates: Vec<Predicate>,
}

impl SelectQuery {
    /// The category query for one table: select tags aliased to their
    /// names plus a trailing `id`, or `*` when the schema selects nothing;
    /// filtered on the schema's `not null` tags.
    #[must_use]
    pub fn for_category(schema: &CategorySchema, from: impl Into<String>) -> Self {
        let projection = if schema.select_tags.is_empty() {
            Projection::All
        } else {
            let mut columns: Vec<Column> = schema
                .select_tags
                .iter()
                .map(|tag| Column::new(schema.mapped_column(tag), tag.as_str()))
                .collect();
            columns.push(Column::new(schema.id_column.as_str(), ID_ALIAS));
            Projection::Columns(columns)
        };

        let predicates = schema
            .not_null_tags()
            .map(|tag| Predicate::TagNotNull(tag.to_string()))
            .collect();

        Self {
            projection,
            from: from.into(),
            predicates,
        }
    }

    /// The query actually executed against the database: the category
    /// projection with `ST_AsGeoJSON(geom) AS geometry` in front. A `*`
    /// projection is replaced by the identifier and the tags as text.
    #[must_use]
    pub fn with_feature_columns(&self, id_column: &str) -> Self {
        let geometry = Column::new("ST_AsGeoJSON(geom)", GEOMETRY_ALIAS);
        let columns = match &self.projection {
            Projection::All => vec![
                geometry,
                Column::new(id_column, ID_ALIAS),
                Column::new("tags::text", TAGS_ALIAS),
            ],
            Projection::Columns(columns) => std::iter::once(geometry)
                .chain(columns.iter().cloned())
                .collect(),
        };

        Self {
            projection: Projection::Columns(columns),
            from: self.from.clone(),
            predicates: self.predicates.clone(),
        }
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", self.projection, self.from)?;
        for (i, predicate) in self.predicates.iter().enumerate() {
            f.write_str(if i == 0 { " WHERE " } else { " OR " })?;
            write!(f, "{predicate}")?;
        }
        Ok(())
    }
}

/// A temporary view restricting a table to the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialView {
    /// Base table.
    pub table: SourceTable,
    /// Boundary as EWKT (`SRID=4326;POLYGON(...)`).
    pub boundary_ewkt: String,
}

impl SpatialView {
    /// View name (`<table>_view`).
    #[must_use]
    pub fn name(&self) -> String {
        self.table.view_name()
    }

    /// `DROP VIEW IF EXISTS <view>`
    #[must_use]
    pub fn drop_statement(&self) -> String {
        format!("DROP VIEW IF EXISTS {}", self.name())
    }

    /// `CREATE TEMP VIEW <view> AS SELECT * FROM <table> WHERE ST_CONTAINS(...)`
    #[must_use]
    pub fn create_statement(&self) -> String {
        format!(
            "CREATE TEMP VIEW {} AS SELECT * FROM {} WHERE ST_CONTAINS(ST_GeomFromEWKT({}), geom)",
            self.name(),
            self.table.as_ref(),
            quote_literal(&self.boundary_ewkt),
        )
    }
}

/// Everything needed to query one source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    /// Base table.
    pub table: SourceTable,
    /// Geometry stored in the table.
    pub geometry_type: GeometryType,
    /// View to (re)create before querying.
    pub view: SpatialView,
    /// Category query reading from the view.
    pub select: SelectQuery,
}

/// The full set of statements for one category extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPlan {
    /// One entry per supported source table, in schema order.
    pub tables: Vec<TableQuery>,
}

impl SqlPlan {
    /// Builds the plan for `schema` clipped to `boundary`.
    ///
    /// Tables without a geometry type (relations) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoSourceTables`] if the schema names no
    /// source tables.
    pub fn build(schema: &CategorySchema, boundary: &Boundary) -> Result<Self, QueryError> {
        if schema.source_tables.is_empty() {
            return Err(QueryError::NoSourceTables {
                category: schema.name.clone(),
            });
        }

        let boundary_ewkt = boundary.to_ewkt();
        let tables = schema
            .source_tables
            .iter()
            .filter_map(|&table| {
                let geometry_type = table.geometry_type()?;
                Some(TableQuery {
                    table,
                    geometry_type,
                    view: SpatialView {
                        table,
                        boundary_ewkt: boundary_ewkt.clone(),
                    },
                    select: SelectQuery::for_category(schema, table.view_name()),
                })
            })
            .collect();

        Ok(Self { tables })
    }
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quotes an identifier only when it is not a plain lowercase identifier.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_extract_category::parse_category_yaml;

    fn schema(yaml: &str) -> CategorySchema {
        parse_category_yaml("test", yaml).unwrap()
    }

    fn unit_boundary() -> Boundary {
        Boundary::from_geojson_str(
            r#"{"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]}"#,
        )
        .unwrap()
    }

    #[test]
    fn projects_select_tags_with_trailing_id() {
        let schema = schema(
            "select:\n  tags:\n    - name\n    - amenity\nfrom: [nodes]\nwhere:\n  tags:\n    - amenity: not null\n",
        );
        let query = SelectQuery::for_category(&schema, "nodes").to_string();

        assert_eq!(
            query,
            "SELECT tags->>'name' AS name, tags->>'amenity' AS amenity, osm_id AS id \
             FROM nodes WHERE tags->>'amenity' IS NOT NULL"
        );
        assert!(!query.contains('*'));
    }

    #[test]
    fn empty_select_projects_everything() {
        let schema = schema("from: [ways_poly]\nwhere:\n  tags:\n    - landuse: not null\n");
        let query = SelectQuery::for_category(&schema, "ways_poly").to_string();

        assert_eq!(
            query,
            "SELECT * FROM ways_poly WHERE tags->>'landuse' IS NOT NULL"
        );
        assert!(!query.contains(" AS "));
    }

    #[test]
    fn joins_filters_with_or_and_no_trailing_operator() {
        let schema = schema("from: [nodes]\nwhere:\n  tags:\n    - a: not null\n    - b: not null\n");
        let query = SelectQuery::for_category(&schema, "nodes").to_string();
        let (_, clause) = query.split_once(" WHERE ").unwrap();

        assert_eq!(clause, "tags->>'a' IS NOT NULL OR tags->>'b' IS NOT NULL");
    }

    #[test]
    fn omits_where_without_not_null_filters() {
        let schema = schema("from: [nodes]\nwhere:\n  tags:\n    - amenity: toilets\n");
        let query = SelectQuery::for_category(&schema, "nodes").to_string();

        assert_eq!(query, "SELECT * FROM nodes");
        assert!(!query.contains("WHERE"));
        assert!(!query.ends_with(' '));
    }

    #[test]
    fn honours_column_overrides_and_quotes_aliases() {
        let schema = schema(
            "select:\n  id: way_id\n  tags:\n    - building:levels\n  building:levels: tags->>'levels'\nfrom: [ways_poly]\n",
        );
        let query = SelectQuery::for_category(&schema, "ways_poly").to_string();

        assert_eq!(
            query,
            "SELECT tags->>'levels' AS \"building:levels\", way_id AS id FROM ways_poly"
        );
    }

    #[test]
    fn identifier_override_changes_the_id_column() {
        let by_id = schema("select:\n  id: way_id\n  tags: [name]\nfrom: [ways_poly]\n");
        let by_osm_id = schema("select:\n  osm_id: way_id\n  tags: [name]\nfrom: [ways_poly]\n");

        for schema in [&by_id, &by_osm_id] {
            assert_eq!(
                SelectQuery::for_category(schema, "ways_poly").to_string(),
                "SELECT tags->>'name' AS name, way_id AS id FROM ways_poly"
            );
        }

        let star = schema("select:\n  id: way_id\nfrom: [ways_poly]\n");
        let query = SelectQuery::for_category(&star, "ways_poly_view")
            .with_feature_columns(&star.id_column)
            .to_string();
        assert_eq!(
            query,
            "SELECT ST_AsGeoJSON(geom) AS geometry, way_id AS id, tags::text AS tags FROM ways_poly_view"
        );
    }

    #[test]
    fn feature_columns_prepend_geometry() {
        let schema = schema("select:\n  tags: [name]\nfrom: [nodes]\n");
        let query = SelectQuery::for_category(&schema, "nodes_view")
            .with_feature_columns(&schema.id_column)
            .to_string();

        assert_eq!(
            query,
            "SELECT ST_AsGeoJSON(geom) AS geometry, tags->>'name' AS name, osm_id AS id FROM nodes_view"
        );
    }

    #[test]
    fn feature_columns_replace_star() {
        let schema = schema("from: [nodes]\n");
        let query = SelectQuery::for_category(&schema, "nodes_view")
            .with_feature_columns("osm_id")
            .to_string();

        assert_eq!(
            query,
            "SELECT ST_AsGeoJSON(geom) AS geometry, osm_id AS id, tags::text AS tags FROM nodes_view"
        );
    }

    #[test]
    fn plan_queries_views_and_drops_relations() {
        let schema = schema("from: [nodes, ways_poly, ways_line, relations]\n");
        let plan = SqlPlan::build(&schema, &unit_boundary()).unwrap();

        let types: Vec<GeometryType> = plan.tables.iter().map(|t| t.geometry_type).collect();
        assert_eq!(
            types,
            vec![
                GeometryType::Point,
                GeometryType::Polygon,
                GeometryType::LineString
            ]
        );
        let froms: Vec<&str> = plan.tables.iter().map(|t| t.select.from.as_str()).collect();
        assert_eq!(froms, vec!["nodes_view", "ways_poly_view", "ways_line_view"]);
    }

    #[test]
    fn view_statements() {
        let schema = schema("from: [nodes]\n");
        let plan = SqlPlan::build(&schema, &unit_boundary()).unwrap();
        let view = &plan.tables[0].view;

        assert_eq!(view.drop_statement(), "DROP VIEW IF EXISTS nodes_view");
        let create = view.create_statement();
        assert!(create.starts_with(
            "CREATE TEMP VIEW nodes_view AS SELECT * FROM nodes WHERE \
             ST_CONTAINS(ST_GeomFromEWKT('SRID=4326;POLYGON(("
        ));
        assert!(create.ends_with("'), geom)"));
    }

    #[test]
    fn plan_requires_source_tables() {
        let schema = schema("select:\n  tags: [name]\n");
        let err = SqlPlan::build(&schema, &unit_boundary()).unwrap_err();
        assert!(matches!(err, QueryError::NoSourceTables { .. }));
    }

    #[test]
    fn escapes_quotes_in_literals() {
        assert_eq!(quote_literal("o'neil"), "'o''neil'");
        assert_eq!(quote_identifier("name"), "name");
        assert_eq!(quote_identifier("addr:street"), "\"addr:street\"");
    }
}
