//! Postgres/PostGIS backend.
//!
//! Expects the OSM import schema: `nodes`, `ways_poly`, and `ways_line`
//! tables, each with a `tags` JSON column, an `osm_id`, and a `geom`
//! column in EPSG:4326. Every call re-creates one temporary view per
//! table clipped to the boundary and queries the views in schema order
//! over the single connection.

use std::collections::BTreeMap;

use data_extract_boundary::Boundary;
use data_extract_category_models::CategorySchema;
use data_extract_models::{BackendKind, FeatureCollection, RawFeature, RawGeometry};
use data_extract_query::raw_data::RawDataRequest;
use data_extract_query::sql::{
    GEOMETRY_ALIAS, ID_ALIAS, Projection, SelectQuery, SqlPlan, TAGS_ALIAS,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, Row};
use switchy_database_connection::Credentials;

use crate::ExtractError;
use crate::normalize::normalize;

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Database host.
    pub host: String,
    /// Database name.
    pub dbname: String,
    /// Role to connect as.
    pub user: String,
    /// Password, if any.
    pub password: Option<String>,
    /// Full connection URL. Takes precedence over the other fields.
    pub url: Option<String>,
}

impl PostgresConfig {
    /// Builds a config for `host`/`dbname`, reading `DATABASE_URL`,
    /// `PGUSER`, and `PGPASSWORD` from the environment.
    #[must_use]
    pub fn from_env(host: &str, dbname: &str) -> Self {
        Self {
            host: host.to_string(),
            dbname: dbname.to_string(),
            user: std::env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("PGPASSWORD").ok(),
            url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// The `postgres://` URL to connect with.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            // Strip query parameters (e.g. ?sslmode=require) that the
            // Credentials parser doesn't understand.
            return url.split('?').next().unwrap_or(url).to_string();
        }

        let password = self.password.as_deref().unwrap_or_default();
        format!(
            "postgres://{}:{password}@{}/{}",
            self.user, self.host, self.dbname
        )
    }
}

/// Extracts category features from a PostGIS database.
pub struct PostgresClient {
    db: Option<Box<dyn Database>>,
}

impl PostgresClient {
    /// Opens the connection.
    ///
    /// A failed connection is logged and not retried; the client is still
    /// returned, and every later [`Self::get_features`] call fails with
    /// [`ExtractError::Connection`].
    pub async fn connect(config: &PostgresConfig) -> Self {
        log::info!(
            "Opening database connection to {} ({})",
            config.host,
            config.dbname
        );

        match open(config).await {
            Ok(db) => {
                log::info!("Opened connection to {}", config.dbname);
                Self { db: Some(db) }
            }
            Err(e) => {
                log::error!("Couldn't connect to database: {e}");
                Self { db: None }
            }
        }
    }

    /// Whether the connection was established.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    /// Queries every supported source table of `schema` inside `boundary`.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::Connection`] if the client never connected
    /// * [`ExtractError::MissingBoundary`] without a boundary
    /// * [`ExtractError::Database`] if a statement fails
    /// * [`ExtractError::Conversion`] or [`ExtractError::Geometry`] if a
    ///   row cannot be normalized
    pub async fn get_features(
        &self,
        boundary: Option<&Boundary>,
        schema: &CategorySchema,
    ) -> Result<FeatureCollection, ExtractError> {
        let db = self.db.as_deref().ok_or_else(|| ExtractError::Connection {
            message: "no database connection".to_string(),
        })?;
        let boundary = boundary.ok_or(ExtractError::MissingBoundary {
            backend: BackendKind::Postgres,
        })?;

        log::info!("Extracting features from Postgres...");
        let plan = SqlPlan::build(schema, boundary)?;
        let request = RawDataRequest::for_category(schema, boundary);
        log::debug!("Raw data request for '{}': {}", schema.name, request.to_json()?);

        let mut collection = FeatureCollection::new();

        for table in &plan.tables {
            db.exec_raw(&table.view.drop_statement()).await?;
            db.exec_raw(&table.view.create_statement()).await?;

            let query = table.select.with_feature_columns(&schema.id_column);
            let sql = query.to_string();
            log::debug!("Querying table {}: {sql}", table.table);

            let rows = db.query_raw_params(&sql, &[]).await?;
            log::info!("Query on {} returned {} records", table.table, rows.len());

            for row in &rows {
                let raw = raw_feature(row, &table.select, schema)?;
                collection.push(normalize(&raw)?);
            }
        }

        Ok(collection)
    }
}

async fn open(config: &PostgresConfig) -> Result<Box<dyn Database>, ExtractError> {
    let creds =
        Credentials::from_url(&config.connection_url()).map_err(|e| ExtractError::Connection {
            message: format!("invalid connection URL: {e}"),
        })?;

    switchy_database_connection::init_postgres_raw_native_tls(creds)
        .await
        .map_err(|e| ExtractError::Connection {
            message: e.to_string(),
        })
}

/// Reads one result row of a feature query.
fn raw_feature(
    row: &Row,
    select: &SelectQuery,
    schema: &CategorySchema,
) -> Result<RawFeature, ExtractError> {
    let geometry: String = row
        .to_value(GEOMETRY_ALIAS)
        .map_err(|e| ExtractError::Conversion {
            message: format!("Failed to read geometry: {e}"),
        })?;
    let id: i64 = row.to_value(ID_ALIAS).map_err(|e| ExtractError::Conversion {
        message: format!("Failed to read id: {e}"),
    })?;

    let tags = match select.projection {
        Projection::All => {
            let text: Option<String> =
                row.to_value(TAGS_ALIAS).map_err(|e| ExtractError::Conversion {
                    message: format!("Failed to read tags of {id}: {e}"),
                })?;
            tags_from_json(text.as_deref())?
        }
        Projection::Columns(_) => schema
            .select_tags
            .iter()
            .map(|tag| {
                let value: Option<String> = row.to_value(tag.as_str()).unwrap_or(None);
                (
                    tag.clone(),
                    value.map_or(serde_json::Value::Null, serde_json::Value::String),
                )
            })
            .collect(),
    };

    Ok(RawFeature {
        id: serde_json::Value::from(id),
        geometry: RawGeometry::GeoJsonText(geometry),
        tags,
    })
}

/// Parses the `tags::text` column into a tag map. `NULL` means no tags.
fn tags_from_json(
    text: Option<&str>,
) -> Result<BTreeMap<String, serde_json::Value>, ExtractError> {
    let Some(text) = text else {
        return Ok(BTreeMap::new());
    };

    Ok(serde_json::from_str(text)?)
}
