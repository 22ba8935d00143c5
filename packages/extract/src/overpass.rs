//! Overpass API backend.
//!
//! Sends one query per extraction over a reused HTTP client. Tagged nodes
//! become points; way geometry is rebuilt from the skeleton nodes that
//! `>; out skel qt;` appends (closed rings become polygons, everything
//! else a linestring). Relations are skipped.

use std::collections::BTreeMap;

use data_extract_boundary::Boundary;
use data_extract_category_models::CategorySchema;
use data_extract_models::{BackendKind, FeatureCollection, RawFeature, RawGeometry};
use data_extract_query::overpass::OverpassQuery;
use serde::Deserialize;

use crate::ExtractError;
use crate::normalize::{normalize, project_tags};

/// Public Overpass endpoint used when none is configured.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// An Overpass JSON response.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    /// Returned elements, in output order.
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// One OSM element.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// A node with coordinates.
    Node {
        /// OSM id.
        id: i64,
        /// Latitude.
        lat: f64,
        /// Longitude.
        lon: f64,
        /// Tags (absent for skeleton output).
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// A way referencing nodes.
    Way {
        /// OSM id.
        id: i64,
        /// Member node ids, in order.
        #[serde(default)]
        nodes: Vec<i64>,
        /// Tags.
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// A relation.
    Relation {
        /// OSM id.
        id: i64,
    },
}

/// Extracts category features from an Overpass endpoint.
pub struct OverpassClient {
    client: reqwest::Client,
    url: String,
}

impl OverpassClient {
    /// Creates a client for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Queries the category inside the boundary's bounding box.
    ///
    /// An answer without any nodes yields an empty collection and a
    /// warning.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::MissingBoundary`] without a boundary
    /// * [`ExtractError::Query`] if the category has no Overpass filter
    /// * [`ExtractError::Http`] or [`ExtractError::Rejected`] if the request
    ///   fails
    /// * [`ExtractError::Json`] if the answer is not Overpass JSON
    pub async fn get_features(
        &self,
        boundary: Option<&Boundary>,
        schema: &CategorySchema,
    ) -> Result<FeatureCollection, ExtractError> {
        let boundary = boundary.ok_or(ExtractError::MissingBoundary {
            backend: BackendKind::Overpass,
        })?;

        log::info!("Extracting features from Overpass...");
        let query = OverpassQuery::for_category(&schema.name, boundary.bbox())?;
        log::debug!("{query}");

        let resp = self
            .client
            .post(&self.url)
            .body(query.request_body())
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Rejected {
                message: format!("Overpass request failed with status {status}: {body}"),
            });
        }
        let body = resp.text().await?;
        let response: OverpassResponse = serde_json::from_str(&body)?;

        let raw = assemble(&response, &schema.select_tags);
        if raw.is_none() {
            log::warn!("No data found in this boundary!");
        }

        raw.unwrap_or_default()
            .iter()
            .map(normalize)
            .collect::<Result<FeatureCollection, _>>()
    }
}

/// Rebuilds features from an Overpass response.
///
/// Returns `None` if the response holds no nodes at all.
#[must_use]
pub fn assemble(response: &OverpassResponse, select_tags: &[String]) -> Option<Vec<RawFeature>> {
    let coords: BTreeMap<i64, [f64; 2]> = response
        .elements
        .iter()
        .filter_map(|element| match element {
            Element::Node { id, lat, lon, .. } => Some((*id, [*lon, *lat])),
            _ => None,
        })
        .collect();

    if coords.is_empty() {
        return None;
    }

    let mut features = Vec::new();

    for element in &response.elements {
        match element {
            Element::Node {
                id, lat, lon, tags, ..
            } => {
                if tags.is_empty() {
                    continue;
                }
                features.push(RawFeature {
                    id: serde_json::Value::from(*id),
                    geometry: RawGeometry::GeoJson(geojson::Geometry::new(
                        geojson::Value::Point(vec![*lon, *lat]),
                    )),
                    tags: project_tags(tags, select_tags),
                });
            }
            Element::Way { id, nodes, tags } => {
                let Some(value) = way_geometry(*id, nodes, &coords) else {
                    continue;
                };
                features.push(RawFeature {
                    id: serde_json::Value::from(*id),
                    geometry: RawGeometry::GeoJson(geojson::Geometry::new(value)),
                    tags: project_tags(tags, select_tags),
                });
            }
            Element::Relation { id } => {
                log::debug!("Skipping relation {id}; relations are not supported");
            }
        }
    }

    Some(features)
}

fn way_geometry(
    id: i64,
    refs: &[i64],
    coords: &BTreeMap<i64, [f64; 2]>,
) -> Option<geojson::Value> {
    let positions: Vec<Vec<f64>> = refs
        .iter()
        .filter_map(|node| coords.get(node).map(|c| c.to_vec()))
        .collect();

    if positions.len() < refs.len() {
        log::debug!(
            "Way {id} is missing {} of {} nodes",
            refs.len() - positions.len(),
            refs.len()
        );
    }
    if positions.len() < 2 {
        return None;
    }

    let closed = refs.len() >= 4 && refs.first() == refs.last() && positions.len() == refs.len();
    if closed {
        Some(geojson::Value::Polygon(vec![positions]))
    } else {
        Some(geojson::Value::LineString(positions))
    }
}
