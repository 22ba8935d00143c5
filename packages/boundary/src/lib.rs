#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary polygon used to clip extracted features.
//!
//! The boundary is read from a `GeoJSON` file (a bare geometry, a
//! `Feature`, or a `FeatureCollection` of polygons) in EPSG:4326 and is
//! only ever used read-only: as WKT inside `PostGIS` statements, as a
//! bounding box for Overpass, and as an in-memory containment test for
//! local files.

use std::fmt;
use std::path::Path;

use geo::{BoundingRect, Geometry, MultiPolygon, Polygon, Relate};
use geojson::GeoJson;
use wkt::ToWkt;

/// SRID of every boundary this crate produces.
pub const SRID: u32 = 4326;

/// Errors that can occur while loading a boundary.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    /// The boundary file could not be read.
    #[error("Failed to read boundary {path}: {source}")]
    Io {
        /// Path of the boundary file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid `GeoJSON`.
    #[error("Invalid GeoJSON boundary: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The `GeoJSON` contains something other than polygons.
    #[error("Boundary must be a Polygon or MultiPolygon, found {found}")]
    NotPolygonal {
        /// The geometry type that was found instead.
        found: String,
    },

    /// The `GeoJSON` contains no geometry at all.
    #[error("Boundary contains no geometry")]
    Empty,
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum latitude.
    pub south: f64,
    /// Minimum longitude.
    pub west: f64,
    /// Maximum latitude.
    pub north: f64,
    /// Maximum longitude.
    pub east: f64,
}

impl fmt::Display for BoundingBox {
    /// Overpass ordering: `south,west,north,east`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// A polygonal boundary in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    geometry: Geometry<f64>,
    polygons: MultiPolygon<f64>,
}

impl Boundary {
    /// Reads a boundary from a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the file cannot be read, is not valid
    /// `GeoJSON`, or does not contain polygons.
    pub fn from_file(path: &Path) -> Result<Self, BoundaryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| BoundaryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let boundary = Self::from_geojson_str(&contents)?;
        log::debug!(
            "Loaded boundary from {} ({} polygon(s))",
            path.display(),
            boundary.polygons.0.len()
        );
        Ok(boundary)
    }

    /// Parses a boundary from `GeoJSON` text.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the text is not valid `GeoJSON` or does
    /// not contain polygons.
    pub fn from_geojson_str(text: &str) -> Result<Self, BoundaryError> {
        let geojson: GeoJson = text.parse()?;
        Self::from_geojson(geojson)
    }

    /// Builds a boundary from parsed `GeoJSON`.
    ///
    /// Every polygon found is kept. A single polygon stays a `Polygon`;
    /// anything more becomes a `MultiPolygon`.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the document holds no geometry or a
    /// non-polygonal geometry.
    pub fn from_geojson(geojson: GeoJson) -> Result<Self, BoundaryError> {
        let geometries = match geojson {
            GeoJson::Geometry(geometry) => vec![geometry],
            GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .filter_map(|feature| feature.geometry)
                .collect(),
        };

        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for geometry in geometries {
            let converted: Geometry<f64> = geometry.try_into()?;
            match converted {
                Geometry::Polygon(polygon) => polygons.push(polygon),
                Geometry::MultiPolygon(multi) => polygons.extend(multi.0),
                other => {
                    return Err(BoundaryError::NotPolygonal {
                        found: geometry_name(&other).to_string(),
                    });
                }
            }
        }

        Self::from_polygons(polygons)
    }

    /// Builds a boundary directly from polygons.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::Empty`] if `polygons` is empty.
    pub fn from_polygons(mut polygons: Vec<Polygon<f64>>) -> Result<Self, BoundaryError> {
        let geometry = match polygons.len() {
            0 => return Err(BoundaryError::Empty),
            1 => Geometry::Polygon(polygons.remove(0)),
            _ => Geometry::MultiPolygon(MultiPolygon(polygons)),
        };
        let polygons = match &geometry {
            Geometry::Polygon(polygon) => MultiPolygon(vec![polygon.clone()]),
            Geometry::MultiPolygon(multi) => multi.clone(),
            _ => return Err(BoundaryError::Empty),
        };

        Ok(Self { geometry, polygons })
    }

    /// The boundary as a `geo` geometry.
    #[must_use]
    pub const fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    /// The boundary as `GeoJSON`.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.geometry))
    }

    /// Well-known text, e.g. `POLYGON((0 0,1 0,1 1,0 1,0 0))`.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        self.geometry.wkt_string()
    }

    /// Extended WKT with the SRID prefix, for `ST_GeomFromEWKT`.
    #[must_use]
    pub fn to_ewkt(&self) -> String {
        format!("SRID={SRID};{}", self.to_wkt())
    }

    /// The bounding box of all polygons.
    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        self.polygons.bounding_rect().map_or(
            BoundingBox {
                south: 0.0,
                west: 0.0,
                north: 0.0,
                east: 0.0,
            },
            |rect| BoundingBox {
                south: rect.min().y,
                west: rect.min().x,
                north: rect.max().y,
                east: rect.max().x,
            },
        )
    }

    /// Whether `geometry` lies entirely inside the boundary.
    #[must_use]
    pub fn contains(&self, geometry: &Geometry<f64>) -> bool {
        self.polygons.relate(geometry).is_contains()
    }
}

const fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    const UNIT_SQUARE: &str = r#"{
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[10.0, 20.0], [11.0, 20.0], [11.0, 21.0], [10.0, 21.0], [10.0, 20.0]]]
        }
    }"#;

    #[test]
    fn parses_feature_boundary() {
        let boundary = Boundary::from_geojson_str(UNIT_SQUARE).unwrap();
        assert!(matches!(boundary.geometry(), Geometry::Polygon(_)));
    }

    #[test]
    fn bbox_is_south_west_north_east() {
        let boundary = Boundary::from_geojson_str(UNIT_SQUARE).unwrap();
        let bbox = boundary.bbox();
        assert_eq!(bbox.to_string(), "20,10,21,11");
    }

    #[test]
    fn renders_ewkt() {
        let boundary = Boundary::from_geojson_str(UNIT_SQUARE).unwrap();
        let ewkt = boundary.to_ewkt();
        assert!(ewkt.starts_with("SRID=4326;POLYGON(("), "{ewkt}");
    }

    #[test]
    fn contains_inner_point_only() {
        let boundary = Boundary::from_geojson_str(UNIT_SQUARE).unwrap();
        assert!(boundary.contains(&Geometry::Point(point!(x: 10.5, y: 20.5))));
        assert!(!boundary.contains(&Geometry::Point(point!(x: 12.0, y: 20.5))));
    }

    #[test]
    fn rejects_point_boundary() {
        let err = Boundary::from_geojson_str(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#)
            .unwrap_err();
        assert!(matches!(err, BoundaryError::NotPolygonal { ref found } if found == "Point"));
    }

    #[test]
    fn rejects_empty_collection() {
        let err = Boundary::from_geojson_str(r#"{"type": "FeatureCollection", "features": []}"#)
            .unwrap_err();
        assert!(matches!(err, BoundaryError::Empty));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = Boundary::from_geojson_str("not json").unwrap_err();
        assert!(matches!(err, BoundaryError::GeoJson(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Boundary::from_file(Path::new("/nonexistent/boundary.geojson")).unwrap_err();
        assert!(matches!(err, BoundaryError::Io { .. }));
    }
}
