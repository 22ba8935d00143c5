//! Overpass QL query construction.
//!
//! Each category maps to a fixed tag filter. The query asks for ways,
//! nodes, and relations matching that filter inside the boundary's
//! bounding box, then recurses down to the member nodes so way geometry
//! can be rebuilt:
//!
//! ```text
//! (way[amenity=toilets](s,w,n,e); node[amenity=toilets](s,w,n,e); relation[amenity=toilets](s,w,n,e);); out body; >; out skel qt;
//! ```

use std::fmt;

use data_extract_boundary::BoundingBox;

use crate::QueryError;

/// Output format prefix sent ahead of every query.
pub const JSON_OUTPUT: &str = "[out:json];";

/// One bracketed tag condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    /// `key` (tag present with any value)
    Exists(String),
    /// `key=value`
    Equals {
        /// Tag key.
        key: String,
        /// Required value.
        value: String,
    },
    /// `key='value'`
    Quoted {
        /// Tag key.
        key: String,
        /// Required value, single-quoted.
        value: String,
    },
    /// `key~"pattern"`
    Matches {
        /// Tag key.
        key: String,
        /// Regular expression the value must match.
        pattern: String,
    },
}

impl TagFilter {
    fn exists(key: &str) -> Self {
        Self::Exists(key.to_string())
    }

    fn equals(key: &str, value: &str) -> Self {
        Self::Equals {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn quoted(key: &str, value: &str) -> Self {
        Self::Quoted {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn matches(key: &str, pattern: &str) -> Self {
        Self::Matches {
            key: key.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists(key) => f.write_str(key),
            Self::Equals { key, value } => write!(f, "{key}={value}"),
            Self::Quoted { key, value } => write!(f, "{key}='{value}'"),
            Self::Matches { key, pattern } => write!(f, "{key}~\"{pattern}\""),
        }
    }
}

/// A conjunction of tag conditions, rendered as `[a][b]...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassFilter(pub Vec<TagFilter>);

impl fmt::Display for OverpassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for condition in &self.0 {
            write!(f, "[{condition}]")?;
        }
        Ok(())
    }
}

impl OverpassFilter {
    /// The fixed filter for `category`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedCategory`] if the category has no
    /// filter, so an unfiltered query is never sent.
    pub fn for_category(category: &str) -> Result<Self, QueryError> {
        let conditions = match category {
            "buildings" => vec![TagFilter::exists("building")],
            "amenities" => vec![TagFilter::exists("amenity")],
            "toilets" => vec![TagFilter::equals("amenity", "toilets")],
            "landuse" => vec![TagFilter::exists("landuse")],
            "emergency" => vec![TagFilter::exists("emergency")],
            "shops" => vec![TagFilter::exists("shop")],
            "waste" => vec![TagFilter::matches("amenity", "^waste_")],
            "water" => vec![TagFilter::equals("amenity", "water_point")],
            "education" => vec![TagFilter::matches("amenity", "^(school|kindergarten)$")],
            "healthcare" => vec![
                TagFilter::quoted("healthcare", "*"),
                TagFilter::quoted("social_facility", "*"),
                TagFilter::quoted("healthcare:speciality", "*"),
            ],
            _ => {
                return Err(QueryError::UnsupportedCategory {
                    category: category.to_string(),
                    backend: "overpass",
                });
            }
        };

        Ok(Self(conditions))
    }
}

/// A complete Overpass query over a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassQuery {
    /// Tag filter applied to every element type.
    pub filter: OverpassFilter,
    /// Area to search.
    pub bbox: BoundingBox,
}

impl OverpassQuery {
    /// Builds the query for `category` over `bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedCategory`] for categories without a
    /// filter.
    pub fn for_category(category: &str, bbox: BoundingBox) -> Result<Self, QueryError> {
        Ok(Self {
            filter: OverpassFilter::for_category(category)?,
            bbox,
        })
    }

    /// The request body: JSON output directive followed by the query.
    #[must_use]
    pub fn request_body(&self) -> String {
        format!("{JSON_OUTPUT}{self}")
    }
}

impl fmt::Display for OverpassQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { filter, bbox } = self;
        write!(
            f,
            "(way{filter}({bbox}); node{filter}({bbox}); relation{filter}({bbox}););\
             \x20out body; >; out skel qt;"
        )
    }
}
