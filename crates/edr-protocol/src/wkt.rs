//! Well-Known Text geometry parsing for the `coords` query parameter.
//!
//! Geometries are read with the `wkt` crate. The dimension suffix may be
//! glued to the type name (`LINESTRINGM` reads as `LINESTRING M`). Parsed
//! geometries are re-serialized through `wkt` before being handed to the
//! store.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wkt::Wkt;

/// Errors that can occur when parsing WKT.
#[derive(Debug, Error, PartialEq)]
pub enum WktError {
    #[error("invalid WKT: {0}")]
    Syntax(String),

    #[error("{0} geometries are not supported")]
    Unsupported(String),

    #[error("coordinates mix dimensions")]
    MixedDimensions,

    #[error("empty geometries are not supported")]
    Empty,
}

/// Simple feature geometry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    /// Keyword as written in WKT.
    pub fn keyword(&self) -> &'static str {
        match self {
            GeometryType::Point => "POINT",
            GeometryType::MultiPoint => "MULTIPOINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::MultiLineString => "MULTILINESTRING",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPolygon => "MULTIPOLYGON",
        }
    }

    /// GeoJSON type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::LineString => "LineString",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
        }
    }

    // Longest keywords first so MULTIPOINT is not read as MULTI + POINT.
    const BY_KEYWORD_LEN: [GeometryType; 6] = [
        GeometryType::MultiLineString,
        GeometryType::MultiPolygon,
        GeometryType::MultiPoint,
        GeometryType::LineString,
        GeometryType::Polygon,
        GeometryType::Point,
    ];
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

macro_rules! position {
    ($coord:expr) => {
        Position {
            x: $coord.x,
            y: $coord.y,
            z: $coord.z,
            m: $coord.m,
        }
    };
}

/// A parsed `coords` geometry with its dimensionality flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWkt {
    geometry_type: GeometryType,
    positions: Vec<Position>,
    wkt: String,
    pub has_z: bool,
    pub has_m: bool,
}

impl ParsedWkt {
    /// Parse a WKT string (case-insensitive).
    pub fn parse(input: &str) -> Result<Self, WktError> {
        let geometry: Wkt<f64> = normalize_header(input)
            .parse()
            .map_err(|e| WktError::Syntax(format!("{}", e)))?;

        let (geometry_type, positions): (GeometryType, Vec<Position>) = match &geometry {
            Wkt::Point(point) => (GeometryType::Point, point.0.iter().map(|c| position!(c)).collect()),
            Wkt::MultiPoint(multi) => (
                GeometryType::MultiPoint,
                multi.0.iter().filter_map(|p| p.0.as_ref()).map(|c| position!(c)).collect(),
            ),
            Wkt::LineString(line) => {
                (GeometryType::LineString, line.0.iter().map(|c| position!(c)).collect())
            }
            Wkt::MultiLineString(multi) => (
                GeometryType::MultiLineString,
                multi.0.iter().flat_map(|l| l.0.iter()).map(|c| position!(c)).collect(),
            ),
            Wkt::Polygon(polygon) => (
                GeometryType::Polygon,
                polygon.0.iter().flat_map(|r| r.0.iter()).map(|c| position!(c)).collect(),
            ),
            Wkt::MultiPolygon(multi) => (
                GeometryType::MultiPolygon,
                multi
                    .0
                    .iter()
                    .flat_map(|p| p.0.iter())
                    .flat_map(|r| r.0.iter())
                    .map(|c| position!(c))
                    .collect(),
            ),
            Wkt::GeometryCollection(_) => {
                return Err(WktError::Unsupported("GEOMETRYCOLLECTION".to_string()))
            }
        };

        let first = positions.first().ok_or(WktError::Empty)?;
        let (has_z, has_m) = (first.z.is_some(), first.m.is_some());
        if positions
            .iter()
            .any(|p| p.z.is_some() != has_z || p.m.is_some() != has_m)
        {
            return Err(WktError::MixedDimensions);
        }

        Ok(Self {
            geometry_type,
            positions,
            wkt: geometry.to_string(),
            has_z,
            has_m,
        })
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    /// All vertices in document order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// WKT as written by the `wkt` crate, e.g. `LINESTRING ZM(1 2 3 4,5 6 7 8)`.
    pub fn to_wkt(&self) -> String {
        self.wkt.clone()
    }
}

/// Upper-case the type header and split a glued dimension suffix from the
/// keyword. The coordinate body is left as is.
fn normalize_header(input: &str) -> String {
    let trimmed = input.trim();
    let (header, body) = trimmed.split_at(trimmed.find('(').unwrap_or(trimmed.len()));
    let header = header.trim().to_uppercase();

    let header = GeometryType::BY_KEYWORD_LEN
        .iter()
        .map(GeometryType::keyword)
        .find_map(|keyword| {
            header
                .strip_prefix(keyword)
                .map(|suffix| format!("{} {}", keyword, suffix.trim()))
        })
        .unwrap_or(header);

    format!("{}{}", header.trim_end(), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" point ( 1 2 ) "), "POINT( 1 2 )");
        assert_eq!(normalize_header("LINESTRINGM(1 2 3)"), "LINESTRING M(1 2 3)");
        assert_eq!(normalize_header("multipointzm((1 2 3 4))"), "MULTIPOINT ZM((1 2 3 4))");
        assert_eq!(normalize_header("POINT EMPTY"), "POINT EMPTY");
    }

    #[test]
    fn test_parse_point() {
        let wkt = ParsedWkt::parse("POINT(36 1)").unwrap();
        assert_eq!(wkt.geometry_type(), GeometryType::Point);
        assert!(!wkt.has_z && !wkt.has_m);
        assert_eq!(wkt.positions()[0].x, 36.0);
        assert_eq!(ParsedWkt::parse(&wkt.to_wkt()).unwrap(), wkt);
    }

    #[test]
    fn test_parse_lowercase_and_spacing() {
        let wkt = ParsedWkt::parse("  point ( -97.5   35.25 ) ").unwrap();
        assert_eq!(wkt.geometry_type(), GeometryType::Point);
        assert_eq!(wkt.positions()[0].y, 35.25);
    }

    #[test]
    fn test_parse_multipoint() {
        let wkt = ParsedWkt::parse("MULTIPOINT((36 1),(37 2))").unwrap();
        assert_eq!(wkt.geometry_type(), GeometryType::MultiPoint);
        assert_eq!(wkt.positions().len(), 2);
        assert_eq!(wkt.positions()[1].y, 2.0);
    }

    #[test]
    fn test_parse_linestring_m_variants() {
        let joined = ParsedWkt::parse("LINESTRINGM(36 1 1735689600000, 37 2 1735693200000)").unwrap();
        let spaced = ParsedWkt::parse("LINESTRING M (36 1 1735689600000, 37 2 1735693200000)").unwrap();
        assert_eq!(joined, spaced);
        assert!(joined.has_m);
        assert!(!joined.has_z);
        assert_eq!(joined.positions()[1].m, Some(1735693200000.0));
    }

    #[test]
    fn test_parse_linestring_zm() {
        let wkt = ParsedWkt::parse("LINESTRING ZM(36 1 10 1000, 37 2 20 2000)").unwrap();
        assert!(wkt.has_z && wkt.has_m);
        let p = wkt.positions()[0];
        assert_eq!((p.z, p.m), (Some(10.0), Some(1000.0)));
        assert!(wkt.to_wkt().starts_with("LINESTRING ZM"));
        assert_eq!(ParsedWkt::parse(&wkt.to_wkt()).unwrap(), wkt);
    }

    #[test]
    fn test_polygon_and_multipolygon() {
        let poly = ParsedWkt::parse("POLYGON((0 0, 1 0, 1 1, 0 0))").unwrap();
        assert_eq!(poly.geometry_type(), GeometryType::Polygon);
        assert_eq!(poly.positions().len(), 4);

        let multi =
            ParsedWkt::parse("MULTIPOLYGON(((0 0,1 0,1 1,0 0)),((5 5,6 5,6 6,5 5)))").unwrap();
        assert_eq!(multi.geometry_type(), GeometryType::MultiPolygon);
        assert_eq!(multi.positions().len(), 8);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(ParsedWkt::parse("LINESTRING Z (1 2 3, 4 5)").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ParsedWkt::parse("").is_err());
        assert!(ParsedWkt::parse("CIRCLE(1 2)").is_err());
        assert!(ParsedWkt::parse("POINT(1 2").is_err());
        assert!(ParsedWkt::parse("POINT(a b)").is_err());
        assert!(ParsedWkt::parse("POINT EMPTY").is_err());
    }

    #[test]
    fn test_geometry_collection_unsupported() {
        assert!(matches!(
            ParsedWkt::parse("GEOMETRYCOLLECTION(POINT(1 2))"),
            Err(WktError::Unsupported(_))
        ));
    }
}
