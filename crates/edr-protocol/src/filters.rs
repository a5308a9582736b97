//! Normalized, typed request filters.
//!
//! These values are produced by the [`normalizer`](crate::normalizer) and
//! consumed once by the storage layer's predicate compiler.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::crs::CrsConfig;
use crate::registry::QueryType;
use crate::wkt::GeometryType;

/// Temporal filter. Levels and min/max may be combined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatetimeFilter {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
    pub levels: Option<Vec<DateTime<Utc>>>,
}

impl DatetimeFilter {
    pub fn levels(levels: Vec<DateTime<Utc>>) -> Self {
        Self {
            levels: Some(levels),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.levels.is_none()
    }
}

/// Vertical filter over the z coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerticalFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub levels: Option<Vec<f64>>,
}

impl VerticalFilter {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.levels.is_none()
    }
}

/// Canonical XY bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Bbox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Closed rectangle intersection test.
    pub fn intersects(&self, other: &Bbox) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    /// The bbox as a GeoJSON Polygon string.
    pub fn to_geojson_polygon(&self) -> String {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [self.xmin, self.ymin],
                [self.xmax, self.ymin],
                [self.xmax, self.ymax],
                [self.xmin, self.ymax],
                [self.xmin, self.ymin],
            ]]
        })
        .to_string()
    }
}

/// A bbox together with the CRS it is expressed in (`bbox-crs`).
#[derive(Debug, Clone, PartialEq)]
pub struct BboxFilter {
    pub bbox: Bbox,
    pub crs: CrsConfig,
}

/// A validated `coords` geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Coords {
    /// Canonical WKT handed to the store.
    pub wkt: String,
    pub geometry_type: GeometryType,
    pub has_z: bool,
    pub has_m: bool,
}

/// The spatial part of a data request, one variant per archetype.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialRequest {
    Items { bbox: Option<BboxFilter> },
    Locations { bbox: Option<BboxFilter> },
    Position { coords: Coords },
    Radius { coords: Coords, within_m: f64 },
    Area { coords: Coords },
    Cube { bbox: BboxFilter },
    Corridor {
        coords: Coords,
        width_m: f64,
        height_m: f64,
    },
    Trajectory { coords: Coords },
}

impl SpatialRequest {
    pub fn query_type(&self) -> QueryType {
        match self {
            SpatialRequest::Items { .. } => QueryType::Items,
            SpatialRequest::Locations { .. } => QueryType::Locations,
            SpatialRequest::Position { .. } => QueryType::Position,
            SpatialRequest::Radius { .. } => QueryType::Radius,
            SpatialRequest::Area { .. } => QueryType::Area,
            SpatialRequest::Cube { .. } => QueryType::Cube,
            SpatialRequest::Corridor { .. } => QueryType::Corridor,
            SpatialRequest::Trajectory { .. } => QueryType::Trajectory,
        }
    }
}

/// Page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

/// Render a timestamp the way JavaScript's `toISOString` does.
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bbox_intersects() {
        let world = Bbox::new(-180.0, -90.0, 180.0, 90.0);
        let kenya = Bbox::new(33.9, -4.7, 41.9, 5.0);
        let pacific = Bbox::new(-170.0, -10.0, -150.0, 10.0);
        assert!(world.intersects(&kenya));
        assert!(kenya.intersects(&world));
        assert!(!kenya.intersects(&pacific));
        // Touching edges intersect.
        assert!(Bbox::new(0.0, 0.0, 1.0, 1.0).intersects(&Bbox::new(1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn test_bbox_polygon_is_closed() {
        let json: serde_json::Value =
            serde_json::from_str(&Bbox::new(1.0, 2.0, 3.0, 4.0).to_geojson_polygon()).unwrap();
        let ring = json["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(json["type"], "Polygon");
    }

    #[test]
    fn test_to_iso_matches_js() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_iso(&dt), "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_empty_filters() {
        assert!(DatetimeFilter::default().is_empty());
        assert!(!DatetimeFilter::levels(vec![Utc::now()]).is_empty());
        assert!(VerticalFilter::default().is_empty());
    }
}
