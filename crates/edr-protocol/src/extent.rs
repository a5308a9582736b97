//! Collection-level extent filtering and extent documents.
//!
//! A collection (or instance) is listed only when its aggregate extent
//! intersects the request's bbox, datetime and z filters. Each check
//! passes when either the request filter or the aggregate value is absent.

use crate::crs::CrsConfig;
use crate::filters::{to_iso, Bbox, DatetimeFilter, VerticalFilter};
use crate::rows::ExtentRow;
use crate::types::{Extent, SpatialExtent, TemporalExtent, VerticalExtent};

/// Rectangle intersection of the aggregate extent with the request bbox.
pub fn filter_by_bbox(row: &ExtentRow, bbox: Option<&Bbox>) -> bool {
    match (bbox, row.bbox()) {
        (Some(request), Some([xmin, ymin, xmax, ymax])) => {
            Bbox::new(xmin, ymin, xmax, ymax).intersects(request)
        }
        _ => true,
    }
}

/// Temporal intersection: requested levels must all be recorded, the
/// request window must overlap `[tmin, tmax]`.
pub fn filter_by_datetime(row: &ExtentRow, datetime: Option<&DatetimeFilter>) -> bool {
    let datetime = match datetime {
        Some(d) => d,
        None => return true,
    };

    let levels = match (&datetime.levels, row.tvalues.is_empty()) {
        (Some(levels), false) => levels.iter().all(|l| row.tvalues.contains(l)),
        _ => true,
    };
    let max = match (datetime.max, row.tmin) {
        (Some(max), Some(tmin)) => max >= tmin,
        _ => true,
    };
    let min = match (datetime.min, row.tmax) {
        (Some(min), Some(tmax)) => min <= tmax,
        _ => true,
    };
    levels && max && min
}

/// Vertical intersection, analogous to [`filter_by_datetime`].
pub fn filter_by_z(row: &ExtentRow, z: Option<&VerticalFilter>) -> bool {
    let z = match z {
        Some(z) => z,
        None => return true,
    };

    let levels = match (&z.levels, row.zvalues.is_empty()) {
        (Some(levels), false) => levels
            .iter()
            .all(|l| row.zvalues.iter().any(|v| (v - l).abs() < f64::EPSILON)),
        _ => true,
    };
    let max = match (z.max, row.zmin) {
        (Some(max), Some(zmin)) => max >= zmin,
        _ => true,
    };
    let min = match (z.min, row.zmax) {
        (Some(min), Some(zmax)) => min <= zmax,
        _ => true,
    };
    levels && max && min
}

/// Request filters applied to collection and instance listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtentFilter {
    pub bbox: Option<Bbox>,
    pub datetime: Option<DatetimeFilter>,
    pub vertical: Option<VerticalFilter>,
}

impl ExtentFilter {
    pub fn matches(&self, row: &ExtentRow) -> bool {
        filter_by_bbox(row, self.bbox.as_ref())
            && filter_by_datetime(row, self.datetime.as_ref())
            && filter_by_z(row, self.vertical.as_ref())
    }
}

/// Render an aggregate extent in the response CRS.
pub fn to_extent(row: &ExtentRow, crs: &CrsConfig) -> Extent {
    let spatial = row.bbox().map(|bbox| SpatialExtent {
        bbox: vec![bbox.to_vec()],
        crs: crs.uri.clone(),
    });

    let temporal = if row.tmin.is_some() || row.tmax.is_some() || !row.tvalues.is_empty() {
        let mut temporal = TemporalExtent::new(row.tmin.as_ref().map(to_iso), row.tmax.as_ref().map(to_iso));
        if !row.tvalues.is_empty() {
            temporal = temporal.with_values(row.tvalues.iter().map(to_iso).collect());
        }
        Some(temporal)
    } else {
        None
    };

    let mut vertical = VerticalExtent::new(row.zmin, row.zmax, crs.uri.clone());
    if !row.zvalues.is_empty() {
        vertical = vertical.with_values(&row.zvalues);
    }

    Extent {
        spatial,
        temporal,
        vertical: Some(vertical),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{CrsRegistry, CRS84};
    use chrono::{TimeZone, Utc};

    fn row() -> ExtentRow {
        ExtentRow {
            id: "isd-2025".to_string(),
            tmin: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            tmax: Some(Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()),
            tvalues: vec![
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap(),
            ],
            zmin: Some(10.0),
            zmax: Some(1800.0),
            zvalues: vec![10.0, 1800.0],
            xmin: Some(33.9),
            ymin: Some(-4.7),
            xmax: Some(41.9),
            ymax: Some(5.0),
        }
    }

    #[test]
    fn test_absent_filters_pass() {
        assert!(ExtentFilter::default().matches(&row()));
        assert!(ExtentFilter::default().matches(&ExtentRow::default()));
    }

    #[test]
    fn test_bbox_filter() {
        let r = row();
        assert!(filter_by_bbox(&r, Some(&Bbox::new(30.0, -10.0, 35.0, 0.0))));
        assert!(!filter_by_bbox(&r, Some(&Bbox::new(-10.0, 40.0, 0.0, 50.0))));
    }

    #[test]
    fn test_datetime_filter_intersection() {
        let r = row();
        let before = DatetimeFilter {
            max: Some(Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(!filter_by_datetime(&r, Some(&before)));

        let overlapping = DatetimeFilter {
            min: Some(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()),
            max: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            levels: None,
        };
        assert!(filter_by_datetime(&r, Some(&overlapping)));

        let after = DatetimeFilter {
            min: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(!filter_by_datetime(&r, Some(&after)));
    }

    #[test]
    fn test_datetime_levels_subset() {
        let r = row();
        let recorded = DatetimeFilter::levels(vec![Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()]);
        assert!(filter_by_datetime(&r, Some(&recorded)));
        let missing = DatetimeFilter::levels(vec![Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap()]);
        assert!(!filter_by_datetime(&r, Some(&missing)));
    }

    #[test]
    fn test_z_filter() {
        let r = row();
        let levels = VerticalFilter {
            levels: Some(vec![10.0]),
            ..Default::default()
        };
        assert!(filter_by_z(&r, Some(&levels)));
        let above = VerticalFilter {
            min: Some(2000.0),
            max: Some(3000.0),
            levels: None,
        };
        assert!(!filter_by_z(&r, Some(&above)));
    }

    #[test]
    fn test_to_extent() {
        let registry = CrsRegistry::builtin();
        let extent = to_extent(&row(), registry.resolve(CRS84).unwrap());
        let spatial = extent.spatial.unwrap();
        assert_eq!(spatial.bbox, vec![vec![33.9, -4.7, 41.9, 5.0]]);
        let temporal = extent.temporal.unwrap();
        assert_eq!(
            temporal.interval[0][0].as_deref(),
            Some("2025-01-01T00:00:00.000Z")
        );
        assert_eq!(temporal.values.unwrap().len(), 2);
        assert_eq!(extent.vertical.unwrap().values.unwrap(), ["10", "1800"]);
    }

    #[test]
    fn test_to_extent_without_time() {
        let registry = CrsRegistry::builtin();
        let r = ExtentRow {
            id: "mountains".to_string(),
            ..Default::default()
        };
        let extent = to_extent(&r, registry.resolve(CRS84).unwrap());
        assert!(extent.spatial.is_none());
        assert!(extent.temporal.is_none());
    }
}
