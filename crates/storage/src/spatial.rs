//! Spatial, temporal and vertical predicate compilation.
//!
//! Every data request compiles to an ordered predicate list:
//! ownership checks (instance, location, item), datetime, the archetype's
//! spatial test, vertical levels, and the non-null geometry guard last.

use edr_protocol::crs::METRIC_SRID;
use edr_protocol::{
    BboxFilter, Collection, Coords, CrsConfig, DataRequest, DatetimeFilter, SpatialRequest,
    VerticalFilter,
};

use crate::predicate::{CompareOp, Geom, Literal, Predicate, Scalar};

/// Stored geometry with its SRID stamped.
fn stored(collection: &Collection) -> Geom {
    Geom::column(&collection.source.geometry_column).set_srid(collection.storage_srid())
}

/// A request geometry parsed in the response CRS, moved to `srid`.
fn request_geometry(coords: &Coords, crs: &CrsConfig, srid: i32) -> Geom {
    Geom::from_text(&coords.wkt, crs.srid)
        .flip_if(crs)
        .transform(srid)
}

/// `bbox` intersection, reprojected from the bbox CRS to storage.
pub fn bbox_filter(collection: &Collection, filter: Option<&BboxFilter>) -> Vec<Predicate> {
    let filter = match filter {
        Some(f) => f,
        None => return Vec::new(),
    };
    let envelope = Geom::FromGeoJson(filter.bbox.to_geojson_polygon())
        .set_srid(filter.crs.srid)
        .transform(collection.storage_srid());
    vec![Predicate::Intersects(stored(collection), envelope)]
}

/// Polygon (area) or point (position) intersection.
pub fn intersects_filter(collection: &Collection, coords: &Coords, crs: &CrsConfig) -> Predicate {
    Predicate::Intersects(
        request_geometry(coords, crs, collection.storage_srid()),
        stored(collection),
    )
}

/// Distance test in the metric projection; `distance_m` is in metres.
pub fn within_distance_filter(
    collection: &Collection,
    coords: &Coords,
    crs: &CrsConfig,
    distance_m: f64,
) -> Predicate {
    Predicate::DWithin(
        request_geometry(coords, crs, METRIC_SRID),
        stored(collection).transform(METRIC_SRID),
        distance_m,
    )
}

/// Line intersection, in 3D when the response CRS has a vertical axis.
pub fn trajectory_filter(collection: &Collection, coords: &Coords, crs: &CrsConfig) -> Predicate {
    let line = request_geometry(coords, crs, collection.storage_srid());
    if crs.has_vertical {
        Predicate::Intersects3d(line, stored(collection))
    } else {
        Predicate::Intersects(line, stored(collection))
    }
}

pub fn datetime_filter(column: &str, filter: Option<&DatetimeFilter>) -> Vec<Predicate> {
    let filter = match filter {
        Some(f) => f,
        None => return Vec::new(),
    };
    let mut predicates = Vec::new();
    if let Some(levels) = &filter.levels {
        predicates.push(Predicate::AnyOf {
            expr: Scalar::column(column),
            values: Literal::Timestamps(levels.clone()),
        });
    }
    if let Some(max) = filter.max {
        predicates.push(Predicate::compare(
            Scalar::column(column),
            CompareOp::Le,
            Literal::Timestamp(max),
        ));
    }
    if let Some(min) = filter.min {
        predicates.push(Predicate::compare(
            Scalar::column(column),
            CompareOp::Ge,
            Literal::Timestamp(min),
        ));
    }
    predicates
}

/// Vertical filter on `ST_Z`. Both bounds compare with `<=`.
pub fn z_filter(geometry_column: &str, filter: Option<&VerticalFilter>) -> Vec<Predicate> {
    let filter = match filter {
        Some(f) => f,
        None => return Vec::new(),
    };
    let mut predicates = Vec::new();
    if let Some(levels) = &filter.levels {
        predicates.push(Predicate::AnyOf {
            expr: Scalar::z_of(geometry_column),
            values: Literal::Floats(levels.clone()),
        });
    }
    for bound in [filter.max, filter.min].into_iter().flatten() {
        predicates.push(Predicate::compare(
            Scalar::z_of(geometry_column),
            CompareOp::Le,
            Literal::Float(bound),
        ));
    }
    predicates
}

/// Rows of one instance (day bucket). `None` when the collection has no time axis.
pub fn instance_filter(collection: &Collection, instance_id: &str) -> Option<Predicate> {
    collection.source.datetime_column.as_deref().map(|column| {
        Predicate::compare(
            Scalar::day_bucket(column),
            CompareOp::Eq,
            Literal::Text(instance_id.to_string()),
        )
    })
}

/// Rows of one location; collections without a location column use the id.
pub fn location_filter(collection: &Collection, location_id: &str) -> Predicate {
    let source = &collection.source;
    let column = source.location_column.as_ref().unwrap_or(&source.id_column);
    Predicate::compare(
        Scalar::column(column),
        CompareOp::Eq,
        Literal::Text(location_id.to_string()),
    )
}

pub fn item_filter(collection: &Collection, item_id: &str) -> Predicate {
    Predicate::compare(
        Scalar::column(&collection.source.id_column),
        CompareOp::Eq,
        Literal::Text(item_id.to_string()),
    )
}

/// Instance, location and item membership.
pub fn ownership_filter(request: &DataRequest) -> Vec<Predicate> {
    let collection = request.collection.as_ref();
    let mut predicates = Vec::new();
    if let Some(instance) = &request.instance_id {
        predicates.extend(instance_filter(collection, instance));
    }
    if let Some(location) = &request.location_id {
        predicates.push(location_filter(collection, location));
    }
    if let Some(item) = &request.item_id {
        predicates.push(item_filter(collection, item));
    }
    predicates
}

/// The full, ordered predicate list of a data request.
pub fn compile_predicates(request: &DataRequest) -> Vec<Predicate> {
    let collection = request.collection.as_ref();
    let geometry_column = collection.source.geometry_column.as_str();
    let crs = &request.crs;

    let mut predicates = ownership_filter(request);

    if let Some(column) = &collection.source.datetime_column {
        predicates.extend(datetime_filter(column, request.datetime.as_ref()));
    }

    match &request.spatial {
        SpatialRequest::Items { bbox } | SpatialRequest::Locations { bbox } => {
            predicates.extend(bbox_filter(collection, bbox.as_ref()));
        }
        SpatialRequest::Cube { bbox } => {
            predicates.extend(bbox_filter(collection, Some(bbox)));
        }
        SpatialRequest::Position { coords } | SpatialRequest::Area { coords } => {
            predicates.push(intersects_filter(collection, coords, crs));
        }
        SpatialRequest::Radius { coords, within_m } => {
            predicates.push(within_distance_filter(collection, coords, crs, *within_m));
        }
        SpatialRequest::Corridor {
            coords,
            width_m,
            height_m,
        } => {
            predicates.push(within_distance_filter(collection, coords, crs, *width_m));
            let height = VerticalFilter {
                max: Some(*height_m),
                ..Default::default()
            };
            predicates.extend(z_filter(geometry_column, Some(&height)));
        }
        SpatialRequest::Trajectory { coords } => {
            predicates.push(trajectory_filter(collection, coords, crs));
        }
    }

    predicates.extend(z_filter(geometry_column, request.vertical.as_ref()));
    predicates.push(Predicate::IsNotNull(Scalar::column(geometry_column)));
    predicates
}
