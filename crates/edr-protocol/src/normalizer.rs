//! Query parameter normalization.
//!
//! Raw query strings are turned into typed filters by a sequence of pure
//! functions. Each stage reads the raw query plus the registries and returns
//! a new value; [`normalize`] composes them and resolves precedence (an
//! explicit `z` supersedes the vertical range of a 6-value `bbox`, and
//! M-valued `coords` supply datetime levels).
//!
//! Every failure is an [`EdrError`] naming the offending query parameter and
//! is raised before any query executes.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::crs::{AxisOrder, CrsConfig};
use crate::errors::EdrError;
use crate::filters::{
    Bbox, BboxFilter, Coords, DatetimeFilter, Pagination, SpatialRequest, VerticalFilter,
};
use crate::format::OutputFormat;
use crate::registry::{Collection, ParameterConfig, QueryType};
use crate::units::parse_unit_conversion;
use crate::wkt::{GeometryType, ParsedWkt};

/// Default page size of data and item queries.
pub const DEFAULT_LIMIT: i64 = 20;
/// Advertised maximum page size.
pub const MAX_LIMIT: i64 = 100;
/// Upper bound on the number of levels an `R<n>/start/step` expression may expand to.
pub const MAX_RECURRING_LEVELS: u32 = 1000;

/// Query parameters in request order, already percent-decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery {
    pairs: Vec<(String, String)>,
}

impl RawQuery {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value of `key`; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// A value that must be present.
    pub fn require(&self, key: &str) -> Result<&str, EdrError> {
        self.get(key)
            .ok_or_else(|| EdrError::MissingParameter(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }
}

/// Which endpoint of an archetype was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The archetype's collection-level query (`/position`, `/items`, ...).
    Query,
    /// A single item or location (`/items/{id}`, `/locations/{id}`).
    Single,
}

/// Query parameters each operation declares. Anything else is rejected.
pub fn declared_parameters(query_type: QueryType, endpoint: Endpoint) -> &'static [&'static str] {
    const COMMON: &[&str] = &["f", "crs", "parameter-name", "datetime", "z", "limit", "offset"];
    match (query_type, endpoint) {
        (QueryType::Items | QueryType::Locations, Endpoint::Single) => COMMON,
        (QueryType::Items | QueryType::Locations, Endpoint::Query) => &[
            "f", "crs", "parameter-name", "datetime", "z", "limit", "offset", "bbox", "bbox-crs",
        ],
        (QueryType::Position | QueryType::Area | QueryType::Trajectory, _) => &[
            "f", "crs", "parameter-name", "datetime", "z", "limit", "offset", "coords",
        ],
        (QueryType::Radius, _) => &[
            "f", "crs", "parameter-name", "datetime", "z", "limit", "offset", "coords", "within",
            "within-units",
        ],
        (QueryType::Corridor, _) => &[
            "f", "crs", "parameter-name", "datetime", "z", "limit", "offset", "coords",
            "corridor-width", "width-units", "corridor-height", "height-units",
        ],
        (QueryType::Cube, _) => &[
            "f", "crs", "parameter-name", "datetime", "z", "limit", "offset", "bbox", "bbox-crs",
        ],
        (QueryType::Instances, _) => &["f", "crs", "bbox", "datetime", "z"],
    }
}

/// Reject the first query parameter the operation does not declare.
pub fn check_unexpected_parameters(query: &RawQuery, declared: &[&str]) -> Result<(), EdrError> {
    match query.keys().find(|k| !declared.contains(k)) {
        Some(key) => Err(EdrError::UnexpectedQueryParameter(key.to_string())),
        None => Ok(()),
    }
}

/// Resolve a CRS URI against the collection's allowed list.
///
/// Absent values default to CRS84, which every collection allows.
pub fn parse_crs(
    raw: Option<&str>,
    parameter: &str,
    collection: &Collection,
) -> Result<CrsConfig, EdrError> {
    let uri = match raw {
        None => return Ok(default_crs(collection)),
        Some(uri) => uri.trim(),
    };

    collection
        .resolve_crs(uri)
        .cloned()
        .ok_or_else(|| EdrError::InvalidCrs {
            parameter: parameter.to_string(),
            value: uri.to_string(),
            allowed: collection.crs_uris().join(", "),
        })
}

fn default_crs(collection: &Collection) -> CrsConfig {
    collection
        .resolve_crs(crate::crs::CRS84)
        .cloned()
        .unwrap_or_else(|| collection.supported_crs[0].clone())
}

/// Parse a 4 or 6 value bbox into canonical XY order.
///
/// A 6-value bbox also yields a vertical range `{min: v[2], max: v[5]}`.
pub fn parse_bbox(
    raw: &str,
    axis_order: AxisOrder,
) -> Result<(Bbox, Option<VerticalFilter>), EdrError> {
    let values = raw
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| EdrError::InvalidBbox(format!("invalid number '{}'", s.trim())))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let flip = axis_order == AxisOrder::Yx;
    match values.len() {
        4 => {
            let idx = if flip { [1, 0, 3, 2] } else { [0, 1, 2, 3] };
            let bbox = Bbox::new(values[idx[0]], values[idx[1]], values[idx[2]], values[idx[3]]);
            Ok((bbox, None))
        }
        6 => {
            let idx = if flip { [1, 0, 4, 3] } else { [0, 1, 3, 4] };
            let bbox = Bbox::new(values[idx[0]], values[idx[1]], values[idx[2]], values[idx[3]]);
            let vertical = VerticalFilter {
                min: Some(values[2]),
                max: Some(values[5]),
                levels: None,
            };
            Ok((bbox, Some(vertical)))
        }
        n => Err(EdrError::InvalidBbox(format!(
            "expected 4 or 6 comma separated numbers, found {}",
            n
        ))),
    }
}

/// Parse a single timestamp literal into UTC.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and plain dates.
pub fn parse_datetime_value(raw: &str) -> Result<DateTime<Utc>, EdrError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(EdrError::InvalidDatetime(format!("invalid date '{}'", raw)))
}

fn is_open(bound: &str) -> bool {
    let bound = bound.trim();
    bound.is_empty() || bound == ".."
}

/// Parse the `datetime` grammar.
///
/// - `A` → levels `[A]`
/// - `A,B,...` → levels
/// - `A/B` → `{min: A, max: B}`
/// - `../B` → `{max: B}`; `A/..` → `{min: A}`
pub fn parse_datetime(raw: &str) -> Result<DatetimeFilter, EdrError> {
    let raw = raw.trim();

    if raw.contains('/') {
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() != 2 {
            return Err(EdrError::InvalidDatetime(
                "interval must have the form start/end".to_string(),
            ));
        }
        let (start, end) = (parts[0], parts[1]);
        if is_open(start) && is_open(end) {
            return Err(EdrError::InvalidDatetime(
                "interval must have at least one closed end".to_string(),
            ));
        }
        let min = if is_open(start) {
            None
        } else {
            Some(parse_datetime_value(start)?)
        };
        let max = if is_open(end) {
            None
        } else {
            Some(parse_datetime_value(end)?)
        };
        return Ok(DatetimeFilter {
            min,
            max,
            levels: None,
        });
    }

    let levels = raw
        .split(',')
        .map(parse_datetime_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DatetimeFilter::levels(levels))
}

fn parse_z_number(raw: &str) -> Result<f64, EdrError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EdrError::InvalidZ(format!("invalid number '{}'", raw.trim())))
}

/// Parse the `z` grammar.
///
/// - `v` → levels `[v]`
/// - `a,b,...` → levels
/// - `a/b` → `{min: a, max: b}`
/// - `R<n>/<start>/<step>` → the `n + 1` levels `start, start + step, ..., start + n*step`
pub fn parse_vertical(raw: &str) -> Result<VerticalFilter, EdrError> {
    let raw = raw.trim();

    if let Some(rest) = raw.strip_prefix('R').or_else(|| raw.strip_prefix('r')) {
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 3 {
            return Err(EdrError::InvalidZ(
                "recurring levels must have the form R<count>/<start>/<step>".to_string(),
            ));
        }
        let count: u32 = parts[0]
            .trim()
            .parse()
            .map_err(|_| EdrError::InvalidZ(format!("invalid count '{}'", parts[0])))?;
        if count >= MAX_RECURRING_LEVELS {
            return Err(EdrError::InvalidZ(format!(
                "recurring count must be below {}",
                MAX_RECURRING_LEVELS
            )));
        }
        let start = parse_z_number(parts[1])?;
        let step = parse_z_number(parts[2])?;
        let levels = (0..=count).map(|i| start + f64::from(i) * step).collect();
        return Ok(VerticalFilter {
            levels: Some(levels),
            ..Default::default()
        });
    }

    if raw.contains('/') {
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() != 2 {
            return Err(EdrError::InvalidZ("range must have the form min/max".to_string()));
        }
        return Ok(VerticalFilter {
            min: Some(parse_z_number(parts[0])?),
            max: Some(parse_z_number(parts[1])?),
            levels: None,
        });
    }

    let levels = raw
        .split(',')
        .map(parse_z_number)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VerticalFilter {
        levels: Some(levels),
        ..Default::default()
    })
}

/// Parse and validate `coords` for an archetype.
///
/// For line geometries an M channel is read as per-vertex epoch
/// milliseconds and returned as datetime levels. An M-valued line together
/// with an explicit `datetime`, or a Z-valued line together with an explicit
/// `z`, is rejected.
pub fn parse_coords(
    raw: &str,
    query_type: QueryType,
    datetime_given: bool,
    z_given: bool,
) -> Result<(Coords, Option<DatetimeFilter>), EdrError> {
    let parsed = ParsedWkt::parse(raw).map_err(|e| EdrError::InvalidCoordsWkt(e.to_string()))?;
    let geometry_type = parsed.geometry_type();

    let mut implied_datetime = None;
    if matches!(
        geometry_type,
        GeometryType::LineString | GeometryType::MultiLineString
    ) {
        if datetime_given && parsed.has_m {
            return Err(EdrError::ConflictingTemporalOrVerticalSpec {
                parameter: "coords".to_string(),
                detail: "a temporal coords wkt and datetime cannot be paired in a request"
                    .to_string(),
            });
        }
        if z_given && parsed.has_z {
            return Err(EdrError::ConflictingTemporalOrVerticalSpec {
                parameter: "coords".to_string(),
                detail: "a vertical coords wkt and z cannot be paired in a request".to_string(),
            });
        }
        if parsed.has_m {
            let levels = parsed
                .positions()
                .iter()
                .map(|p| {
                    let millis = p.m.unwrap_or_default();
                    DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
                        EdrError::InvalidCoordsWkt(format!("M value {} is not a valid time", millis))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            implied_datetime = Some(DatetimeFilter::levels(levels));
        }
    }

    if !query_type.allowed_geometry_types().contains(&geometry_type) {
        return Err(EdrError::InvalidCoordsWkt(format!(
            "{} geometry type not allowed on {} query_type",
            geometry_type, query_type
        )));
    }

    let coords = Coords {
        wkt: parsed.to_wkt(),
        geometry_type,
        has_z: parsed.has_z,
        has_m: parsed.has_m,
    };
    Ok((coords, implied_datetime))
}

/// Select parameters by `parameter-name`.
///
/// An absent value selects every declared parameter. The result always
/// follows declaration order.
pub fn parse_parameter_names(
    raw: Option<&str>,
    collection: &Collection,
) -> Result<Vec<ParameterConfig>, EdrError> {
    let requested: Vec<&str> = match raw {
        None => return Ok(collection.parameters.clone()),
        Some(raw) => raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect(),
    };

    if requested.iter().any(|name| collection.parameter(name).is_none()) {
        let valid: Vec<&str> = collection.parameters.iter().map(|p| p.id.as_str()).collect();
        return Err(EdrError::InvalidParameterName(format!(
            "invalid parameter-name items requested. Valid parameter-names may include: {}",
            valid.join(", ")
        )));
    }

    Ok(collection
        .parameters
        .iter()
        .filter(|p| requested.contains(&p.id.as_str()))
        .cloned()
        .collect())
}

/// Parse `offset` and `limit`.
///
/// Non-numeric or negative offsets fall back to 0 and limits to
/// `default_limit`. Limits above `max_limit` are passed through unchanged.
pub fn parse_pagination(
    offset_raw: Option<&str>,
    limit_raw: Option<&str>,
    default_limit: i64,
    max_limit: i64,
) -> Pagination {
    let offset = offset_raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(0);
    let limit = limit_raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(default_limit);
    debug_assert!(default_limit <= max_limit);
    Pagination { offset, limit }
}

/// Path context of a data request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub collection: Arc<Collection>,
    pub query_type: QueryType,
    pub endpoint: Endpoint,
    pub instance_id: Option<String>,
    pub location_id: Option<String>,
    pub item_id: Option<String>,
}

impl RequestContext {
    pub fn new(collection: Arc<Collection>, query_type: QueryType) -> Self {
        Self {
            collection,
            query_type,
            endpoint: Endpoint::Query,
            instance_id: None,
            location_id: None,
            item_id: None,
        }
    }

    pub fn with_instance(mut self, instance_id: Option<String>) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self.endpoint = Endpoint::Single;
        self
    }

    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self.endpoint = Endpoint::Single;
        self
    }
}

/// A fully normalized data request.
#[derive(Debug, Clone)]
pub struct DataRequest {
    pub collection: Arc<Collection>,
    pub spatial: SpatialRequest,
    /// Response CRS.
    pub crs: CrsConfig,
    pub datetime: Option<DatetimeFilter>,
    pub vertical: Option<VerticalFilter>,
    /// Selected parameters in declaration order.
    pub parameters: Vec<ParameterConfig>,
    pub format: OutputFormat,
    /// Formats the operation declares, for alternate links.
    pub output_formats: Vec<OutputFormat>,
    pub pagination: Pagination,
    pub instance_id: Option<String>,
    pub location_id: Option<String>,
    pub item_id: Option<String>,
}

impl DataRequest {
    pub fn query_type(&self) -> QueryType {
        self.spatial.query_type()
    }
}

fn optional_bbox(
    query: &RawQuery,
    collection: &Collection,
) -> Result<(Option<BboxFilter>, Option<VerticalFilter>), EdrError> {
    match query.get("bbox") {
        None => Ok((None, None)),
        Some(raw) => {
            let crs = parse_crs(query.get("bbox-crs"), "bbox-crs", collection)?;
            let (bbox, vertical) = parse_bbox(raw, crs.axis_order)?;
            Ok((Some(BboxFilter { bbox, crs }), vertical))
        }
    }
}

/// Normalize a data request.
pub fn normalize(ctx: &RequestContext, query: &RawQuery) -> Result<DataRequest, EdrError> {
    let collection = &ctx.collection;

    if ctx.instance_id.is_some() {
        collection.archetype(QueryType::Instances)?;
    }
    let archetype = collection.archetype(ctx.query_type)?;

    check_unexpected_parameters(query, declared_parameters(ctx.query_type, ctx.endpoint))?;

    // Items are GeoJSON; a plain `f=json` asks for the same document.
    let f = match query.get("f") {
        Some(f) if ctx.query_type == QueryType::Items && f.eq_ignore_ascii_case("json") => {
            Some("geojson")
        }
        other => other,
    };
    let format =
        OutputFormat::negotiate(f, archetype.default_output_format, &archetype.output_formats)?;

    let crs = parse_crs(query.get("crs"), "crs", collection)?;
    let explicit_datetime = query.get("datetime").map(parse_datetime).transpose()?;
    let explicit_z = query.get("z").map(parse_vertical).transpose()?;
    let datetime_given = explicit_datetime.is_some();
    let z_given = explicit_z.is_some();

    let coords = |qt| parse_coords(query.require("coords")?, qt, datetime_given, z_given);

    let (spatial, bbox_vertical, coords_datetime) = match ctx.query_type {
        QueryType::Items => {
            let (bbox, vertical) = optional_bbox(query, collection)?;
            (SpatialRequest::Items { bbox }, vertical, None)
        }
        QueryType::Locations | QueryType::Instances => {
            let (bbox, vertical) = optional_bbox(query, collection)?;
            (SpatialRequest::Locations { bbox }, vertical, None)
        }
        QueryType::Cube => {
            let crs = parse_crs(query.get("bbox-crs"), "bbox-crs", collection)?;
            let (bbox, vertical) = parse_bbox(query.require("bbox")?, crs.axis_order)?;
            (
                SpatialRequest::Cube {
                    bbox: BboxFilter { bbox, crs },
                },
                vertical,
                None,
            )
        }
        QueryType::Position => {
            let (coords, dt) = coords(QueryType::Position)?;
            (SpatialRequest::Position { coords }, None, dt)
        }
        QueryType::Area => {
            let (coords, dt) = coords(QueryType::Area)?;
            (SpatialRequest::Area { coords }, None, dt)
        }
        QueryType::Trajectory => {
            let (coords, dt) = coords(QueryType::Trajectory)?;
            (SpatialRequest::Trajectory { coords }, None, dt)
        }
        QueryType::Radius => {
            let (coords, dt) = coords(QueryType::Radius)?;
            let within_m = parse_unit_conversion(
                query.require("within")?,
                "within",
                query.require("within-units")?,
                "within-units",
                &archetype.within_units,
            )?;
            (SpatialRequest::Radius { coords, within_m }, None, dt)
        }
        QueryType::Corridor => {
            let (coords, dt) = coords(QueryType::Corridor)?;
            let width_m = parse_unit_conversion(
                query.require("corridor-width")?,
                "corridor-width",
                query.require("width-units")?,
                "width-units",
                &archetype.width_units,
            )?;
            let height_m = parse_unit_conversion(
                query.require("corridor-height")?,
                "corridor-height",
                query.require("height-units")?,
                "height-units",
                &archetype.height_units,
            )?;
            (
                SpatialRequest::Corridor {
                    coords,
                    width_m,
                    height_m,
                },
                None,
                dt,
            )
        }
    };

    let parameters = parse_parameter_names(query.get("parameter-name"), collection)?;

    let pagination = if ctx.item_id.is_some() {
        parse_pagination(query.get("offset"), None, 1, 1)
    } else {
        parse_pagination(query.get("offset"), query.get("limit"), DEFAULT_LIMIT, MAX_LIMIT)
    };

    Ok(DataRequest {
        collection: Arc::clone(collection),
        spatial,
        crs,
        datetime: explicit_datetime.or(coords_datetime),
        vertical: explicit_z.or(bbox_vertical),
        parameters,
        format,
        output_formats: archetype.output_formats.clone(),
        pagination,
        instance_id: ctx.instance_id.clone(),
        location_id: ctx.location_id.clone(),
        item_id: ctx.item_id.clone(),
    })
}

/// Instance scope of the instance routes and the collection-level single
/// item lookup: the path instance id, falling back to the collection's
/// default instance. Other collection-level routes take no instance.
pub fn parse_instance_id(path: Option<&str>, collection: &Collection) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(str::to_string)
        .or_else(|| collection.default_instance_id().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_query_get_treats_empty_as_absent() {
        let q = RawQuery::new(vec![
            ("f".into(), "".into()),
            ("crs".into(), "x".into()),
            ("crs".into(), "y".into()),
        ]);
        assert_eq!(q.get("f"), None);
        assert_eq!(q.get("crs"), Some("x"));
        assert_eq!(q.require("coords").unwrap_err().parameter(), Some("coords"));
    }

    #[test]
    fn test_parse_bbox_xy_unchanged() {
        let (bbox, z) = parse_bbox("10,20,30,40", AxisOrder::Xy).unwrap();
        assert_eq!(bbox, Bbox::new(10.0, 20.0, 30.0, 40.0));
        assert!(z.is_none());
    }

    #[test]
    fn test_parse_bbox_yx_swaps_pairs() {
        let (bbox, _) = parse_bbox("10,20,30,40", AxisOrder::Yx).unwrap();
        assert_eq!(bbox, Bbox::new(20.0, 10.0, 40.0, 30.0));
    }

    #[test]
    fn test_parse_bbox_six_values() {
        let (bbox, z) = parse_bbox("10,20,100,30,40,500", AxisOrder::Xy).unwrap();
        assert_eq!(bbox, Bbox::new(10.0, 20.0, 30.0, 40.0));
        let z = z.unwrap();
        assert_eq!((z.min, z.max), (Some(100.0), Some(500.0)));

        let (bbox, _) = parse_bbox("10,20,100,30,40,500", AxisOrder::Yx).unwrap();
        assert_eq!(bbox, Bbox::new(20.0, 10.0, 40.0, 30.0));
    }

    #[test]
    fn test_parse_bbox_rejects_bad_input() {
        assert!(matches!(parse_bbox("1,2,3", AxisOrder::Xy), Err(EdrError::InvalidBbox(_))));
        assert!(matches!(parse_bbox("1,2,x,4", AxisOrder::Xy), Err(EdrError::InvalidBbox(_))));
    }

    #[test]
    fn test_parse_datetime_interval() {
        let f = parse_datetime("2020-01-01T00:00:00Z/2020-02-01T00:00:00Z").unwrap();
        assert_eq!(f.min, Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(f.max, Some(Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap()));
        assert!(f.levels.is_none());
    }

    #[test]
    fn test_parse_datetime_open_ends() {
        let f = parse_datetime("../2020-02-01").unwrap();
        assert!(f.min.is_none());
        assert!(f.max.is_some());

        let f = parse_datetime("2020-01-01/..").unwrap();
        assert!(f.min.is_some());
        assert!(f.max.is_none());

        assert!(parse_datetime("../..").is_err());
    }

    #[test]
    fn test_parse_datetime_levels() {
        let f = parse_datetime("2020-01-01,2020-02-01").unwrap();
        assert_eq!(f.levels.unwrap().len(), 2);
        assert!(f.min.is_none() && f.max.is_none());

        let f = parse_datetime("2025-01-01T06:00:00+03:00").unwrap();
        assert_eq!(
            f.levels.unwrap(),
            vec![Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap()]
        );
    }

    #[test]
    fn test_parse_datetime_invalid() {
        let err = parse_datetime("yesterday").unwrap_err();
        assert_eq!(err.parameter(), Some("datetime"));
    }

    #[test]
    fn test_parse_vertical_grammar() {
        assert_eq!(parse_vertical("850").unwrap().levels, Some(vec![850.0]));
        assert_eq!(
            parse_vertical("850,700").unwrap().levels,
            Some(vec![850.0, 700.0])
        );
        let range = parse_vertical("100/500").unwrap();
        assert_eq!((range.min, range.max, range.levels), (Some(100.0), Some(500.0), None));
    }

    #[test]
    fn test_parse_vertical_recurring_is_inclusive() {
        let f = parse_vertical("R3/100/50").unwrap();
        assert_eq!(f.levels, Some(vec![100.0, 150.0, 200.0, 250.0]));
    }

    #[test]
    fn test_parse_vertical_invalid() {
        assert!(matches!(parse_vertical("R2/100"), Err(EdrError::InvalidZ(_))));
        assert!(matches!(parse_vertical("high"), Err(EdrError::InvalidZ(_))));
        assert!(matches!(parse_vertical("1/2/3"), Err(EdrError::InvalidZ(_))));
    }

    #[test]
    fn test_parse_coords_allowed_types() {
        assert!(parse_coords("POINT(36 1)", QueryType::Position, false, false).is_ok());
        assert!(parse_coords("MULTIPOINT((36 1),(37 1))", QueryType::Radius, false, false).is_ok());
        let err = parse_coords("POINT(36 1)", QueryType::Area, false, false).unwrap_err();
        assert_eq!(err.parameter(), Some("coords"));
        assert!(err.to_string().contains("Point geometry type not allowed on area"));
    }

    #[test]
    fn test_parse_coords_m_values_become_datetime_levels() {
        let (coords, dt) = parse_coords(
            "LINESTRINGM(36 1 1735689600000, 37 2 1735693200000)",
            QueryType::Trajectory,
            false,
            false,
        )
        .unwrap();
        assert!(coords.has_m);
        let levels = dt.unwrap().levels.unwrap();
        assert_eq!(levels[0], Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(levels[1], Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_coords_conflicts() {
        let err = parse_coords("LINESTRING M (36 1 0, 37 2 1)", QueryType::Trajectory, true, false)
            .unwrap_err();
        assert!(matches!(err, EdrError::ConflictingTemporalOrVerticalSpec { .. }));

        let err = parse_coords("LINESTRING Z (36 1 5, 37 2 6)", QueryType::Corridor, false, true)
            .unwrap_err();
        assert!(matches!(err, EdrError::ConflictingTemporalOrVerticalSpec { .. }));

        // Plain lines combine freely with explicit filters.
        assert!(parse_coords("LINESTRING(36 1, 37 2)", QueryType::Trajectory, true, true).is_ok());
    }

    #[test]
    fn test_parse_pagination() {
        assert_eq!(
            parse_pagination(None, None, 20, 100),
            Pagination { offset: 0, limit: 20 }
        );
        assert_eq!(
            parse_pagination(Some("abc"), Some("-5"), 20, 100),
            Pagination { offset: 0, limit: 20 }
        );
        // Not clamped to the maximum.
        assert_eq!(
            parse_pagination(Some("40"), Some("500"), 20, 100),
            Pagination { offset: 40, limit: 500 }
        );
    }

    #[test]
    fn test_check_unexpected_parameters() {
        let q = RawQuery::new(vec![("f".into(), "json".into()), ("foo".into(), "1".into())]);
        let err = check_unexpected_parameters(&q, &["f"]).unwrap_err();
        assert_eq!(err, EdrError::UnexpectedQueryParameter("foo".into()));
        assert!(check_unexpected_parameters(&q, &["f", "foo"]).is_ok());
    }
}
