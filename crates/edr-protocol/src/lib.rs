//! OGC API - Environmental Data Retrieval (EDR) and Features query core.
//!
//! This crate is I/O free. It turns raw query strings into typed filters,
//! shapes result rows into GeoJSON, EDR GeoJSON and CoverageJSON documents,
//! and builds the metadata documents and links of both API trees.
//!
//! # Pipeline
//!
//! 1. [`normalizer::normalize`] validates the query of a data request
//!    against the [`CollectionRegistry`] and [`CrsRegistry`].
//! 2. The storage layer compiles the resulting [`DataRequest`] into SQL
//!    and returns JSON rows.
//! 3. [`ResultRow`] lifts each row; one of the parsers in [`geojson`] or
//!    [`coverage_json`] renders the response body.
//!
//! # Example
//!
//! ```rust
//! use edr_protocol::normalizer::{parse_bbox, parse_datetime};
//! use edr_protocol::crs::AxisOrder;
//!
//! let (bbox, _) = parse_bbox("10,20,30,40", AxisOrder::Yx).unwrap();
//! assert_eq!((bbox.xmin, bbox.ymin), (20.0, 10.0));
//!
//! let window = parse_datetime("2020-01-01T00:00:00Z/..").unwrap();
//! assert!(window.min.is_some() && window.max.is_none());
//! ```

pub mod types;
pub mod crs;
pub mod errors;
pub mod responses;
pub mod parameters;
pub mod format;
pub mod registry;
pub mod wkt;
pub mod units;
pub mod filters;
pub mod normalizer;
pub mod rows;
pub mod geojson;
pub mod coverage_json;
pub mod links;
pub mod collections;
pub mod extent;

// Re-export commonly used types
pub use types::{Extent, Link, SpatialExtent, TemporalExtent, VerticalExtent};
pub use crs::{AxisOrder, CrsConfig, CrsKind, CrsRegistry};
pub use errors::EdrError;
pub use responses::{ConformanceClasses, ExceptionResponse, LandingPage};
pub use parameters::{I18nString, ObservedProperty, ParameterDocument, Unit};
pub use format::OutputFormat;
pub use registry::{
    Api, ArchetypeConfig, Collection, CollectionConfig, CollectionRegistry, DataType, ParameterConfig,
    QueryType, RowShape, SourceTable,
};
pub use filters::{
    Bbox, BboxFilter, Coords, DatetimeFilter, Pagination, SpatialRequest, VerticalFilter,
};
pub use normalizer::{DataRequest, RawQuery, RequestContext};
pub use rows::{ExtentRow, JsonRow, ResultRow};
pub use geojson::{EdrGeoJsonParser, Feature, FeatureCollection, FeaturesGeoJsonParser, Geometry};
pub use coverage_json::{Coverage, CoverageCollection, CoverageDocument, CoverageJsonParser};
pub use links::{LinkComposer, RequestUrl};
pub use collections::{
    CollectionList, EdrCollectionDocument, FeaturesCollectionDocument, InstanceList,
};
pub use extent::ExtentFilter;

/// Conformance class URIs declared by the two API trees.
pub mod conformance {
    pub const EDR_CORE: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.0/conf/core";
    pub const EDR_COLLECTIONS: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/collections";
    pub const EDR_CORE_1_1: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/core";
    pub const EDR_OAS30: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/oas30";
    pub const EDR_GEOJSON: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/geojson";
    pub const EDR_JSON: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/json";
    pub const EDR_EDR_GEOJSON: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/edr-geojson";
    pub const EDR_COVJSON: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/covjson";
    pub const EDR_QUERIES: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/queries";
    pub const EDR_EDR_GEOJSON_1_0: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.0/conf/edr-geojson";
    pub const EDR_GEOJSON_1_0: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.0/conf/geojson";

    /// Every class of the EDR tree, in declaration order.
    pub const EDR: &[&str] = &[
        EDR_COLLECTIONS,
        EDR_CORE_1_1,
        EDR_CORE,
        EDR_OAS30,
        EDR_GEOJSON,
        EDR_JSON,
        EDR_EDR_GEOJSON,
        EDR_COVJSON,
        EDR_QUERIES,
        EDR_EDR_GEOJSON_1_0,
        EDR_GEOJSON_1_0,
    ];

    pub const FEATURES_CORE: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core";
    pub const FEATURES_OAS30: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/oas30";
    pub const FEATURES_GEOJSON: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/geojson";
    pub const FEATURES_CRS: &str = "http://www.opengis.net/spec/ogcapi-features-2/1.0/conf/crs";

    pub const FEATURES: &[&str] = &[FEATURES_CORE, FEATURES_OAS30, FEATURES_GEOJSON, FEATURES_CRS];
}

/// Media types used in responses.
pub mod media_types {
    /// CoverageJSON media type
    pub const COVERAGE_JSON: &str = "application/vnd.cov+json";
    /// Older CoverageJSON media type, accepted as an alias.
    pub const COVERAGE_JSON_ALT: &str = "application/prs.coverage+json";
    /// GeoJSON media type
    pub const GEO_JSON: &str = "application/geo+json";
    /// JSON media type
    pub const JSON: &str = "application/json";
    pub const YAML: &str = "text/yaml";
    pub const HTML: &str = "text/html";
    /// OpenAPI JSON media type
    pub const OPENAPI_JSON: &str = "application/vnd.oai.openapi+json;version=3.0";
}
