//! HTTP request handlers for the EDR and Features trees.

pub mod api;
pub mod collections;
pub mod conformance;
pub mod data;
pub mod health;
pub mod instances;
pub mod landing;

use axum::http::Uri;

use edr_protocol::crs::CRS84;
use edr_protocol::normalizer::{parse_bbox, parse_datetime, parse_vertical};
use edr_protocol::{AxisOrder, CrsConfig, CrsRegistry, EdrError, ExtentFilter, RawQuery, RequestUrl};

/// Query pairs as decoded by axum's `Query` extractor.
pub type QueryPairs = Vec<(String, String)>;

/// The current request as a URL under a tree root.
///
/// Handlers sit in a nested router, so `uri` is already relative to the
/// tree; its bare root `/` maps to the root URL itself.
pub fn request_url(root: &str, uri: &Uri) -> RequestUrl {
    let path = match uri.path() {
        "/" => "",
        path => path,
    };
    RequestUrl::new(root, path, uri.query())
}

/// Resolve a listing `crs`; collection listings only report CRS84 extents.
pub fn listing_crs(query: &RawQuery, registry: &CrsRegistry) -> Result<CrsConfig, EdrError> {
    if let Some(raw) = query.get("crs") {
        if raw.trim() != CRS84 {
            return Err(EdrError::InvalidCrs {
                parameter: "crs".to_string(),
                value: raw.to_string(),
                allowed: CRS84.to_string(),
            });
        }
    }
    registry
        .resolve(CRS84)
        .cloned()
        .ok_or_else(|| EdrError::InvalidConfiguration("CRS84 is not registered".to_string()))
}

/// `bbox`, `datetime` and `z` of a collection or instance listing.
///
/// The bbox is read in CRS84 order; a 6-value bbox contributes its height
/// range unless `z` is given explicitly.
pub fn extent_filter(query: &RawQuery) -> Result<ExtentFilter, EdrError> {
    let (bbox, bbox_vertical) = match query.get("bbox") {
        Some(raw) => {
            let (bbox, vertical) = parse_bbox(raw, AxisOrder::Xy)?;
            (Some(bbox), vertical)
        }
        None => (None, None),
    };
    let datetime = query.get("datetime").map(parse_datetime).transpose()?;
    let vertical = query.get("z").map(parse_vertical).transpose()?;

    Ok(ExtentFilter {
        bbox,
        datetime,
        vertical: vertical.or(bbox_vertical),
    })
}
