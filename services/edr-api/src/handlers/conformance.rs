//! Conformance endpoint handlers.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;

use edr_protocol::normalizer::check_unexpected_parameters;
use edr_protocol::{ConformanceClasses, LinkComposer, RawQuery};

use super::{request_url, QueryPairs};
use crate::content_negotiation::{metadata_response, negotiate_metadata, METADATA_FORMATS};
use crate::error::ApiResult;
use crate::state::AppState;

fn conformance(
    classes: ConformanceClasses,
    root: &str,
    uri: &Uri,
    headers: &HeaderMap,
    pairs: QueryPairs,
) -> ApiResult<Response> {
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, &["f"])?;
    let format = negotiate_metadata(query.get("f"), headers, METADATA_FORMATS)?;

    let links = LinkComposer::new(request_url(root, uri), format, METADATA_FORMATS)
        .self_link()
        .alternates()
        .build();
    metadata_response(&classes.with_links(links), format, None)
}

/// GET /edr/conformance
pub async fn edr_conformance_handler(
    Extension(state): Extension<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    conformance(ConformanceClasses::edr(), &state.edr_url(), &uri, &headers, pairs)
}

/// GET /features/conformance
pub async fn features_conformance_handler(
    Extension(state): Extension<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    conformance(ConformanceClasses::features(), &state.features_url(), &uri, &headers, pairs)
}
