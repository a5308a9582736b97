//! Landing page handlers.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;

use edr_protocol::normalizer::check_unexpected_parameters;
use edr_protocol::{LandingPage, Link, LinkComposer, OutputFormat, RawQuery, RequestUrl};

use super::{request_url, QueryPairs};
use crate::content_negotiation::{metadata_response, negotiate_metadata, METADATA_FORMATS};
use crate::error::ApiResult;
use crate::state::AppState;

/// Links of a landing page.
pub fn landing_links(url: RequestUrl, format: OutputFormat) -> Vec<Link> {
    LinkComposer::new(url, format, METADATA_FORMATS)
        .self_link()
        .alternates()
        .conformance()
        .service_desc()
        .service_doc()
        .collections()
        .build()
}

/// GET /edr - Landing page
pub async fn edr_landing_handler(
    Extension(state): Extension<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, &["f"])?;
    let format = negotiate_metadata(query.get("f"), &headers, METADATA_FORMATS)?;

    let links = landing_links(request_url(&state.edr_url(), &uri), format);
    metadata_response(&LandingPage::edr(links), format, None)
}

/// GET /features - Landing page
pub async fn features_landing_handler(
    Extension(state): Extension<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, &["f"])?;
    let format = negotiate_metadata(query.get("f"), &headers, METADATA_FORMATS)?;

    let links = landing_links(request_url(&state.features_url(), &uri), format);
    metadata_response(&LandingPage::features(links), format, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_links() {
        let url = RequestUrl::new("http://localhost:8083/edr", "", None);
        let links = landing_links(url, OutputFormat::Json);
        let rels: Vec<&str> = links.iter().map(|l| l.rel.as_str()).collect();
        assert_eq!(
            rels,
            vec!["self", "alternate", "conformance", "service-desc", "service-doc", "data"]
        );
        assert_eq!(links[0].href, "http://localhost:8083/edr");
        assert_eq!(links[1].href, "http://localhost:8083/edr?f=yaml");
        assert_eq!(links[5].href, "http://localhost:8083/edr/collections");
    }
}
