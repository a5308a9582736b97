//! Instance handlers. An instance is one day of a collection's data.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;

use edr_protocol::normalizer::{
    check_unexpected_parameters, declared_parameters, parse_crs, Endpoint,
};
use edr_protocol::{
    Api, EdrCollectionDocument, EdrError, InstanceList, LinkComposer, OutputFormat, QueryType,
    RawQuery,
};
use storage::ExtentMode;

use super::{extent_filter, request_url, QueryPairs};
use crate::content_negotiation::{metadata_response, with_accept_format};
use crate::error::ApiResult;
use crate::state::AppState;

const INSTANCE_PARAMS: &[&str] = &["f", "crs"];

/// GET /edr/collections/:collection_id/instances
pub async fn list_instances_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let archetype = collection.archetype(QueryType::Instances)?;

    let query = RawQuery::new(with_accept_format(pairs, &headers, &archetype.output_formats));
    check_unexpected_parameters(
        &query,
        declared_parameters(QueryType::Instances, Endpoint::Query),
    )?;
    let format = OutputFormat::negotiate(
        query.get("f"),
        archetype.default_output_format,
        &archetype.output_formats,
    )?;
    let crs = parse_crs(query.get("crs"), "crs", &collection)?;
    let filter = extent_filter(&query)?;

    let extents = state
        .catalog
        .extent(&collection, &crs, ExtentMode::Instances { instance_id: None })
        .await?;

    let edr_url = state.edr_url();
    let url = request_url(&edr_url, &uri);
    let instances = extents
        .iter()
        .filter(|extent| filter.matches(extent))
        .map(|extent| {
            let doc = EdrCollectionDocument::generate(&collection, extent, &crs, &edr_url);
            let links = LinkComposer::new(url.clone(), format, &archetype.output_formats)
                .extend(doc.data_query_links())
                .to_instance(&collection.id, &extent.id)
                .build();
            doc.with_links(links)
        })
        .collect();

    tracing::debug!(collection = %collection.id, total = extents.len(), "Listed instances");

    let list = InstanceList {
        instances,
        links: LinkComposer::new(url, format, &archetype.output_formats)
            .self_link()
            .alternates()
            .build(),
    };
    metadata_response(&list, format, Some(&crs))
}

/// GET /edr/collections/:collection_id/instances/:instance_id
pub async fn get_instance_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, instance_id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let archetype = collection.archetype(QueryType::Instances)?;

    let query = RawQuery::new(with_accept_format(pairs, &headers, &archetype.output_formats));
    check_unexpected_parameters(&query, INSTANCE_PARAMS)?;
    let format = OutputFormat::negotiate(
        query.get("f"),
        archetype.default_output_format,
        &archetype.output_formats,
    )?;
    let crs = parse_crs(query.get("crs"), "crs", &collection)?;

    let extent = state
        .catalog
        .extent(
            &collection,
            &crs,
            ExtentMode::Instances {
                instance_id: Some(instance_id.clone()),
            },
        )
        .await?
        .into_iter()
        .next()
        .ok_or(EdrError::InstanceNotFound(instance_id))?;

    let edr_url = state.edr_url();
    let doc = EdrCollectionDocument::generate(&collection, &extent, &crs, &edr_url);
    let links = LinkComposer::new(request_url(&edr_url, &uri), format, &archetype.output_formats)
        .extend(doc.data_query_links())
        .self_link()
        .alternates()
        .build();

    metadata_response(&doc.with_links(links), format, Some(&crs))
}
