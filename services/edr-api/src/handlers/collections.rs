//! Collection metadata handlers of both trees.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;

use edr_protocol::normalizer::{check_unexpected_parameters, parse_crs};
use edr_protocol::{
    Api, Collection, CollectionList, CrsConfig, EdrCollectionDocument, ExtentFilter, ExtentRow,
    FeaturesCollectionDocument, LinkComposer, OutputFormat, RawQuery, RequestUrl,
};
use storage::{Catalog, ExtentMode};

use super::{extent_filter, listing_crs, request_url, QueryPairs};
use crate::content_negotiation::{metadata_response, negotiate_metadata, METADATA_FORMATS};
use crate::error::ApiResult;
use crate::state::AppState;

const LIST_PARAMS: &[&str] = &["f", "crs", "bbox", "datetime", "z"];
const FEATURES_LIST_PARAMS: &[&str] = &["f", "crs", "bbox", "datetime"];
const COLLECTION_PARAMS: &[&str] = &["f", "crs"];

/// The collection-wide aggregate.
async fn collection_extent(
    catalog: &Catalog,
    collection: &Collection,
    crs: &CrsConfig,
) -> ApiResult<ExtentRow> {
    let rows = catalog.extent(collection, crs, ExtentMode::Collection).await?;
    Ok(rows.into_iter().next().unwrap_or_else(|| ExtentRow {
        id: collection.id.clone(),
        ..Default::default()
    }))
}

/// Extents of every collection published in `api` that pass `filter`.
async fn filtered_extents(
    state: &AppState,
    api: Api,
    crs: &CrsConfig,
    filter: &ExtentFilter,
) -> ApiResult<Vec<(Arc<Collection>, ExtentRow)>> {
    let mut matches = Vec::new();
    for collection in state.collections.published(api) {
        let extent = collection_extent(&state.catalog, collection, crs).await?;
        if filter.matches(&extent) {
            matches.push((Arc::clone(collection), extent));
        }
    }
    Ok(matches)
}

/// An EDR collection document as listed under `/collections`.
pub fn edr_listing_entry(
    collection: &Collection,
    extent: &ExtentRow,
    crs: &CrsConfig,
    edr_url: &str,
    url: &RequestUrl,
    format: OutputFormat,
) -> EdrCollectionDocument {
    let doc = EdrCollectionDocument::generate(collection, extent, crs, edr_url);
    let links = LinkComposer::new(url.clone(), format, METADATA_FORMATS)
        .extend(doc.data_query_links())
        .collection(&collection.id)
        .build();
    doc.with_links(links)
}

/// GET /edr/collections
pub async fn edr_collections_handler(
    Extension(state): Extension<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, LIST_PARAMS)?;
    let format = negotiate_metadata(query.get("f"), &headers, METADATA_FORMATS)?;
    let crs = listing_crs(&query, &state.crs_registry)?;
    let filter = extent_filter(&query)?;

    let edr_url = state.edr_url();
    let url = request_url(&edr_url, &uri);
    let collections = filtered_extents(&state, Api::Edr, &crs, &filter)
        .await?
        .iter()
        .map(|(collection, extent)| {
            edr_listing_entry(collection, extent, &crs, &edr_url, &url, format)
        })
        .collect();

    let list = CollectionList {
        collections,
        links: LinkComposer::new(url, format, METADATA_FORMATS)
            .self_link()
            .alternates()
            .build(),
    };
    metadata_response(&list, format, Some(&crs))
}

/// GET /edr/collections/:collection_id
pub async fn edr_collection_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, COLLECTION_PARAMS)?;
    let format = negotiate_metadata(query.get("f"), &headers, METADATA_FORMATS)?;
    let crs = parse_crs(query.get("crs"), "crs", &collection)?;

    let extent = collection_extent(&state.catalog, &collection, &crs).await?;
    let edr_url = state.edr_url();
    let doc = EdrCollectionDocument::generate(&collection, &extent, &crs, &edr_url);
    let links = LinkComposer::new(request_url(&edr_url, &uri), format, METADATA_FORMATS)
        .extend(doc.data_query_links())
        .self_link()
        .alternates()
        .build();

    metadata_response(&doc.with_links(links), format, Some(&crs))
}

/// GET /features/collections
pub async fn features_collections_handler(
    Extension(state): Extension<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, FEATURES_LIST_PARAMS)?;
    let format = negotiate_metadata(query.get("f"), &headers, METADATA_FORMATS)?;
    let crs = listing_crs(&query, &state.crs_registry)?;
    let filter = extent_filter(&query)?;

    let url = request_url(&state.features_url(), &uri);
    let collections = filtered_extents(&state, Api::Features, &crs, &filter)
        .await?
        .iter()
        .map(|(collection, extent)| {
            let links = LinkComposer::new(url.clone(), format, &[])
                .items(&collection.id)
                .build();
            FeaturesCollectionDocument::generate(collection, extent, &crs).with_links(links)
        })
        .collect();

    let list = CollectionList {
        collections,
        links: LinkComposer::new(url, format, METADATA_FORMATS)
            .self_link()
            .alternates()
            .build(),
    };
    metadata_response(&list, format, Some(&crs))
}

/// GET /features/collections/:collection_id
pub async fn features_collection_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Features, &collection_id)?;
    let query = RawQuery::new(pairs);
    check_unexpected_parameters(&query, COLLECTION_PARAMS)?;
    let format = negotiate_metadata(query.get("f"), &headers, METADATA_FORMATS)?;
    let crs = parse_crs(query.get("crs"), "crs", &collection)?;

    let extent = collection_extent(&state.catalog, &collection, &crs).await?;
    let links = LinkComposer::new(
        request_url(&state.features_url(), &uri),
        format,
        METADATA_FORMATS,
    )
    .self_link()
    .alternates()
    .items(&collection.id)
    .build();

    let doc = FeaturesCollectionDocument::generate(&collection, &extent, &crs).with_links(links);
    metadata_response(&doc, format, Some(&crs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{crs_registry, extent_row, isd_collection};

    fn isd_extent() -> ExtentRow {
        extent_row("isd-2025", [33.9, -4.7, 41.9, 5.0], 24)
    }

    #[test]
    fn test_listing_entry_links() {
        let registry = crs_registry();
        let crs = registry.resolve(edr_protocol::crs::CRS84).unwrap();
        let url = RequestUrl::new("http://h/edr", "/collections", None);
        let doc = edr_listing_entry(
            &isd_collection(),
            &isd_extent(),
            crs,
            "http://h/edr",
            &url,
            OutputFormat::Json,
        );

        let data_links = doc.data_queries.len();
        assert_eq!(doc.links.len(), data_links + 2);
        assert!(doc.links[..data_links]
            .iter()
            .all(|l| l.href.starts_with("http://h/edr/collections/isd-2025/")));
        assert_eq!(
            doc.links[data_links].href,
            "http://h/edr/collections/isd-2025?f=json"
        );
        assert_eq!(doc.links[data_links + 1].rel, "collection");
    }
}
