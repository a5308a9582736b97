//! Data query handlers.
//!
//! Every data route of both trees goes through [`execute`]: the query is
//! normalized against the collection, compiled and run by the catalog, and
//! the rows are rendered in the negotiated format.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use edr_protocol::normalizer::{normalize, parse_instance_id};
use edr_protocol::{
    Api, Collection, CoverageDocument, CoverageJsonParser, DataRequest, EdrError, EdrGeoJsonParser, Feature,
    FeatureCollection, FeaturesGeoJsonParser, Link, LinkComposer, OutputFormat, QueryType,
    RawQuery, RequestContext, RequestUrl, ResultRow, RowShape,
};
use storage::query::is_locations_listing;

use super::{request_url, QueryPairs};
use crate::content_negotiation::{document_response, with_accept_format, METADATA_FORMATS};
use crate::error::ApiResult;
use crate::metrics::{record_query, record_rows};
use crate::state::AppState;

/// A rendered data response body.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DataDocument {
    Features(FeatureCollection),
    Feature(Feature),
    Coverage(CoverageDocument),
}

impl DataDocument {
    /// Attach links. CoverageJSON documents carry none.
    pub fn with_links(self, links: Vec<Link>) -> Self {
        match self {
            DataDocument::Features(collection) => DataDocument::Features(collection.with_links(links)),
            DataDocument::Feature(feature) => DataDocument::Feature(feature.with_links(links)),
            coverage @ DataDocument::Coverage(_) => coverage,
        }
    }
}

fn plain_geojson(
    request: &DataRequest,
    rows: &[ResultRow],
    number_matched: i64,
) -> Result<DataDocument, EdrError> {
    let parser = FeaturesGeoJsonParser::new(rows, number_matched);
    match &request.item_id {
        Some(item_id) => parser
            .first_feature()
            .map(DataDocument::Feature)
            .ok_or_else(|| EdrError::ItemNotFound(item_id.clone())),
        None => Ok(DataDocument::Features(parser.feature_collection())),
    }
}

/// Render result rows in the format the request negotiated.
///
/// Feature-shaped collections and the locations listing are always plain
/// GeoJSON. Observation rows are CoverageJSON, plain GeoJSON, or EDR GeoJSON
/// for `json` and `yaml`.
pub fn render(
    request: &DataRequest,
    rows: &[ResultRow],
    number_matched: i64,
    edr_url: &str,
) -> Result<DataDocument, EdrError> {
    let collection = request.collection.as_ref();
    if collection.shape == RowShape::Features || is_locations_listing(request) {
        return plain_geojson(request, rows, number_matched);
    }

    match request.format {
        OutputFormat::CoverageJson => {
            let parser = CoverageJsonParser::new(&request.crs, &request.parameters, rows);
            let document = if request.item_id.is_some() {
                CoverageDocument::Coverage(parser.coverage()?)
            } else {
                CoverageDocument::Collection(parser.coverage_collection()?)
            };
            Ok(DataDocument::Coverage(document))
        }
        OutputFormat::GeoJson => plain_geojson(request, rows, number_matched),
        OutputFormat::Json | OutputFormat::Yaml => {
            let parser = EdrGeoJsonParser::new(
                rows,
                number_matched,
                &request.parameters,
                edr_url,
                &collection.id,
            )
            .with_instance(request.instance_id.as_deref())
            .with_locations(collection.supports(QueryType::Locations));

            match &request.item_id {
                Some(item_id) => parser
                    .first_feature()
                    .map(DataDocument::Feature)
                    .ok_or_else(|| EdrError::ItemNotFound(item_id.clone())),
                None => Ok(DataDocument::Features(parser.feature_collection())),
            }
        }
    }
}

fn body_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(body_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Query pairs of a POST data request: the URL query overlaid with the
/// members of the JSON body. Arrays are joined with commas.
pub fn merge_body(mut pairs: QueryPairs, body: Map<String, Value>) -> QueryPairs {
    for (key, value) in body {
        if value.is_null() {
            continue;
        }
        pairs.retain(|(k, _)| *k != key);
        let text = body_text(&value);
        pairs.push((key, text));
    }
    pairs
}

/// Links of an EDR data response.
pub fn data_links(request: &DataRequest, url: RequestUrl, number_matched: i64) -> Vec<Link> {
    let mut composer =
        LinkComposer::new(url, request.format, &request.output_formats).self_link().alternates();
    if request.item_id.is_none() {
        composer = composer.pagination(number_matched, request.pagination);
    }

    let composer = composer.override_output_formats(METADATA_FORMATS);
    let collection_id = &request.collection.id;
    match &request.instance_id {
        Some(instance_id) => composer.to_instance(collection_id, instance_id),
        None => composer.collection(collection_id),
    }
    .build()
}

/// Links of a Features `/items` or `/items/:item_id` response.
pub fn features_links(request: &DataRequest, url: RequestUrl, number_matched: i64) -> Vec<Link> {
    let collection_id = &request.collection.id;
    let composer =
        LinkComposer::new(url, request.format, &request.output_formats).self_link().alternates();

    let composer = match request.item_id {
        Some(_) => composer.items(collection_id),
        None => composer.pagination(number_matched, request.pagination),
    };
    composer
        .override_output_formats(METADATA_FORMATS)
        .collection(collection_id)
        .build()
}

#[instrument(skip_all, fields(collection = %ctx.collection.id, query_type = ctx.query_type.as_str()))]
async fn run(
    state: &AppState,
    api: Api,
    ctx: &RequestContext,
    uri: &Uri,
    headers: &HeaderMap,
    pairs: QueryPairs,
) -> ApiResult<Response> {
    let archetype = ctx.collection.archetype(ctx.query_type)?;
    let query = RawQuery::new(with_accept_format(pairs, headers, &archetype.output_formats));
    let request = normalize(ctx, &query)?;

    let result = state.catalog.query(&request).await?;
    let rows = ResultRow::from_json_rows(result.rows, &request.parameters)?;
    record_rows(ctx.query_type, rows.len());
    debug!(
        number_matched = result.number_matched,
        returned = rows.len(),
        format = request.format.key(),
        "Query executed"
    );

    let edr_url = state.edr_url();
    let document = render(&request, &rows, result.number_matched, &edr_url)?;
    let links = match api {
        Api::Edr => data_links(&request, request_url(&edr_url, uri), result.number_matched),
        Api::Features => features_links(
            &request,
            request_url(&state.features_url(), uri),
            result.number_matched,
        ),
    };

    document_response(&document.with_links(links), request.format, Some(&request.crs))
}

/// Run a data request and record its metrics.
pub async fn execute(
    state: &AppState,
    api: Api,
    ctx: RequestContext,
    uri: &Uri,
    headers: &HeaderMap,
    pairs: QueryPairs,
) -> ApiResult<Response> {
    let started = Instant::now();
    let result = run(state, api, &ctx, uri, headers, pairs).await;

    let status = match &result {
        Ok(response) => response.status().as_u16(),
        Err(e) => e.status().as_u16(),
    };
    record_query(ctx.query_type, status, started.elapsed());
    result
}

/// Context of a collection-level query: every row of the collection, no
/// instance scope.
fn collection_context(collection: Arc<Collection>, query_type: QueryType) -> RequestContext {
    RequestContext::new(collection, query_type)
}

/// GET /edr/collections/:collection_id/{query_type}
pub async fn collection_query(
    query_type: QueryType,
    state: Arc<AppState>,
    collection_id: String,
    uri: Uri,
    headers: HeaderMap,
    pairs: QueryPairs,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let ctx = collection_context(collection, query_type);
    execute(&state, Api::Edr, ctx, &uri, &headers, pairs).await
}

/// GET /edr/collections/:collection_id/instances/:instance_id/{query_type}
pub async fn instance_query(
    query_type: QueryType,
    state: Arc<AppState>,
    (collection_id, instance_id): (String, String),
    uri: Uri,
    headers: HeaderMap,
    pairs: QueryPairs,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let instance_id = parse_instance_id(Some(&instance_id), &collection);
    let ctx = RequestContext::new(collection, query_type).with_instance(instance_id);
    execute(&state, Api::Edr, ctx, &uri, &headers, pairs).await
}

/// GET /edr/collections/:collection_id/items/:item_id
///
/// A single item is looked up in the collection's default instance.
pub async fn item_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, item_id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let instance_id = parse_instance_id(None, &collection);
    let ctx = RequestContext::new(collection, QueryType::Items)
        .with_instance(instance_id)
        .with_item(item_id);
    execute(&state, Api::Edr, ctx, &uri, &headers, pairs).await
}

/// GET /edr/collections/:collection_id/instances/:instance_id/items/:item_id
pub async fn instance_item_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, instance_id, item_id)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let instance_id = parse_instance_id(Some(&instance_id), &collection);
    let ctx = RequestContext::new(collection, QueryType::Items)
        .with_instance(instance_id)
        .with_item(item_id);
    execute(&state, Api::Edr, ctx, &uri, &headers, pairs).await
}

/// GET /edr/collections/:collection_id/locations/:location_id
pub async fn location_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, location_id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let ctx = collection_context(collection, QueryType::Locations).with_location(location_id);
    execute(&state, Api::Edr, ctx, &uri, &headers, pairs).await
}

/// GET /edr/collections/:collection_id/instances/:instance_id/locations/:location_id
pub async fn instance_location_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, instance_id, location_id)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Edr, &collection_id)?;
    let instance_id = parse_instance_id(Some(&instance_id), &collection);
    let ctx = RequestContext::new(collection, QueryType::Locations)
        .with_instance(instance_id)
        .with_location(location_id);
    execute(&state, Api::Edr, ctx, &uri, &headers, pairs).await
}

/// GET /features/collections/:collection_id/items
pub async fn features_items_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Features, &collection_id)?;
    let ctx = RequestContext::new(collection, QueryType::Items);
    execute(&state, Api::Features, ctx, &uri, &headers, pairs).await
}

/// GET /features/collections/:collection_id/items/:item_id
pub async fn features_item_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, item_id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let collection = state.collections.get_in(Api::Features, &collection_id)?;
    let ctx = RequestContext::new(collection, QueryType::Items).with_item(item_id);
    execute(&state, Api::Features, ctx, &uri, &headers, pairs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{
        coords, data_request, isd_collection, mountain_row, mountains_collection, raw_query,
        station_rows,
    };

    const EDR: &str = "http://localhost:8083/edr";

    fn rows_for(request: &DataRequest, count: usize) -> Vec<ResultRow> {
        ResultRow::from_json_rows(station_rows(count, 3), &request.parameters).unwrap()
    }

    #[test]
    fn test_merge_body_overrides_query() {
        let pairs = vec![
            ("f".to_string(), "json".to_string()),
            ("coords".to_string(), "POINT(0 0)".to_string()),
        ];
        let body = serde_json::json!({
            "coords": coords::POINT,
            "parameter-name": ["temperature", "windSpeed"],
            "limit": 5,
            "z": null,
        });
        let merged = merge_body(pairs, body.as_object().unwrap().clone());
        let query = raw_query(
            &merged.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>(),
        );

        assert_eq!(query.get("f"), Some("json"));
        assert_eq!(query.get("coords"), Some(coords::POINT));
        assert_eq!(query.get("parameter-name"), Some("temperature,windSpeed"));
        assert_eq!(query.get("limit"), Some("5"));
        assert_eq!(query.get("z"), None);
    }

    fn to_json(doc: &DataDocument) -> Value {
        serde_json::to_value(doc).unwrap()
    }

    #[test]
    fn test_render_coverage_collection() {
        let request = data_request(isd_collection(), QueryType::Area, &[("coords", coords::POLYGON)]);
        assert_eq!(request.format, OutputFormat::CoverageJson);

        let rows = rows_for(&request, 2);
        let doc = render(&request, &rows, 2, EDR).unwrap();
        let json = to_json(&doc);
        assert_eq!(json["type"], "CoverageCollection");
        assert_eq!(json["coverages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_render_single_item_coverage() {
        let ctx = RequestContext::new(isd_collection(), QueryType::Items).with_item("63740");
        let request = normalize(&ctx, &raw_query(&[("f", "coveragejson")])).unwrap();
        let rows = rows_for(&request, 1);

        let json = to_json(&render(&request, &rows, 1, EDR).unwrap());
        assert_eq!(json["type"], "Coverage");
    }

    #[test]
    fn test_render_edr_geojson_links_locations() {
        let request = data_request(
            isd_collection(),
            QueryType::Position,
            &[("coords", coords::POINT), ("f", "json")],
        );
        let rows = rows_for(&request, 2);

        match render(&request, &rows, 7, EDR).unwrap() {
            DataDocument::Features(collection) => {
                assert_eq!(collection.number_matched, 7);
                assert_eq!(collection.number_returned, 2);
                assert_eq!(
                    collection.features[0].properties["edrqueryendpoint"],
                    "http://localhost:8083/edr/collections/isd-2025/locations/KE"
                );
            }
            other => panic!("unexpected document {:?}", other),
        }
    }

    #[test]
    fn test_render_plain_geojson_for_observations() {
        let request = data_request(
            isd_collection(),
            QueryType::Position,
            &[("coords", coords::POINT), ("f", "geojson")],
        );
        let rows = rows_for(&request, 2);

        match render(&request, &rows, 2, EDR).unwrap() {
            DataDocument::Features(collection) => {
                assert_eq!(collection.features.len(), 2);
                assert!(!collection.features[0].properties.contains_key("edrqueryendpoint"));
            }
            other => panic!("unexpected document {:?}", other),
        }
    }

    #[test]
    fn test_render_features_item() {
        let ctx = RequestContext::new(mountains_collection(), QueryType::Items).with_item("Kilimanjaro");
        let request = normalize(&ctx, &raw_query(&[])).unwrap();
        let rows = ResultRow::from_json_rows(
            vec![mountain_row("Kilimanjaro", 37.35, -3.07, 5895.0)],
            &request.parameters,
        )
        .unwrap();

        let json = to_json(&render(&request, &rows, 1, EDR).unwrap());
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["properties"]["id"], "Kilimanjaro");
    }

    #[test]
    fn test_render_missing_item() {
        let ctx = RequestContext::new(mountains_collection(), QueryType::Items).with_item("Nowhere");
        let request = normalize(&ctx, &raw_query(&[])).unwrap();

        let err = render(&request, &[], 0, EDR).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_data_links_page_and_instance() {
        let ctx = RequestContext::new(isd_collection(), QueryType::Area)
            .with_instance(Some("2025-01-01".to_string()));
        let request = normalize(
            &ctx,
            &raw_query(&[("coords", coords::POLYGON), ("limit", "2")]),
        )
        .unwrap();
        let url = RequestUrl::new(EDR, "/collections/isd-2025/area", Some("coords=x&limit=2"));

        let links = data_links(&request, url, 5);
        let rels: Vec<&str> = links.iter().map(|l| l.rel.as_str()).collect();
        assert_eq!(rels[0], "self");
        assert!(rels.contains(&"next"));
        assert!(!rels.contains(&"prev"));

        let instance_links: Vec<&Link> = links.iter().filter(|l| l.rel == "collection").collect();
        assert_eq!(instance_links.len(), METADATA_FORMATS.len());
        assert_eq!(
            instance_links[0].href,
            "http://localhost:8083/edr/collections/isd-2025/instances/2025-01-01?f=json"
        );
    }

    #[test]
    fn test_collection_query_spans_all_instances() {
        let ctx = collection_context(isd_collection(), QueryType::Position);
        let request = normalize(&ctx, &raw_query(&[("coords", coords::POINT)])).unwrap();
        assert!(request.instance_id.is_none());

        let url = RequestUrl::new(EDR, "/collections/isd-2025/position", Some("coords=x"));
        let links = data_links(&request, url, 1);
        assert!(links.iter().all(|l| !l.href.contains("/instances/")));

        let collection_links: Vec<&Link> = links.iter().filter(|l| l.rel == "collection").collect();
        assert_eq!(collection_links.len(), METADATA_FORMATS.len());
        assert!(collection_links[0]
            .href
            .starts_with("http://localhost:8083/edr/collections/isd-2025?"));
    }

    #[test]
    fn test_collection_location_spans_all_instances() {
        let ctx = collection_context(isd_collection(), QueryType::Locations).with_location("KE");
        let request = normalize(&ctx, &raw_query(&[])).unwrap();
        assert!(request.instance_id.is_none());
        assert_eq!(request.location_id.as_deref(), Some("KE"));
    }

    #[test]
    fn test_features_item_links() {
        let ctx = RequestContext::new(mountains_collection(), QueryType::Items).with_item("Kilimanjaro");
        let request = normalize(&ctx, &raw_query(&[])).unwrap();
        let url = RequestUrl::new(
            "http://localhost:8083/features",
            "/collections/mountains/items/Kilimanjaro",
            None,
        );

        let links = features_links(&request, url, 1);
        let rels: Vec<&str> = links.iter().map(|l| l.rel.as_str()).collect();
        assert!(rels.contains(&"items"));
        assert!(!rels.contains(&"next"));
        assert_eq!(links.last().unwrap().href, "http://localhost:8083/features/collections/mountains?f=yaml");
    }
}
