//! Router of the service: the EDR tree under `/edr`, the Features tree under
//! `/features`, and the operational endpoints at the root.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, Uri},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use edr_protocol::QueryType;

use crate::handlers::{self, data, QueryPairs};
use crate::state::AppState;

/// Data queries routed under a collection and under each of its instances.
pub const DATA_QUERIES: &[QueryType] = &[
    QueryType::Position,
    QueryType::Radius,
    QueryType::Area,
    QueryType::Cube,
    QueryType::Trajectory,
    QueryType::Corridor,
    QueryType::Items,
    QueryType::Locations,
];

fn edr_router() -> Router {
    let mut router = Router::new()
        // Landing page
        .route("/", get(handlers::landing::edr_landing_handler))
        // Conformance
        .route("/conformance", get(handlers::conformance::edr_conformance_handler))
        // API definition
        .route("/api", get(handlers::api::edr_api_handler))
        .route("/api.html", get(handlers::api::api_html_handler))
        // Collections
        .route("/collections", get(handlers::collections::edr_collections_handler))
        .route(
            "/collections/:collection_id",
            get(handlers::collections::edr_collection_handler),
        )
        // Instances
        .route(
            "/collections/:collection_id/instances",
            get(handlers::instances::list_instances_handler),
        )
        .route(
            "/collections/:collection_id/instances/:instance_id",
            get(handlers::instances::get_instance_handler),
        )
        // Single items and locations
        .route("/collections/:collection_id/items/:item_id", get(data::item_handler))
        .route(
            "/collections/:collection_id/instances/:instance_id/items/:item_id",
            get(data::instance_item_handler),
        )
        .route(
            "/collections/:collection_id/locations/:location_id",
            get(data::location_handler),
        )
        .route(
            "/collections/:collection_id/instances/:instance_id/locations/:location_id",
            get(data::instance_location_handler),
        );

    // Data queries, GET and POST. A POST body overlays the URL query.
    for &query_type in DATA_QUERIES {
        let name = query_type.as_str();
        router = router
            .route(
                &format!("/collections/:collection_id/{}", name),
                get(
                    move |Extension(state): Extension<Arc<AppState>>,
                          Path(collection_id): Path<String>,
                          uri: Uri,
                          headers: HeaderMap,
                          Query(pairs): Query<QueryPairs>| {
                        data::collection_query(query_type, state, collection_id, uri, headers, pairs)
                    },
                )
                .post(
                    move |Extension(state): Extension<Arc<AppState>>,
                          Path(collection_id): Path<String>,
                          uri: Uri,
                          headers: HeaderMap,
                          Query(pairs): Query<QueryPairs>,
                          Json(body): Json<Map<String, Value>>| {
                        let pairs = data::merge_body(pairs, body);
                        data::collection_query(query_type, state, collection_id, uri, headers, pairs)
                    },
                ),
            )
            .route(
                &format!("/collections/:collection_id/instances/:instance_id/{}", name),
                get(
                    move |Extension(state): Extension<Arc<AppState>>,
                          Path(ids): Path<(String, String)>,
                          uri: Uri,
                          headers: HeaderMap,
                          Query(pairs): Query<QueryPairs>| {
                        data::instance_query(query_type, state, ids, uri, headers, pairs)
                    },
                )
                .post(
                    move |Extension(state): Extension<Arc<AppState>>,
                          Path(ids): Path<(String, String)>,
                          uri: Uri,
                          headers: HeaderMap,
                          Query(pairs): Query<QueryPairs>,
                          Json(body): Json<Map<String, Value>>| {
                        let pairs = data::merge_body(pairs, body);
                        data::instance_query(query_type, state, ids, uri, headers, pairs)
                    },
                ),
            );
    }
    router
}

fn features_router() -> Router {
    Router::new()
        .route("/", get(handlers::landing::features_landing_handler))
        .route("/conformance", get(handlers::conformance::features_conformance_handler))
        .route("/api", get(handlers::api::features_api_handler))
        .route("/api.html", get(handlers::api::api_html_handler))
        .route("/collections", get(handlers::collections::features_collections_handler))
        .route(
            "/collections/:collection_id",
            get(handlers::collections::features_collection_handler),
        )
        .route(
            "/collections/:collection_id/items",
            get(data::features_items_handler),
        )
        .route(
            "/collections/:collection_id/items/:item_id",
            get(data::features_item_handler),
        )
}

/// The complete application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/edr", edr_router())
        .nest("/features", features_router())
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
