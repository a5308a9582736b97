//! OpenAPI definition handlers.
//!
//! The definition is generated from the collection registry so that every
//! published data query shows up with the parameters it accepts.

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use edr_protocol::media_types;
use edr_protocol::normalizer::{declared_parameters, Endpoint};
use edr_protocol::{Api, CollectionRegistry, QueryType};

use crate::error::ApiResult;
use crate::state::AppState;

const API_MAX_AGE: &str = "max-age=3600";

fn query_parameter(name: &str) -> Value {
    let (description, required) = match name {
        "coords" => ("Well Known Text geometry of the query", true),
        "f" => ("Output format", false),
        "crs" => ("Coordinate reference system of the response", false),
        "bbox" => ("Bounding box: minx,miny,maxx,maxy or a 6-value box with heights", false),
        "bbox-crs" => ("Coordinate reference system of bbox", false),
        "datetime" => ("Instant or interval, open ends as '..'", false),
        "z" => ("Height: a value, a list, min/max or Rn/min/step", false),
        "parameter-name" => ("Comma-separated parameter ids", false),
        "within" | "corridor-width" | "corridor-height" => ("Distance", name != "corridor-height"),
        "within-units" | "width-units" | "height-units" => ("Distance unit", name != "height-units"),
        "limit" => ("Maximum number of results", false),
        "offset" => ("Number of results to skip", false),
        _ => ("", false),
    };
    json!({
        "name": name,
        "in": "query",
        "required": required,
        "description": description,
        "schema": { "type": "string" },
    })
}

fn path_parameter(name: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": "string" },
    })
}

fn operation(summary: String, path_params: &[&str], query_params: &[&str]) -> Value {
    let mut parameters: Vec<Value> = path_params.iter().map(|p| path_parameter(p)).collect();
    parameters.extend(query_params.iter().map(|p| query_parameter(p)));
    json!({
        "get": {
            "summary": summary,
            "parameters": parameters,
            "responses": {
                "200": { "description": "Successful response" },
                "400": { "description": "Invalid query" },
                "404": { "description": "Resource not found" },
                "500": { "description": "Server error" },
            },
        }
    })
}

fn edr_paths(registry: &CollectionRegistry) -> Map<String, Value> {
    let mut paths = Map::new();
    paths.insert("/".into(), operation("Landing page".into(), &[], &["f"]));
    paths.insert("/conformance".into(), operation("Conformance classes".into(), &[], &["f"]));
    paths.insert(
        "/collections".into(),
        operation("Collections".into(), &[], &["f", "crs", "bbox", "datetime", "z"]),
    );

    for collection in registry.published(Api::Edr) {
        let id = &collection.id;
        paths.insert(
            format!("/collections/{}", id),
            operation(format!("Collection {}", id), &[], &["f", "crs"]),
        );

        let instances = collection.supports(QueryType::Instances);
        if instances {
            paths.insert(
                format!("/collections/{}/instances", id),
                operation(
                    format!("Instances of {}", id),
                    &[],
                    declared_parameters(QueryType::Instances, Endpoint::Query),
                ),
            );
            paths.insert(
                format!("/collections/{}/instances/{{instanceId}}", id),
                operation(format!("Instance of {}", id), &["instanceId"], &["f", "crs"]),
            );
        }

        for archetype in &collection.data_queries {
            let query_type = archetype.query_type;
            if query_type == QueryType::Instances {
                continue;
            }
            let name = query_type.as_str();
            let declared = declared_parameters(query_type, Endpoint::Query);
            paths.insert(
                format!("/collections/{}/{}", id, name),
                operation(format!("{} query of {}", name, id), &[], declared),
            );
            if instances {
                paths.insert(
                    format!("/collections/{}/instances/{{instanceId}}/{}", id, name),
                    operation(format!("{} query of an instance of {}", name, id), &["instanceId"], declared),
                );
            }

            let single = match query_type {
                QueryType::Items => Some("itemId"),
                QueryType::Locations => Some("locationId"),
                _ => None,
            };
            if let Some(key) = single {
                let declared = declared_parameters(query_type, Endpoint::Single);
                paths.insert(
                    format!("/collections/{}/{}/{{{}}}", id, name, key),
                    operation(format!("Single {} of {}", name, id), &[key], declared),
                );
            }
        }
    }
    paths
}

fn features_paths(registry: &CollectionRegistry) -> Map<String, Value> {
    let mut paths = Map::new();
    paths.insert("/".into(), operation("Landing page".into(), &[], &["f"]));
    paths.insert("/conformance".into(), operation("Conformance classes".into(), &[], &["f"]));
    paths.insert(
        "/collections".into(),
        operation("Collections".into(), &[], &["f", "crs", "bbox", "datetime"]),
    );

    for collection in registry.published(Api::Features) {
        let id = &collection.id;
        paths.insert(
            format!("/collections/{}", id),
            operation(format!("Collection {}", id), &[], &["f", "crs"]),
        );
        paths.insert(
            format!("/collections/{}/items", id),
            operation(
                format!("Items of {}", id),
                &[],
                declared_parameters(QueryType::Items, Endpoint::Query),
            ),
        );
        paths.insert(
            format!("/collections/{}/items/{{featureId}}", id),
            operation(
                format!("Single item of {}", id),
                &["featureId"],
                declared_parameters(QueryType::Items, Endpoint::Single),
            ),
        );
    }
    paths
}

/// OpenAPI 3.0 definition of one tree served at `server_url`.
pub fn openapi_document(registry: &CollectionRegistry, api: Api, server_url: &str) -> Value {
    let (title, paths) = match api {
        Api::Edr => ("OGC API - Environmental Data Retrieval", edr_paths(registry)),
        Api::Features => ("OGC API - Features", features_paths(registry)),
    };
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": title,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": server_url }],
        "paths": paths,
    })
}

fn api_response(doc: &Value) -> ApiResult<Response> {
    let body = serde_json::to_vec(doc)
        .map_err(|e| edr_protocol::EdrError::Internal(format!("JSON encoding failed: {}", e)))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, media_types::OPENAPI_JSON),
            (header::CACHE_CONTROL, API_MAX_AGE),
        ],
        body,
    )
        .into_response())
}

/// GET /edr/api - OpenAPI definition
pub async fn edr_api_handler(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    api_response(&openapi_document(&state.collections, Api::Edr, &state.edr_url()))
}

/// GET /features/api - OpenAPI definition
pub async fn features_api_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Response> {
    api_response(&openapi_document(&state.collections, Api::Features, &state.features_url()))
}

/// GET /{tree}/api.html - API documentation rendered by ReDoc
pub async fn api_html_handler() -> Response {
    let html = r#"<!DOCTYPE html>
<html>
<head>
    <title>API Documentation</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link href="https://fonts.googleapis.com/css?family=Montserrat:300,400,700|Roboto:300,400,700" rel="stylesheet">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <redoc spec-url='api'></redoc>
    <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
</body>
</html>"#;

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, API_MAX_AGE),
        ],
        html,
    )
        .into_response()
}
