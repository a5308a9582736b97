//! Output format negotiation and document encoding.
//!
//! The `f` query parameter is authoritative. Without one, the Accept
//! header may pick among the formats the operation declares; anything it
//! cannot satisfy falls back to the operation's default format.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use edr_protocol::{media_types, CrsConfig, EdrError, OutputFormat};

use crate::error::ApiResult;

/// Header echoing the CRS of the coordinates in the body.
pub static CONTENT_CRS: HeaderName = HeaderName::from_static("content-crs");

/// Cache lifetime of metadata documents, in seconds.
pub const METADATA_MAX_AGE: u32 = 300;

/// Formats every metadata document can be encoded in.
pub const METADATA_FORMATS: &[OutputFormat] = &[OutputFormat::Json, OutputFormat::Yaml];

/// Map a media type to an output format.
pub fn format_from_media_type(media_type: &str) -> Option<OutputFormat> {
    match media_type.to_ascii_lowercase().as_str() {
        media_types::COVERAGE_JSON | media_types::COVERAGE_JSON_ALT => {
            Some(OutputFormat::CoverageJson)
        }
        media_types::GEO_JSON => Some(OutputFormat::GeoJson),
        media_types::JSON => Some(OutputFormat::Json),
        media_types::YAML | "application/yaml" | "application/x-yaml" => Some(OutputFormat::Yaml),
        _ => None,
    }
}

/// Media types of an Accept header, highest quality first. `q=0` entries are dropped.
pub fn parse_accept(headers: &HeaderMap) -> Vec<(String, f32)> {
    let accept = match headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        Some(accept) => accept,
        None => return Vec::new(),
    };

    let mut accepted: Vec<(String, f32)> = accept
        .split(',')
        .filter_map(|s| {
            let mut parts = s.split(';');
            let media_type = parts.next()?.trim();
            if media_type.is_empty() {
                return None;
            }
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q=").and_then(|q| q.parse::<f32>().ok()))
                .unwrap_or(1.0);
            Some((media_type.to_string(), quality))
        })
        .filter(|(_, q)| *q > 0.0)
        .collect();

    // Stable sort keeps header order among equal qualities.
    accepted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    accepted
}

/// The best declared format the Accept header asks for explicitly.
///
/// Wildcards mean "no preference" and yield `None`.
pub fn preferred_format(headers: &HeaderMap, allowed: &[OutputFormat]) -> Option<OutputFormat> {
    for (media_type, _) in parse_accept(headers) {
        if media_type.ends_with("/*") {
            return None;
        }
        if let Some(format) = format_from_media_type(&media_type) {
            if allowed.contains(&format) {
                return Some(format);
            }
        }
    }
    None
}

/// Add an `f` pair chosen from the Accept header when the query has none.
pub fn with_accept_format(
    mut pairs: Vec<(String, String)>,
    headers: &HeaderMap,
    allowed: &[OutputFormat],
) -> Vec<(String, String)> {
    let has_f = pairs.iter().any(|(k, v)| k == "f" && !v.trim().is_empty());
    if !has_f {
        if let Some(format) = preferred_format(headers, allowed) {
            pairs.retain(|(k, _)| k != "f");
            pairs.push(("f".to_string(), format.key().to_string()));
        }
    }
    pairs
}

/// Resolve the format of a metadata document.
pub fn negotiate_metadata(
    f: Option<&str>,
    headers: &HeaderMap,
    allowed: &[OutputFormat],
) -> Result<OutputFormat, EdrError> {
    match f.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => OutputFormat::negotiate(Some(f), OutputFormat::Json, allowed),
        None => Ok(preferred_format(headers, allowed).unwrap_or(OutputFormat::Json)),
    }
}

/// Encode a document body. Every format except YAML is JSON text.
pub fn encode<T: Serialize>(doc: &T, format: OutputFormat) -> Result<Vec<u8>, EdrError> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(doc)
            .map(String::into_bytes)
            .map_err(|e| EdrError::Internal(format!("YAML encoding failed: {}", e))),
        _ => serde_json::to_vec(doc)
            .map_err(|e| EdrError::Internal(format!("JSON encoding failed: {}", e))),
    }
}

/// A 200 response carrying `doc` in `format`, with `content-crs` when given.
pub fn document_response<T: Serialize>(
    doc: &T,
    format: OutputFormat,
    crs: Option<&CrsConfig>,
) -> ApiResult<Response> {
    let body = encode(doc, format)?;
    let mut response = ([(header::CONTENT_TYPE, format.content_type())], body).into_response();

    if let Some(crs) = crs {
        let value = HeaderValue::from_str(&crs.header_value())
            .map_err(|e| EdrError::Internal(format!("Invalid content-crs value: {}", e)))?;
        response.headers_mut().insert(CONTENT_CRS.clone(), value);
    }
    Ok(response)
}

/// [`document_response`] with the metadata cache lifetime.
pub fn metadata_response<T: Serialize>(
    doc: &T,
    format: OutputFormat,
    crs: Option<&CrsConfig>,
) -> ApiResult<Response> {
    let mut response = document_response(doc, format, crs)?;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("max-age={}", METADATA_MAX_AGE))
            .unwrap_or(HeaderValue::from_static("no-cache")),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_protocol::CrsRegistry;

    fn make_headers(accept: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(accept).unwrap());
        headers
    }

    const DATA: &[OutputFormat] = &[
        OutputFormat::CoverageJson,
        OutputFormat::GeoJson,
        OutputFormat::Json,
    ];

    #[test]
    fn test_media_type_aliases() {
        assert_eq!(
            format_from_media_type("application/prs.coverage+json"),
            Some(OutputFormat::CoverageJson)
        );
        assert_eq!(
            format_from_media_type("application/vnd.cov+json"),
            Some(OutputFormat::CoverageJson)
        );
        assert_eq!(format_from_media_type("text/yaml"), Some(OutputFormat::Yaml));
        assert_eq!(format_from_media_type("image/png"), None);
    }

    #[test]
    fn test_accept_quality_order() {
        let headers = make_headers("application/json;q=0.5, application/geo+json");
        assert_eq!(preferred_format(&headers, DATA), Some(OutputFormat::GeoJson));
    }

    #[test]
    fn test_accept_skips_undeclared() {
        let headers = make_headers("text/yaml, application/json;q=0.9");
        assert_eq!(preferred_format(&headers, DATA), Some(OutputFormat::Json));
    }

    #[test]
    fn test_accept_wildcard_is_no_preference() {
        let headers = make_headers("*/*");
        assert_eq!(preferred_format(&headers, DATA), None);

        // Typical browser header.
        let headers =
            make_headers("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8");
        assert_eq!(preferred_format(&headers, DATA), None);
    }

    #[test]
    fn test_accept_zero_quality_dropped() {
        let headers = make_headers("application/geo+json;q=0, application/json");
        assert_eq!(parse_accept(&headers).len(), 1);
        assert_eq!(preferred_format(&headers, DATA), Some(OutputFormat::Json));
    }

    #[test]
    fn test_no_accept_header() {
        assert!(parse_accept(&HeaderMap::new()).is_empty());
        assert_eq!(preferred_format(&HeaderMap::new(), DATA), None);
    }

    #[test]
    fn test_explicit_f_wins_over_accept() {
        let headers = make_headers("application/geo+json");
        let pairs = vec![("f".to_string(), "json".to_string())];
        let pairs = with_accept_format(pairs, &headers, DATA);
        assert_eq!(pairs, vec![("f".to_string(), "json".to_string())]);
    }

    #[test]
    fn test_accept_fills_empty_f() {
        let headers = make_headers("application/geo+json");
        let pairs = vec![
            ("f".to_string(), "".to_string()),
            ("coords".to_string(), "POINT(36.8 -1.3)".to_string()),
        ];
        let pairs = with_accept_format(pairs, &headers, DATA);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("f".to_string(), "geojson".to_string()));
    }

    #[test]
    fn test_negotiate_metadata() {
        let none = HeaderMap::new();
        assert_eq!(
            negotiate_metadata(None, &none, METADATA_FORMATS).unwrap(),
            OutputFormat::Json
        );
        assert_eq!(
            negotiate_metadata(Some("YAML"), &none, METADATA_FORMATS).unwrap(),
            OutputFormat::Yaml
        );
        let err = negotiate_metadata(Some("coveragejson"), &none, METADATA_FORMATS).unwrap_err();
        assert_eq!(err.parameter(), Some("f"));
        assert_eq!(
            negotiate_metadata(None, &make_headers("text/yaml"), METADATA_FORMATS).unwrap(),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn test_document_response_headers() {
        let registry = CrsRegistry::builtin();
        let crs = registry.default_crs();
        let doc = serde_json::json!({"a": 1});

        let response = document_response(&doc, OutputFormat::CoverageJson, Some(crs)).unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/vnd.cov+json"
        );
        assert_eq!(
            response.headers().get("content-crs").unwrap(),
            "<http://www.opengis.net/def/crs/OGC/1.3/CRS84>"
        );

        let response = metadata_response(&doc, OutputFormat::Yaml, None).unwrap();
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/yaml");
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "max-age=300");
        assert!(response.headers().get("content-crs").is_none());
    }

    #[test]
    fn test_yaml_encoding() {
        let doc = serde_json::json!({"title": "OGC-API EDR"});
        let body = encode(&doc, OutputFormat::Yaml).unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "title: OGC-API EDR\n");
    }
}
