//! Link and pagination composer.
//!
//! [`LinkComposer`] is a pure builder over the current request URL, the
//! active output format and the formats the operation declares. Calling it
//! twice with the same inputs yields the same links.

use crate::filters::Pagination;
use crate::format::OutputFormat;
use crate::media_types;
use crate::registry::QueryType;
use crate::types::Link;

/// The URL of the current request, split into server root, path and query.
///
/// Query pairs are kept exactly as received (still percent-encoded) so
/// `self` reproduces the request unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    base: String,
    path: String,
    query: Vec<(String, String)>,
}

impl RequestUrl {
    /// `base` is the public server root (e.g. `http://host/edr`), `path` is
    /// relative to it and `raw_query` is the undecoded query string.
    pub fn new(base: &str, path: &str, raw_query: Option<&str>) -> Self {
        let query = raw_query
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        Self {
            base: base.trim_end_matches('/').to_string(),
            path: path.to_string(),
            query,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// A copy with `key` set to `value`, replacing any existing occurrence.
    pub fn with_param(&self, key: &str, value: &str) -> Self {
        let mut url = self.clone();
        match url.query.iter().position(|(k, _)| k == key) {
            Some(i) => {
                url.query[i].1 = value.to_string();
                let mut seen = false;
                url.query.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => url.query.push((key.to_string(), value.to_string())),
        }
        url
    }

    pub fn href(&self) -> String {
        let mut href = format!("{}{}", self.base, self.path);
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            href.push('?');
            href.push_str(&query.join("&"));
        }
        href
    }

    /// An absolute href for another path under the same server root.
    pub fn resolve(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

/// Accumulates links for one response document.
#[derive(Debug, Clone)]
pub struct LinkComposer {
    url: RequestUrl,
    format: OutputFormat,
    output_formats: Vec<OutputFormat>,
    links: Vec<Link>,
}

impl LinkComposer {
    pub fn new(url: RequestUrl, format: OutputFormat, output_formats: &[OutputFormat]) -> Self {
        Self {
            url,
            format,
            output_formats: output_formats.to_vec(),
            links: Vec::new(),
        }
    }

    /// Replace the declared formats, e.g. when linking `/items` from `/collections`.
    pub fn override_output_formats(mut self, output_formats: &[OutputFormat]) -> Self {
        self.output_formats = output_formats.to_vec();
        self
    }

    pub fn self_link(mut self) -> Self {
        self.links.push(
            Link::new(self.url.href(), "self")
                .with_type(self.format.content_type())
                .with_title(format!("This document as {}", self.format.key().to_uppercase())),
        );
        self
    }

    /// One link per other declared format, with `f` swapped.
    pub fn alternates(mut self) -> Self {
        for format in self.output_formats.iter().filter(|f| **f != self.format) {
            let href = self.url.with_param("f", format.key()).href();
            self.links.push(
                Link::new(href, "alternate")
                    .with_type(format.content_type())
                    .with_title(format!("View this document as {}", format.key().to_uppercase())),
            );
        }
        self
    }

    /// `next` iff `number_matched > offset + limit`; `prev` iff `offset > 0`.
    pub fn pagination(mut self, number_matched: i64, page: Pagination) -> Self {
        let Pagination { offset, limit } = page;
        let limit_text = limit.to_string();

        if number_matched > offset + limit {
            let href = self
                .url
                .with_param("offset", &(offset + limit).to_string())
                .with_param("limit", &limit_text)
                .href();
            self.links.push(
                Link::new(href, "next")
                    .with_type(self.format.content_type())
                    .with_title("View next page of results"),
            );
        }

        if offset > 0 {
            let href = self
                .url
                .with_param("offset", &(offset - limit).max(0).to_string())
                .with_param("limit", &limit_text)
                .href();
            self.links.push(
                Link::new(href, "prev")
                    .with_type(self.format.content_type())
                    .with_title("View previous page of results"),
            );
        }
        self
    }

    pub fn conformance(mut self) -> Self {
        self.links.push(
            Link::new(self.url.resolve("/conformance"), "conformance")
                .with_type(media_types::JSON)
                .with_title("conformance"),
        );
        self
    }

    pub fn service_desc(mut self) -> Self {
        self.links.push(
            Link::new(self.url.resolve("/api"), "service-desc")
                .with_type(media_types::OPENAPI_JSON)
                .with_title("View the document powering this server"),
        );
        self
    }

    pub fn service_doc(mut self) -> Self {
        self.links.push(
            Link::new(self.url.resolve("/api.html"), "service-doc")
                .with_type(media_types::HTML)
                .with_title("View the OpenAPI document inside an interactive console"),
        );
        self
    }

    pub fn collections(mut self) -> Self {
        self.links.push(
            Link::new(self.url.resolve("/collections"), "data")
                .with_type(media_types::JSON)
                .with_title("Collections"),
        );
        self
    }

    /// Collection metadata, one link per declared format.
    pub fn collection(mut self, collection_id: &str) -> Self {
        let path = format!("/collections/{}", collection_id);
        for format in &self.output_formats {
            self.links.push(
                Link::new(format!("{}?f={}", self.url.resolve(&path), format.key()), "collection")
                    .with_type(format.content_type())
                    .with_title("View specific collection metadata page"),
            );
        }
        self
    }

    pub fn items(mut self, collection_id: &str) -> Self {
        self.links.push(
            Link::new(
                self.url.resolve(&format!("/collections/{}/items", collection_id)),
                "items",
            )
            .with_type(media_types::GEO_JSON)
            .with_title("Items"),
        );
        self
    }

    /// A single item, one link per declared format.
    pub fn item(mut self, collection_id: &str, item_id: &str) -> Self {
        let path = format!("/collections/{}/items/{}", collection_id, item_id);
        for format in &self.output_formats {
            self.links.push(
                Link::new(format!("{}?f={}", self.url.resolve(&path), format.key()), "items")
                    .with_type(format.content_type())
                    .with_title("View items available in this collection"),
            );
        }
        self
    }

    /// Instance metadata, one link per declared format.
    pub fn to_instance(mut self, collection_id: &str, instance_id: &str) -> Self {
        let path = format!("/collections/{}/instances/{}", collection_id, instance_id);
        for format in &self.output_formats {
            self.links.push(
                Link::new(format!("{}?f={}", self.url.resolve(&path), format.key()), "collection")
                    .with_type(format.content_type())
                    .with_title(format!("View instance {} as {}", instance_id, format.key())),
            );
        }
        self
    }

    /// Append externally built links.
    pub fn extend(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        self.links.extend(links);
        self
    }

    pub fn build(self) -> Vec<Link> {
        self.links
    }
}

/// The link a collection document advertises for one data query.
pub fn data_query_link(
    base: &str,
    collection_id: &str,
    instance_id: Option<&str>,
    query_type: QueryType,
    default_format: OutputFormat,
) -> Link {
    let href = match instance_id {
        Some(instance) => format!(
            "{}/collections/{}/instances/{}/{}",
            base, collection_id, instance, query_type
        ),
        None => format!("{}/collections/{}/{}", base, collection_id, query_type),
    };
    let rel = if query_type == QueryType::Items {
        "items"
    } else {
        "data"
    };
    Link::new(href, rel)
        .with_type(default_format.content_type())
        .with_title(format!("Query collection using {}", query_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(query: Option<&str>) -> RequestUrl {
        RequestUrl::new("http://localhost:8083/edr/", "/collections/isd-2025/position", query)
    }

    fn rels(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.rel.as_str()).collect()
    }

    #[test]
    fn test_self_link_is_request_unmodified() {
        let links = LinkComposer::new(
            url(Some("coords=POINT(36%201)&f=json")),
            OutputFormat::Json,
            &[OutputFormat::Json],
        )
        .self_link()
        .build();
        assert_eq!(
            links[0].href,
            "http://localhost:8083/edr/collections/isd-2025/position?coords=POINT(36%201)&f=json"
        );
        assert_eq!(links[0].type_.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_alternates_swap_f() {
        let links = LinkComposer::new(
            url(Some("f=json&coords=x")),
            OutputFormat::Json,
            &[OutputFormat::Json, OutputFormat::Yaml, OutputFormat::CoverageJson],
        )
        .alternates()
        .build();
        assert_eq!(links.len(), 2);
        assert!(links[0].href.ends_with("position?f=yaml&coords=x"));
        assert!(links[1].href.ends_with("position?f=coveragejson&coords=x"));
        assert!(links.iter().all(|l| l.rel == "alternate"));
    }

    #[test]
    fn test_pagination_next_and_prev() {
        let page = Pagination { offset: 20, limit: 10 };
        let links = LinkComposer::new(url(None), OutputFormat::GeoJson, &[])
            .pagination(100, page)
            .build();
        assert_eq!(rels(&links), ["next", "prev"]);
        assert!(links[0].href.ends_with("?offset=30&limit=10"));
        assert!(links[1].href.ends_with("?offset=10&limit=10"));
    }

    #[test]
    fn test_prev_offset_never_negative() {
        let page = Pagination { offset: 5, limit: 20 };
        let links = LinkComposer::new(url(Some("offset=5")), OutputFormat::GeoJson, &[])
            .pagination(10, page)
            .build();
        assert_eq!(rels(&links), ["prev"]);
        assert!(links[0].href.ends_with("?offset=0&limit=20"));
    }

    #[test]
    fn test_pagination_invariant() {
        for matched in 0..40 {
            for offset in [0, 1, 10, 25] {
                for limit in [1, 10, 20] {
                    let links = LinkComposer::new(url(None), OutputFormat::Json, &[])
                        .pagination(matched, Pagination { offset, limit })
                        .build();
                    let r = rels(&links);
                    assert_eq!(r.contains(&"next"), matched > limit + offset);
                    assert_eq!(r.contains(&"prev"), offset > 0);
                }
            }
        }
    }

    #[test]
    fn test_composer_is_idempotent() {
        let build = || {
            LinkComposer::new(
                url(Some("f=json")),
                OutputFormat::Json,
                &[OutputFormat::Json, OutputFormat::Yaml],
            )
            .self_link()
            .alternates()
            .pagination(50, Pagination { offset: 20, limit: 20 })
            .conformance()
            .collection("isd-2025")
            .build()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_with_param_collapses_duplicates() {
        let u = url(Some("f=json&f=yaml&z=1")).with_param("f", "geojson");
        assert!(u.href().ends_with("?f=geojson&z=1"));
    }

    #[test]
    fn test_data_query_link() {
        let link = data_query_link(
            "http://h/edr",
            "isd-2025",
            Some("2025-01-01"),
            QueryType::Position,
            OutputFormat::CoverageJson,
        );
        assert_eq!(link.href, "http://h/edr/collections/isd-2025/instances/2025-01-01/position");
        assert_eq!(link.rel, "data");
        assert_eq!(link.title.as_deref(), Some("Query collection using position"));

        let items = data_query_link("http://h/edr", "c", None, QueryType::Items, OutputFormat::GeoJson);
        assert_eq!(items.rel, "items");
    }
}
