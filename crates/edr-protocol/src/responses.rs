//! Landing, conformance and exception documents.

use serde::{Deserialize, Serialize};

use crate::conformance;
use crate::types::Link;

/// Landing page document for an API root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandingPage {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub links: Vec<Link>,
}

impl LandingPage {
    /// Landing page of the EDR tree.
    pub fn edr(links: Vec<Link>) -> Self {
        Self {
            title: "OGC-API EDR".to_string(),
            description: Some(
                "Reference API implementation for OGC-API Environmental Data Retrieval (EDR)"
                    .to_string(),
            ),
            links,
        }
    }

    /// Landing page of the Features tree.
    pub fn features(links: Vec<Link>) -> Self {
        Self {
            title: "OGC API Features Demo API".to_string(),
            description: Some(
                "Demo API for OGC Features API.\n Supports Part 1 and Part 2 Conformance Requirements"
                    .to_string(),
            ),
            links,
        }
    }
}

/// Conformance declaration response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConformanceClasses {
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl ConformanceClasses {
    /// Conformance classes declared by the EDR tree.
    pub fn edr() -> Self {
        Self::from_uris(conformance::EDR)
    }

    /// Conformance classes declared by the Features tree.
    pub fn features() -> Self {
        Self::from_uris(conformance::FEATURES)
    }

    fn from_uris(uris: &[&str]) -> Self {
        Self {
            conforms_to: uris.iter().map(|u| u.to_string()).collect(),
            links: Vec::new(),
        }
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    /// Check if a conformance class is declared.
    pub fn contains(&self, class: &str) -> bool {
        self.conforms_to.iter().any(|c| c == class)
    }
}

/// Exception response for errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    /// Exception type identifier.
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// URI of the request that caused the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ExceptionResponse {
    pub fn new(type_: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            title: None,
            status: Some(status),
            detail: Some(detail.into()),
            instance: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// 404 Not Found.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0/not-found",
            404,
            detail,
        )
        .with_title("Not Found")
    }

    /// 400 Bad Request.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0/invalid-parameter-value",
            400,
            detail,
        )
        .with_title("Bad Request")
    }

    /// 500 Internal Server Error.
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0/server-error",
            500,
            detail,
        )
        .with_title("Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edr_landing_page() {
        let landing = LandingPage::edr(vec![Link::new("http://localhost:8083/edr", "self")]);
        assert_eq!(landing.title, "OGC-API EDR");
        assert!(landing.description.unwrap().contains("Environmental Data Retrieval"));
        assert_eq!(landing.links.len(), 1);
    }

    #[test]
    fn test_edr_conformance() {
        let conf = ConformanceClasses::edr();
        assert!(conf.contains(conformance::EDR_CORE));
        assert!(conf.contains(conformance::EDR_COVJSON));
        assert!(conf.contains(conformance::EDR_GEOJSON));
        assert!(!conf.contains(conformance::FEATURES_CORE));
    }

    #[test]
    fn test_features_conformance() {
        let conf = ConformanceClasses::features();
        assert_eq!(conf.conforms_to.len(), 4);
        assert!(conf.contains(conformance::FEATURES_CRS));
    }

    #[test]
    fn test_conformance_serialization_skips_empty_links() {
        let json = serde_json::to_string(&ConformanceClasses::features()).unwrap();
        assert!(json.contains("\"conformsTo\""));
        assert!(!json.contains("\"links\""));
    }

    #[test]
    fn test_exception_bad_request() {
        let exc = ExceptionResponse::bad_request("parameter 'crs': nope");
        assert_eq!(exc.status, Some(400));
        assert_eq!(exc.title, Some("Bad Request".to_string()));
        assert!(exc.type_.ends_with("invalid-parameter-value"));
    }

    #[test]
    fn test_exception_serialization() {
        let exc = ExceptionResponse::not_found("no such collection: missing")
            .with_instance("/edr/collections/missing");

        let json = serde_json::to_value(&exc).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["title"], "Not Found");
        assert_eq!(json["instance"], "/edr/collections/missing");
    }
}
