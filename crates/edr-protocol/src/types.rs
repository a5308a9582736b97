//! Core document types shared by the EDR and Features trees.

use serde::{Deserialize, Serialize};

use crate::crs::TRS_GREGORIAN;

/// A hyperlink to a related resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// The URI of the linked resource.
    pub href: String,

    /// The relationship type (e.g., "self", "data", "conformance").
    pub rel: String,

    /// The media type of the linked resource.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Whether the link is a URI template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
}

impl Link {
    /// Create a new link with required fields.
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            type_: None,
            title: None,
            templated: None,
            hreflang: None,
        }
    }

    /// Set the media type.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_hreflang(mut self, hreflang: impl Into<String>) -> Self {
        self.hreflang = Some(hreflang.into());
        self
    }

    /// Explicitly flag the link as (not) templated.
    pub fn with_templated(mut self, templated: bool) -> Self {
        self.templated = Some(templated);
        self
    }
}

/// The spatial, temporal and vertical extent of a collection or instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Extent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialExtent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalExtent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalExtent>,
}

/// Spatial extent with bounding box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpatialExtent {
    /// Bounding boxes as `[xmin, ymin, (zmin,) xmax, ymax(, zmax)]` arrays.
    pub bbox: Vec<Vec<f64>>,

    /// CRS URI the bbox is expressed in.
    pub crs: String,
}

/// Temporal extent with time intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporalExtent {
    /// `[start, end]` pairs; null marks an open end.
    pub interval: Vec<Vec<Option<String>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,

    pub trs: String,
}

impl TemporalExtent {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self {
            interval: vec![vec![start, end]],
            values: None,
            trs: TRS_GREGORIAN.to_string(),
        }
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = Some(values);
        self
    }
}

/// Vertical extent; levels are rendered as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerticalExtent {
    pub interval: Vec<Vec<Option<String>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,

    /// Vertical reference system.
    pub vrs: String,
}

impl VerticalExtent {
    pub fn new(min: Option<f64>, max: Option<f64>, vrs: impl Into<String>) -> Self {
        Self {
            interval: vec![vec![min.map(|v| v.to_string()), max.map(|v| v.to_string())]],
            values: None,
            vrs: vrs.into(),
        }
    }

    pub fn with_values(mut self, values: &[f64]) -> Self {
        self.values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}
