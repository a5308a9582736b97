//! Coordinate reference system registry.
//!
//! The registry is built once at startup (from `config/crs.yaml` or the
//! built-in table) and shared read-only afterwards. Every component that
//! needs CRS metadata receives a `&CrsRegistry` explicitly.

use serde::{Deserialize, Serialize};

use crate::errors::EdrError;

/// OGC CRS84 (WGS84 longitude/latitude).
pub const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";
/// OGC CRS84h (WGS84 longitude/latitude/ellipsoidal height).
pub const CRS84H: &str = "http://www.opengis.net/def/crs/OGC/0/CRS84h";
/// EPSG:4326 (WGS84 latitude/longitude).
pub const EPSG_4326: &str = "http://www.opengis.net/def/crs/EPSG/0/4326";
/// EPSG:4327 (WGS84 geographic 3D, latitude/longitude/height).
pub const EPSG_4327: &str = "http://www.opengis.net/def/crs/EPSG/0/4327";
/// EPSG:32737 (WGS84 / UTM zone 37S).
pub const EPSG_32737: &str = "http://www.opengis.net/def/crs/EPSG/0/32737";
/// EPSG:3857 (WGS84 / Pseudo-Mercator).
pub const EPSG_3857: &str = "http://www.opengis.net/def/crs/EPSG/0/3857";

/// Gregorian temporal reference system.
pub const TRS_GREGORIAN: &str = "http://www.opengis.net/def/uom/ISO-8601/0/Gregorian";

/// SRID used for metric distance comparisons (radius, corridor).
pub const METRIC_SRID: i32 = 3857;

/// Axis order of the first two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrder {
    /// Easting/longitude first.
    #[serde(rename = "XY")]
    Xy,
    /// Northing/latitude first.
    #[serde(rename = "YX")]
    Yx,
}

/// Kind of coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsKind {
    #[serde(rename = "GeographicCRS")]
    Geographic,
    #[serde(rename = "ProjectedCRS")]
    Projected,
}

impl CrsKind {
    /// CoverageJSON reference system type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CrsKind::Geographic => "GeographicCRS",
            CrsKind::Projected => "ProjectedCRS",
        }
    }
}

/// A supported coordinate reference system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsConfig {
    /// Identifying URI.
    pub uri: String,

    /// Storage engine spatial reference id.
    pub srid: i32,

    /// Defining authority (e.g. "EPSG", "OGC").
    pub authority: String,

    /// Authority version.
    pub version: String,

    /// Authority code.
    pub code: String,

    #[serde(rename = "type")]
    pub kind: CrsKind,

    pub axis_order: AxisOrder,

    /// Whether the CRS carries a vertical (height) axis.
    #[serde(default)]
    pub has_vertical: bool,

    #[serde(default)]
    pub wkt: String,
}

impl CrsConfig {
    #[allow(clippy::too_many_arguments)]
    fn builtin(
        uri: &str,
        srid: i32,
        authority: &str,
        version: &str,
        code: &str,
        kind: CrsKind,
        axis_order: AxisOrder,
        has_vertical: bool,
    ) -> Self {
        Self {
            uri: uri.to_string(),
            srid,
            authority: authority.to_string(),
            version: version.to_string(),
            code: code.to_string(),
            kind,
            axis_order,
            has_vertical,
            wkt: String::new(),
        }
    }

    /// True when coordinates must be flipped to reach canonical XY order.
    pub fn flips_axes(&self) -> bool {
        self.axis_order == AxisOrder::Yx
    }

    /// The value echoed in the `content-crs` header.
    pub fn header_value(&self) -> String {
        format!("<{}>", self.uri)
    }
}

/// Immutable lookup table of supported CRSs, keyed by URI.
#[derive(Debug, Clone)]
pub struct CrsRegistry {
    entries: Vec<CrsConfig>,
    default_index: usize,
}

impl CrsRegistry {
    /// Build a registry from explicit entries.
    ///
    /// Fails when a URI is declared twice or when CRS84 is missing, since
    /// CRS84 is the implicit default of every request.
    pub fn from_entries(entries: Vec<CrsConfig>) -> Result<Self, EdrError> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.uri == entry.uri) {
                return Err(EdrError::InvalidConfiguration(format!(
                    "CRS {} declared more than once",
                    entry.uri
                )));
            }
        }

        let default_index = entries
            .iter()
            .position(|e| e.uri == CRS84)
            .ok_or_else(|| {
                EdrError::InvalidConfiguration(format!("CRS registry must declare {}", CRS84))
            })?;

        Ok(Self {
            entries,
            default_index,
        })
    }

    /// The built-in registry.
    pub fn builtin() -> Self {
        use AxisOrder::*;
        use CrsKind::*;

        let entries = vec![
            CrsConfig::builtin(CRS84, 4326, "OGC", "1.3", "CRS84", Geographic, Xy, false),
            CrsConfig::builtin(CRS84H, 4327, "OGC", "0", "CRS84h", Geographic, Xy, true),
            CrsConfig::builtin(EPSG_4326, 4326, "EPSG", "0", "4326", Geographic, Yx, false),
            CrsConfig::builtin(EPSG_4327, 4327, "EPSG", "0", "4327", Geographic, Yx, true),
            CrsConfig::builtin(EPSG_32737, 32737, "EPSG", "0", "32737", Projected, Xy, false),
            CrsConfig::builtin(EPSG_3857, 3857, "EPSG", "0", "3857", Projected, Xy, false),
        ];

        Self {
            entries,
            default_index: 0,
        }
    }

    /// Look up a CRS by URI.
    pub fn resolve(&self, uri: &str) -> Option<&CrsConfig> {
        self.entries.iter().find(|e| e.uri == uri)
    }

    /// The default CRS (CRS84).
    pub fn default_crs(&self) -> &CrsConfig {
        &self.entries[self.default_index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrsConfig> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CrsRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
