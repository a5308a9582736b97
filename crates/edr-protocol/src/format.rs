//! Output formats selectable through the `f` query parameter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::EdrError;
use crate::media_types;

/// Response encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "JSON", alias = "json")]
    Json,
    #[serde(rename = "GeoJSON", alias = "geojson")]
    GeoJson,
    #[serde(rename = "CoverageJSON", alias = "coveragejson")]
    CoverageJson,
    #[serde(rename = "YAML", alias = "yaml")]
    Yaml,
}

impl OutputFormat {
    /// Lowercase key used as the `f` value in generated links.
    pub fn key(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::GeoJson => "geojson",
            OutputFormat::CoverageJson => "coveragejson",
            OutputFormat::Yaml => "yaml",
        }
    }

    /// Name as declared in collection metadata.
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::GeoJson => "GeoJSON",
            OutputFormat::CoverageJson => "CoverageJSON",
            OutputFormat::Yaml => "YAML",
        }
    }

    /// Get the Content-Type header value for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => media_types::JSON,
            OutputFormat::GeoJson => media_types::GEO_JSON,
            OutputFormat::CoverageJson => media_types::COVERAGE_JSON,
            OutputFormat::Yaml => media_types::YAML,
        }
    }

    /// Case-insensitive lookup of an `f` value.
    pub fn from_query_param(f: &str) -> Option<Self> {
        match f.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "geojson" => Some(OutputFormat::GeoJson),
            "coveragejson" | "covjson" => Some(OutputFormat::CoverageJson),
            "yaml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }

    /// Resolve `f` against the formats an operation declares.
    ///
    /// An absent or empty value selects `default`.
    pub fn negotiate(
        f: Option<&str>,
        default: OutputFormat,
        allowed: &[OutputFormat],
    ) -> Result<Self, EdrError> {
        let raw = match f.map(str::trim) {
            None | Some("") => return Ok(default),
            Some(raw) => raw,
        };

        OutputFormat::from_query_param(raw)
            .filter(|format| allowed.contains(format))
            .ok_or_else(|| {
                let names: Vec<&str> = allowed.iter().map(|f| f.key()).collect();
                EdrError::invalid_value(
                    "f",
                    format!(
                        "output format '{}' is not supported, valid values are: {}",
                        raw,
                        names.join(", ")
                    ),
                )
            })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &[OutputFormat] = &[
        OutputFormat::CoverageJson,
        OutputFormat::GeoJson,
        OutputFormat::Json,
    ];

    #[test]
    fn test_negotiate_default() {
        let f = OutputFormat::negotiate(None, OutputFormat::CoverageJson, DATA).unwrap();
        assert_eq!(f, OutputFormat::CoverageJson);
        let f = OutputFormat::negotiate(Some(""), OutputFormat::GeoJson, DATA).unwrap();
        assert_eq!(f, OutputFormat::GeoJson);
    }

    #[test]
    fn test_negotiate_is_case_insensitive() {
        let f = OutputFormat::negotiate(Some("GeoJSON"), OutputFormat::CoverageJson, DATA).unwrap();
        assert_eq!(f, OutputFormat::GeoJson);
        let f = OutputFormat::negotiate(Some("COVERAGEJSON"), OutputFormat::Json, DATA).unwrap();
        assert_eq!(f, OutputFormat::CoverageJson);
    }

    #[test]
    fn test_negotiate_rejects_undeclared() {
        let err = OutputFormat::negotiate(Some("yaml"), OutputFormat::Json, DATA).unwrap_err();
        assert_eq!(err.parameter(), Some("f"));
        assert!(err.to_string().contains("coveragejson, geojson, json"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::CoverageJson.content_type(), "application/vnd.cov+json");
        assert_eq!(OutputFormat::GeoJson.content_type(), "application/geo+json");
        assert_eq!(OutputFormat::Yaml.content_type(), "text/yaml");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&OutputFormat::CoverageJson).unwrap();
        assert_eq!(json, "\"CoverageJSON\"");
        let parsed: OutputFormat = serde_yaml::from_str("geojson").unwrap();
        assert_eq!(parsed, OutputFormat::GeoJson);
    }
}
