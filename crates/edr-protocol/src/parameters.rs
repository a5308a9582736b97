//! Parameter metadata: units, observed properties and localized strings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::registry::ParameterConfig;

/// Internationalized string, either plain or keyed by language code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum I18nString {
    Simple(String),
    Localized(IndexMap<String, String>),
}

impl I18nString {
    /// Create an English-only i18n string.
    pub fn english(s: &str) -> Self {
        let mut map = IndexMap::new();
        map.insert("en".to_string(), s.to_string());
        I18nString::Localized(map)
    }

    /// Get the English text, or any available text.
    pub fn text(&self) -> &str {
        match self {
            I18nString::Simple(s) => s,
            I18nString::Localized(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .map(|s| s.as_str())
                .unwrap_or(""),
        }
    }
}

/// The observed property being measured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedProperty {
    /// URI identifier for the property; may be empty.
    #[serde(default)]
    pub id: String,

    pub label: I18nString,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,
}

impl ObservedProperty {
    pub fn new(id: impl Into<String>, label: &str) -> Self {
        Self {
            id: id.into(),
            label: I18nString::english(label),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(I18nString::english(desc));
        self
    }
}

/// Unit of measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub label: I18nString,

    /// Symbol or abbreviation; may be empty for categorical values.
    #[serde(default)]
    pub symbol: String,
}

impl Unit {
    pub fn new(label: &str, symbol: impl Into<String>) -> Self {
        Self {
            label: I18nString::english(label),
            symbol: symbol.into(),
        }
    }
}

/// A parameter as described in response documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDocument {
    #[serde(rename = "type")]
    pub type_: String,

    pub id: String,

    pub label: I18nString,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,

    pub unit: Unit,

    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,

    #[serde(rename = "data-type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ParameterDocument {
    pub fn from_config(param: &ParameterConfig) -> Self {
        Self {
            type_: "Parameter".to_string(),
            id: param.id.clone(),
            label: param.label().clone(),
            description: param.description().cloned(),
            unit: param.unit.clone(),
            observed_property: param.observed_property.clone(),
            data_type: None,
        }
    }

    /// Include the `data-type` member, as collection metadata does.
    pub fn with_data_type(mut self, param: &ParameterConfig) -> Self {
        self.data_type = Some(param.data_type.as_str().to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i18n_english() {
        let s = I18nString::english("Air Temperature");
        assert_eq!(s.text(), "Air Temperature");
        assert_eq!(
            serde_json::to_value(&s).unwrap(),
            serde_json::json!({"en": "Air Temperature"})
        );
    }

    #[test]
    fn test_i18n_fallback_language() {
        let s: I18nString = serde_json::from_str(r#"{"sw": "Joto"}"#).unwrap();
        assert_eq!(s.text(), "Joto");
        let plain: I18nString = serde_json::from_str(r#""Wind""#).unwrap();
        assert_eq!(plain.text(), "Wind");
    }

    #[test]
    fn test_unit_yaml() {
        let yaml = "label:\n  en: hectoPascals\nsymbol: hPa\n";
        let unit: Unit = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(unit, Unit::new("hectoPascals", "hPa"));
    }

    #[test]
    fn test_observed_property_empty_id() {
        let yaml = "label:\n  en: Wind Type\n";
        let prop: ObservedProperty = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(prop.id, "");
        assert!(prop.description.is_none());
    }
}
