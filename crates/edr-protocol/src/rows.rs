//! Typed result rows.
//!
//! The store returns each row as a JSON object. [`ResultRow::from_json`]
//! lifts it into a record with explicit fields for the known columns and
//! an ordered map for the aggregated parameter arrays, so the document
//! parsers never look at untyped column bags.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::EdrError;
use crate::geojson::Geometry;
use crate::parameters::I18nString;
use crate::registry::ParameterConfig;

/// Column carrying the geometry, pre-serialized as GeoJSON.
pub const GEOMETRY_COLUMN: &str = "geom";

/// A raw row as decoded from the store, in select order.
pub type JsonRow = IndexMap<String, Value>;

/// One result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub id: Option<Value>,
    pub location: Option<String>,
    pub label: Option<I18nString>,
    pub geometry: Option<Geometry>,
    /// Time axis aligned with every parameter array.
    pub datetime: Vec<String>,
    pub tmin: Option<String>,
    pub tmax: Option<String>,
    /// Requested parameter arrays in declaration order.
    pub parameters: IndexMap<String, Vec<Value>>,
    /// Every column except the geometry, the id and the parameter arrays.
    pub properties: IndexMap<String, Value>,
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn to_sequence(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(values) => values,
        scalar => vec![scalar],
    }
}

impl ResultRow {
    /// Lift a store row. `parameters` fixes the order of the parameter map.
    pub fn from_json(mut row: JsonRow, parameters: &[ParameterConfig]) -> Result<Self, EdrError> {
        let geometry = match row.shift_remove(GEOMETRY_COLUMN) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Geometry::from_value(value)?),
        };
        let id = row.shift_remove("id").filter(|v| !v.is_null());

        let mut values = IndexMap::with_capacity(parameters.len());
        for param in parameters {
            if let Some(value) = row.shift_remove(&param.id) {
                values.insert(param.id.clone(), to_sequence(value));
            }
        }

        let location = row.get("location").and_then(scalar_string);
        let label = match row.get("label") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(I18nString::english(s)),
            Some(other) => serde_json::from_value(other.clone()).ok(),
        };
        let datetime = row
            .get("datetime")
            .cloned()
            .map(to_sequence)
            .unwrap_or_default()
            .iter()
            .filter_map(scalar_string)
            .collect();
        let tmin = row.get("tmin").and_then(scalar_string);
        let tmax = row.get("tmax").and_then(scalar_string);

        Ok(Self {
            id,
            location,
            label,
            geometry,
            datetime,
            tmin,
            tmax,
            parameters: values,
            properties: row,
        })
    }

    /// Lift every row of a page.
    pub fn from_json_rows(
        rows: Vec<JsonRow>,
        parameters: &[ParameterConfig],
    ) -> Result<Vec<Self>, EdrError> {
        rows.into_iter()
            .map(|row| Self::from_json(row, parameters))
            .collect()
    }

    /// The id rendered as text, for link construction.
    pub fn id_text(&self) -> Option<String> {
        self.id.as_ref().and_then(scalar_string)
    }
}

/// Aggregate extent of a collection or instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtentRow {
    pub id: String,
    pub tmin: Option<DateTime<Utc>>,
    pub tmax: Option<DateTime<Utc>>,
    pub tvalues: Vec<DateTime<Utc>>,
    pub zmin: Option<f64>,
    pub zmax: Option<f64>,
    pub zvalues: Vec<f64>,
    pub xmin: Option<f64>,
    pub ymin: Option<f64>,
    pub xmax: Option<f64>,
    pub ymax: Option<f64>,
}

impl ExtentRow {
    /// The spatial extent, when every bound is known.
    pub fn bbox(&self) -> Option<[f64; 4]> {
        Some([self.xmin?, self.ymin?, self.xmax?, self.ymax?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{ObservedProperty, Unit};
    use crate::registry::DataType;
    use serde_json::json;

    fn param(id: &str) -> ParameterConfig {
        ParameterConfig {
            id: id.to_string(),
            label: None,
            description: None,
            unit: Unit::new(id, ""),
            observed_property: ObservedProperty::new("", id),
            source_column: id.to_string(),
            array_index: None,
            data_type: DataType::Float,
            target_axes: vec!["t".to_string()],
        }
    }

    fn row(value: Value) -> JsonRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_json_orders_parameters_by_declaration() {
        let r = row(json!({
            "id": "63740",
            "windSpeed": [3.1, 2.0],
            "geom": "{\"type\":\"Point\",\"coordinates\":[36.9,-1.3]}",
            "temperature": [21.5, 20.0],
            "datetime": ["2025-01-01T00:00:00", "2025-01-01T01:00:00"],
        }));
        let result = ResultRow::from_json(r, &[param("temperature"), param("windSpeed")]).unwrap();
        let keys: Vec<&String> = result.parameters.keys().collect();
        assert_eq!(keys, ["temperature", "windSpeed"]);
        assert_eq!(result.datetime.len(), 2);
        assert_eq!(result.id_text().as_deref(), Some("63740"));
        assert!(matches!(result.geometry, Some(Geometry::Point { .. })));
        assert!(!result.properties.contains_key("temperature"));
    }

    #[test]
    fn test_from_json_scalar_datetime_and_label() {
        let r = row(json!({
            "id": 7,
            "label": "NAIROBI",
            "datetime": "2025-01-01T00:00:00",
            "geom": null,
        }));
        let result = ResultRow::from_json(r, &[]).unwrap();
        assert_eq!(result.datetime, vec!["2025-01-01T00:00:00".to_string()]);
        assert_eq!(result.label.as_ref().unwrap().text(), "NAIROBI");
        assert_eq!(result.id_text().as_deref(), Some("7"));
        assert!(result.geometry.is_none());
    }

    #[test]
    fn test_from_json_bad_geometry() {
        let r = row(json!({ "geom": "not json" }));
        assert!(matches!(
            ResultRow::from_json(r, &[]),
            Err(EdrError::Internal(_))
        ));
    }

    #[test]
    fn test_extent_row_bbox() {
        let mut row = ExtentRow::default();
        assert!(row.bbox().is_none());
        row.xmin = Some(1.0);
        row.ymin = Some(2.0);
        row.xmax = Some(3.0);
        row.ymax = Some(4.0);
        assert_eq!(row.bbox(), Some([1.0, 2.0, 3.0, 4.0]));
    }
}
