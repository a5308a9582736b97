//! GeoJSON documents and the two feature parsers.
//!
//! [`FeaturesGeoJsonParser`] produces plain OGC API Features documents.
//! [`EdrGeoJsonParser`] extends each feature with the EDR members
//! (`datetime`, `parameter-name`, `label`, `edrqueryendpoint`) and the
//! first recorded value of every requested parameter.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EdrError;
use crate::parameters::{I18nString, ParameterDocument};
use crate::registry::ParameterConfig;
use crate::rows::ResultRow;
use crate::types::Link;

/// A GeoJSON position: `[x, y]` or `[x, y, z]`.
pub type Coordinate = Vec<f64>;

/// GeoJSON geometry. Foreign members such as `crs` are dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Coordinate },
    MultiPoint { coordinates: Vec<Coordinate> },
    LineString { coordinates: Vec<Coordinate> },
    MultiLineString { coordinates: Vec<Vec<Coordinate>> },
    Polygon { coordinates: Vec<Vec<Coordinate>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Coordinate>>> },
}

impl Geometry {
    /// Decode a geometry that arrives either as GeoJSON text or as an object.
    pub fn from_value(value: Value) -> Result<Self, EdrError> {
        let parsed = match value {
            Value::String(text) => serde_json::from_str(&text),
            other => serde_json::from_value(other),
        };
        parsed.map_err(|e| EdrError::Internal(format!("invalid geometry in result row: {}", e)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
        }
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub geometry: Option<Geometry>,

    pub properties: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Feature {
    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }
}

/// A GeoJSON FeatureCollection with the OGC API paging members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "timeStamp")]
    pub time_stamp: String,

    #[serde(rename = "numberMatched")]
    pub number_matched: i64,

    #[serde(rename = "numberReturned")]
    pub number_returned: i64,

    pub features: Vec<Feature>,

    /// Requested parameters (EDR only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterDocument>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl FeatureCollection {
    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }
}

/// Builds plain Features documents from result rows.
#[derive(Debug, Clone)]
pub struct FeaturesGeoJsonParser<'a> {
    rows: &'a [ResultRow],
    number_matched: i64,
    time_stamp: DateTime<Utc>,
}

impl<'a> FeaturesGeoJsonParser<'a> {
    /// `number_matched` is the pre-pagination count reported by the store.
    pub fn new(rows: &'a [ResultRow], number_matched: i64) -> Self {
        Self {
            rows,
            number_matched,
            time_stamp: Utc::now(),
        }
    }

    pub fn with_time_stamp(mut self, time_stamp: DateTime<Utc>) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    pub fn number_returned(&self) -> i64 {
        self.rows.len() as i64
    }

    /// A feature: every column except the geometry becomes a property, the id last.
    pub fn feature(&self, row: &ResultRow) -> Feature {
        let mut properties = row.properties.clone();
        for (id, values) in &row.parameters {
            properties.insert(id.clone(), Value::Array(values.clone()));
        }
        if let Some(id) = &row.id {
            properties.insert("id".to_string(), id.clone());
        }
        Feature {
            type_: "Feature".to_string(),
            id: row.id.clone(),
            geometry: row.geometry.clone(),
            properties,
            links: Vec::new(),
        }
    }

    /// The first row as a single feature.
    pub fn first_feature(&self) -> Option<Feature> {
        self.rows.first().map(|row| self.feature(row))
    }

    pub fn feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            type_: "FeatureCollection".to_string(),
            time_stamp: self.time_stamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            number_matched: self.number_matched,
            number_returned: self.number_returned(),
            features: self.rows.iter().map(|row| self.feature(row)).collect(),
            parameters: None,
            links: Vec::new(),
        }
    }
}

/// Builds EDR-flavoured GeoJSON documents.
#[derive(Debug, Clone)]
pub struct EdrGeoJsonParser<'a> {
    inner: FeaturesGeoJsonParser<'a>,
    parameters: &'a [ParameterConfig],
    base_url: &'a str,
    collection_id: &'a str,
    instance_id: Option<&'a str>,
    supports_locations: bool,
}

impl<'a> EdrGeoJsonParser<'a> {
    pub fn new(
        rows: &'a [ResultRow],
        number_matched: i64,
        parameters: &'a [ParameterConfig],
        base_url: &'a str,
        collection_id: &'a str,
    ) -> Self {
        Self {
            inner: FeaturesGeoJsonParser::new(rows, number_matched),
            parameters,
            base_url,
            collection_id,
            instance_id: None,
            supports_locations: false,
        }
    }

    pub fn with_instance(mut self, instance_id: Option<&'a str>) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn with_locations(mut self, supports_locations: bool) -> Self {
        self.supports_locations = supports_locations;
        self
    }

    pub fn with_time_stamp(mut self, time_stamp: DateTime<Utc>) -> Self {
        self.inner = self.inner.with_time_stamp(time_stamp);
        self
    }

    /// Location sub-resource of the row, or empty when there is none.
    pub fn edr_query_endpoint(&self, row: &ResultRow) -> String {
        let location = match (&row.location, self.supports_locations) {
            (Some(location), true) if !location.is_empty() => location,
            _ => return String::new(),
        };
        let base = format!("{}/collections/{}", self.base_url, self.collection_id);
        match self.instance_id {
            Some(instance) => format!("{}/instances/{}/locations/{}", base, instance, location),
            None => format!("{}/locations/{}", base, location),
        }
    }

    pub fn feature(&self, row: &ResultRow) -> Feature {
        let mut properties = row.properties.clone();
        if let Some(id) = &row.id {
            properties.insert("id".to_string(), id.clone());
        }

        let datetime = match (&row.tmin, &row.tmax) {
            (Some(tmin), Some(tmax)) => format!("{}/{}", tmin, tmax),
            _ => String::new(),
        };
        properties.insert("datetime".to_string(), Value::String(datetime));
        properties.insert(
            "parameter-name".to_string(),
            Value::Array(
                self.parameters
                    .iter()
                    .map(|p| Value::String(p.id.clone()))
                    .collect(),
            ),
        );
        properties.insert(
            "edrqueryendpoint".to_string(),
            Value::String(self.edr_query_endpoint(row)),
        );

        let label = row.label.clone().unwrap_or_else(|| {
            I18nString::english(&row.id_text().unwrap_or_default())
        });
        properties.insert(
            "label".to_string(),
            serde_json::to_value(label).unwrap_or(Value::Null),
        );

        // Only the first value per parameter is exposed in the flat view.
        for param in self.parameters {
            let first = row
                .parameters
                .get(&param.id)
                .and_then(|values| values.first().cloned())
                .unwrap_or(Value::Null);
            properties.insert(param.id.clone(), first);
        }

        Feature {
            type_: "Feature".to_string(),
            id: row.id.clone(),
            geometry: row.geometry.clone(),
            properties,
            links: Vec::new(),
        }
    }

    pub fn first_feature(&self) -> Option<Feature> {
        self.inner.rows.first().map(|row| self.feature(row))
    }

    pub fn feature_collection(&self) -> FeatureCollection {
        let mut collection = self.inner.feature_collection();
        collection.features = self.inner.rows.iter().map(|row| self.feature(row)).collect();
        collection.parameters = Some(
            self.parameters
                .iter()
                .map(ParameterDocument::from_config)
                .collect(),
        );
        collection
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
            unit: Unit::new("Kelvin", "°C"),
            observed_property: ObservedProperty::new("", id),
            source_column: "tmp".to_string(),
            array_index: Some(1),
            data_type: DataType::Float,
            target_axes: vec!["t".to_string()],
        }
    }

    fn station_row() -> ResultRow {
        let row = serde_json::from_value(json!({
            "id": "63740",
            "location": "KE",
            "label": "NAIROBI",
            "geom": {"type": "Point", "coordinates": [36.9, -1.3], "crs": {"type": "name"}},
            "windSpeed": [3.0, 4.0],
            "temperature": [21.5, 20.0],
            "datetime": ["2025-01-01T00:00:00", "2025-01-01T01:00:00"],
            "tmin": "2025-01-01T00:00:00",
            "tmax": "2025-01-01T01:00:00",
        }))
        .unwrap();
        ResultRow::from_json(row, &[param("temperature"), param("windSpeed")]).unwrap()
    }

    #[test]
    fn test_geometry_drops_crs_member() {
        let geom = Geometry::from_value(json!({
            "type": "Point",
            "coordinates": [1.0, 2.0],
            "crs": {"type": "name", "properties": {"name": "EPSG:4326"}}
        }))
        .unwrap();
        assert_eq!(geom.type_name(), "Point");
        let value = serde_json::to_value(&geom).unwrap();
        assert!(value.get("crs").is_none());
    }

    #[test]
    fn test_feature_collection_counts() {
        let rows = vec![station_row(), station_row()];
        let fc = FeaturesGeoJsonParser::new(&rows, 57).feature_collection();
        assert_eq!(fc.number_matched, 57);
        assert_eq!(fc.number_returned, 2);
        assert_eq!(fc.features.len(), 2);
        assert!(fc.parameters.is_none());
    }

    #[test]
    fn test_plain_feature_properties_end_with_id() {
        let rows = vec![station_row()];
        let feature = FeaturesGeoJsonParser::new(&rows, 1).first_feature().unwrap();
        assert_eq!(feature.id, Some(json!("63740")));
        assert_eq!(feature.properties.keys().last().map(String::as_str), Some("id"));
        assert!(!feature.properties.contains_key("geom"));
    }

    #[test]
    fn test_edr_feature_members() {
        let rows = vec![station_row()];
        let params = [param("temperature"), param("windSpeed")];
        let parser = EdrGeoJsonParser::new(&rows, 1, &params, "http://localhost/edr", "isd-2025")
            .with_locations(true);
        let feature = parser.first_feature().unwrap();

        assert_eq!(
            feature.properties["datetime"],
            json!("2025-01-01T00:00:00/2025-01-01T01:00:00")
        );
        assert_eq!(feature.properties["parameter-name"], json!(["temperature", "windSpeed"]));
        assert_eq!(feature.properties["label"], json!({"en": "NAIROBI"}));
        assert_eq!(
            feature.properties["edrqueryendpoint"],
            json!("http://localhost/edr/collections/isd-2025/locations/KE")
        );
        assert_eq!(feature.properties["temperature"], json!(21.5));

        // Parameters follow declaration order, after the EDR members.
        let keys: Vec<&str> = feature.properties.keys().map(String::as_str).collect();
        let ws = keys.iter().position(|k| *k == "windSpeed").unwrap();
        let t = keys.iter().position(|k| *k == "temperature").unwrap();
        assert!(t < ws);
        assert!(keys.iter().position(|k| *k == "edrqueryendpoint").unwrap() < t);
    }

    #[test]
    fn test_edr_query_endpoint_instance_and_unsupported() {
        let rows = vec![station_row()];
        let params = [param("temperature")];
        let parser = EdrGeoJsonParser::new(&rows, 1, &params, "http://h/edr", "isd-2025")
            .with_locations(true)
            .with_instance(Some("2025-01-01"));
        assert_eq!(
            parser.edr_query_endpoint(&rows[0]),
            "http://h/edr/collections/isd-2025/instances/2025-01-01/locations/KE"
        );

        let parser = EdrGeoJsonParser::new(&rows, 1, &params, "http://h/edr", "isd-2025");
        assert_eq!(parser.edr_query_endpoint(&rows[0]), "");
    }

    #[test]
    fn test_edr_collection_lists_parameters() {
        let rows = vec![station_row()];
        let params = [param("temperature")];
        let fc = EdrGeoJsonParser::new(&rows, 10, &params, "http://h", "c").feature_collection();
        let docs = fc.parameters.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "temperature");
        assert_eq!(fc.number_matched, 10);
        assert_eq!(fc.number_returned, 1);
    }
}
