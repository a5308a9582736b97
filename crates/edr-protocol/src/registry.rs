//! Collection registry.
//!
//! Collections are declared in YAML (see `config/collections/`), resolved
//! against the [`CrsRegistry`] once at startup and then shared immutably.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crs::{CrsConfig, CrsRegistry, CRS84};
use crate::errors::EdrError;
use crate::format::OutputFormat;
use crate::parameters::{I18nString, ObservedProperty, Unit};
use crate::wkt::GeometryType;

/// Spatial query archetypes (EDR `query_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Position,
    Radius,
    Area,
    Cube,
    Trajectory,
    Corridor,
    Items,
    Locations,
    Instances,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Position => "position",
            QueryType::Radius => "radius",
            QueryType::Area => "area",
            QueryType::Cube => "cube",
            QueryType::Trajectory => "trajectory",
            QueryType::Corridor => "corridor",
            QueryType::Items => "items",
            QueryType::Locations => "locations",
            QueryType::Instances => "instances",
        }
    }

    /// Geometry types accepted in `coords` for this archetype.
    pub fn allowed_geometry_types(&self) -> &'static [GeometryType] {
        match self {
            QueryType::Position | QueryType::Radius => {
                &[GeometryType::Point, GeometryType::MultiPoint]
            }
            QueryType::Area => &[GeometryType::Polygon],
            QueryType::Trajectory | QueryType::Corridor => &[GeometryType::LineString],
            _ => &[],
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Integer,
    String,
}

impl DataType {
    /// SQL type the extracted scalar is cast to.
    pub fn sql_type(&self) -> &'static str {
        match self {
            DataType::Float => "float4",
            DataType::Integer => "integer",
            DataType::String => "varchar",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Float => "float",
            DataType::Integer => "integer",
            DataType::String => "string",
        }
    }
}

/// A queryable parameter of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub id: String,

    /// Defaults to the observed property label.
    #[serde(default)]
    pub label: Option<I18nString>,

    /// Defaults to the observed property description.
    #[serde(default)]
    pub description: Option<I18nString>,

    pub unit: Unit,

    pub observed_property: ObservedProperty,

    /// Column holding the raw value.
    pub source_column: String,

    /// 1-based index into an array-valued source column.
    #[serde(default)]
    pub array_index: Option<u32>,

    pub data_type: DataType,

    #[serde(default = "default_target_axes")]
    pub target_axes: Vec<String>,
}

fn default_target_axes() -> Vec<String> {
    vec!["t".to_string()]
}

impl ParameterConfig {
    pub fn label(&self) -> &I18nString {
        self.label.as_ref().unwrap_or(&self.observed_property.label)
    }

    pub fn description(&self) -> Option<&I18nString> {
        self.description
            .as_ref()
            .or(self.observed_property.description.as_ref())
    }
}

/// Per-archetype declaration: formats, units and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeConfig {
    pub query_type: QueryType,

    pub output_formats: Vec<OutputFormat>,

    pub default_output_format: OutputFormat,

    #[serde(default)]
    pub within_units: Vec<String>,

    #[serde(default)]
    pub width_units: Vec<String>,

    #[serde(default)]
    pub height_units: Vec<String>,

    /// Instance served when the path names none.
    #[serde(default)]
    pub default_instance_id: Option<String>,
}

/// How result rows are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowShape {
    /// One row per station; parameter columns aggregated over time.
    Observations,
    /// One row per record with flat property columns.
    Features,
}

/// Backing table description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    pub table: String,

    pub geometry_column: String,

    #[serde(default)]
    pub datetime_column: Option<String>,

    pub id_column: String,

    #[serde(default)]
    pub location_column: Option<String>,

    #[serde(default)]
    pub label_column: Option<String>,

    #[serde(default)]
    pub group_by: Vec<String>,

    #[serde(default)]
    pub property_columns: Vec<String>,

    #[serde(default)]
    pub order_by: Option<String>,
}

impl SourceTable {
    fn identifiers(&self) -> impl Iterator<Item = &String> {
        [&self.table, &self.geometry_column, &self.id_column]
            .into_iter()
            .chain(self.datetime_column.iter())
            .chain(self.location_column.iter())
            .chain(self.label_column.iter())
            .chain(self.group_by.iter())
            .chain(self.property_columns.iter())
            .chain(self.order_by.iter())
    }
}

/// API tree a collection is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    Edr,
    Features,
}

fn default_apis() -> Vec<Api> {
    vec![Api::Edr]
}

/// YAML declaration of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    pub storage_crs: String,

    #[serde(default)]
    pub crs: Vec<String>,

    pub shape: RowShape,

    pub source: SourceTable,

    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,

    #[serde(default)]
    pub data_queries: Vec<ArchetypeConfig>,

    #[serde(default = "default_apis")]
    pub apis: Vec<Api>,
}

/// A resolved, immutable collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub storage_crs: CrsConfig,
    /// Always contains CRS84.
    pub supported_crs: Vec<CrsConfig>,
    pub parameters: Vec<ParameterConfig>,
    pub data_queries: Vec<ArchetypeConfig>,
    pub source: SourceTable,
    pub shape: RowShape,
    pub apis: Vec<Api>,
}

/// Accepts identifiers of the form `[A-Za-z0-9_.]+`.
pub fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl CollectionConfig {
    /// Validate the declaration and resolve its CRS URIs.
    pub fn resolve(self, crs_registry: &CrsRegistry) -> Result<Collection, EdrError> {
        let invalid = |detail: String| {
            EdrError::InvalidConfiguration(format!("collection {}: {}", self.id, detail))
        };

        let storage_crs = crs_registry
            .resolve(&self.storage_crs)
            .cloned()
            .ok_or_else(|| invalid(format!("unknown storage CRS {}", self.storage_crs)))?;

        let mut supported_crs = Vec::with_capacity(self.crs.len() + 1);
        if !self.crs.iter().any(|uri| uri == CRS84) {
            supported_crs.push(crs_registry.default_crs().clone());
        }
        for uri in &self.crs {
            let crs = crs_registry
                .resolve(uri)
                .ok_or_else(|| invalid(format!("unknown CRS {}", uri)))?;
            supported_crs.push(crs.clone());
        }

        if let Some(bad) = self
            .source
            .identifiers()
            .chain(self.parameters.iter().map(|p| &p.source_column))
            .chain(self.parameters.iter().map(|p| &p.id))
            .find(|ident| !is_valid_identifier(ident))
        {
            return Err(invalid(format!("invalid SQL identifier '{}'", bad)));
        }

        for (i, param) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|p| p.id == param.id) {
                return Err(invalid(format!("parameter {} declared more than once", param.id)));
            }
        }

        for (i, query) in self.data_queries.iter().enumerate() {
            if self.data_queries[..i]
                .iter()
                .any(|q| q.query_type == query.query_type)
            {
                return Err(invalid(format!("data query {} declared more than once", query.query_type)));
            }
            if !query.output_formats.contains(&query.default_output_format) {
                return Err(invalid(format!(
                    "default output format of {} is not among its output formats",
                    query.query_type
                )));
            }
        }

        Ok(Collection {
            id: self.id,
            title: self.title,
            description: self.description,
            keywords: self.keywords,
            storage_crs,
            supported_crs,
            parameters: self.parameters,
            data_queries: self.data_queries,
            source: self.source,
            shape: self.shape,
            apis: self.apis,
        })
    }
}

impl Collection {
    /// The declaration of a query archetype, or `UnsupportedArchetype`.
    pub fn archetype(&self, query_type: QueryType) -> Result<&ArchetypeConfig, EdrError> {
        self.data_queries
            .iter()
            .find(|q| q.query_type == query_type)
            .ok_or_else(|| EdrError::UnsupportedArchetype {
                collection: self.id.clone(),
                query_type: query_type.to_string(),
            })
    }

    pub fn supports(&self, query_type: QueryType) -> bool {
        self.data_queries.iter().any(|q| q.query_type == query_type)
    }

    pub fn parameter(&self, id: &str) -> Option<&ParameterConfig> {
        self.parameters.iter().find(|p| p.id == id)
    }

    pub fn resolve_crs(&self, uri: &str) -> Option<&CrsConfig> {
        self.supported_crs.iter().find(|c| c.uri == uri)
    }

    pub fn crs_uris(&self) -> Vec<String> {
        self.supported_crs.iter().map(|c| c.uri.clone()).collect()
    }

    /// Union of the output formats of every data query, in declaration order.
    pub fn output_formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::new();
        for format in self.data_queries.iter().flat_map(|q| q.output_formats.iter()) {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        formats
    }

    pub fn default_instance_id(&self) -> Option<&str> {
        self.data_queries
            .iter()
            .find(|q| q.query_type == QueryType::Instances)
            .and_then(|q| q.default_instance_id.as_deref())
    }

    pub fn storage_srid(&self) -> i32 {
        self.storage_crs.srid
    }

    pub fn published_in(&self, api: Api) -> bool {
        self.apis.contains(&api)
    }
}

/// Immutable set of collections, looked up by id.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    collections: Vec<Arc<Collection>>,
}

impl CollectionRegistry {
    pub fn from_configs(
        configs: Vec<CollectionConfig>,
        crs_registry: &CrsRegistry,
    ) -> Result<Self, EdrError> {
        let mut collections: Vec<Arc<Collection>> = Vec::with_capacity(configs.len());
        for config in configs {
            if collections.iter().any(|c| c.id == config.id) {
                return Err(EdrError::InvalidConfiguration(format!(
                    "collection {} declared more than once",
                    config.id
                )));
            }
            collections.push(Arc::new(config.resolve(crs_registry)?));
        }
        Ok(Self { collections })
    }

    /// Look up a collection, or `CollectionNotFound`.
    pub fn get(&self, id: &str) -> Result<Arc<Collection>, EdrError> {
        self.collections
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| EdrError::CollectionNotFound(id.to_string()))
    }

    /// Look up a collection published under `api`.
    pub fn get_in(&self, api: Api, id: &str) -> Result<Arc<Collection>, EdrError> {
        self.get(id)
            .ok()
            .filter(|c| c.published_in(api))
            .ok_or_else(|| EdrError::CollectionNotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Collection>> {
        self.collections.iter()
    }

    /// Collections published under `api`, in declaration order.
    pub fn published(&self, api: Api) -> impl Iterator<Item = &Arc<Collection>> {
        self.collections.iter().filter(move |c| c.published_in(api))
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
