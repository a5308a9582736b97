//! CoverageJSON documents for EDR data queries.
//!
//! Each result row becomes one coverage: its geometry decides the domain
//! type, its `datetime` array the time axis, and every requested parameter
//! contributes a one-dimensional `NdArray` range.
//!
//! See: <https://covjson.org/>

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crs::CrsConfig;
use crate::errors::EdrError;
use crate::geojson::{Coordinate, Geometry};
use crate::parameters::{ObservedProperty, Unit};
use crate::registry::ParameterConfig;
use crate::rows::ResultRow;

/// A single coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coverage {
    #[serde(rename = "type")]
    pub type_: String,

    pub domain: Domain,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<IndexMap<String, CovJsonParameter>>,

    pub ranges: IndexMap<String, NdArray>,
}

/// A collection of coverages sharing parameters and referencing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub coverages: Vec<Coverage>,

    pub parameters: IndexMap<String, CovJsonParameter>,

    pub referencing: Vec<ReferenceSystemConnection>,
}

/// Either CoverageJSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CoverageDocument {
    Collection(CoverageCollection),
    Coverage(Coverage),
}

/// The domain of a coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "domainType")]
    pub domain_type: DomainType,

    pub axes: IndexMap<String, Axis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencing: Option<Vec<ReferenceSystemConnection>>,
}

/// CoverageJSON domain types produced from GeoJSON geometries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DomainType {
    Point,
    PointSeries,
    MultiPoint,
    MultiPointSeries,
    Polygon,
    PolygonSeries,
    MultiPolygon,
    MultiPolygonSeries,
    Trajectory,
}

impl DomainType {
    /// Classify a geometry; more than one time step makes it a series.
    pub fn classify(geometry: &Geometry, time_steps: usize) -> Result<Self, EdrError> {
        let series = time_steps > 1;
        let domain_type = match (geometry, series) {
            (Geometry::Point { .. }, false) => DomainType::Point,
            (Geometry::Point { .. }, true) => DomainType::PointSeries,
            (Geometry::MultiPoint { .. }, false) => DomainType::MultiPoint,
            (Geometry::MultiPoint { .. }, true) => DomainType::MultiPointSeries,
            (Geometry::Polygon { .. }, false) => DomainType::Polygon,
            (Geometry::Polygon { .. }, true) => DomainType::PolygonSeries,
            (Geometry::MultiPolygon { .. }, false) => DomainType::MultiPolygon,
            (Geometry::MultiPolygon { .. }, true) => DomainType::MultiPolygonSeries,
            (Geometry::LineString { .. }, _) => DomainType::Trajectory,
            (other, _) => {
                return Err(EdrError::Internal(format!(
                    "unable to parse {} to a CoverageJSON domain",
                    other.type_name()
                )))
            }
        };
        Ok(domain_type)
    }
}

/// Axis definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Axis {
    /// Composite axis of tuples, polygons or points.
    Composite {
        #[serde(rename = "dataType", skip_serializing_if = "Option::is_none")]
        data_type: Option<String>,
        coordinates: Vec<String>,
        values: Vec<Value>,
    },
    /// Plain list of values.
    Values { values: Vec<Value> },
}

impl Axis {
    fn numbers(values: &[f64]) -> Self {
        Axis::Values {
            values: values.iter().map(|v| Value::from(*v)).collect(),
        }
    }

    fn strings(values: &[String]) -> Self {
        Axis::Values {
            values: values.iter().map(|v| Value::String(v.clone())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Axis::Composite { values, .. } | Axis::Values { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Links axes to a reference system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystemConnection {
    pub coordinates: Vec<String>,
    pub system: ReferenceSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ReferenceSystem {
    #[serde(rename = "GeographicCRS")]
    Geographic { id: String },

    #[serde(rename = "ProjectedCRS")]
    Projected { id: String },

    #[serde(rename = "TemporalRS")]
    Temporal { calendar: String },
}

/// Parameter entry of a CoverageJSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovJsonParameter {
    #[serde(rename = "type")]
    pub type_: String,

    pub unit: Unit,

    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,
}

impl CovJsonParameter {
    pub fn from_config(param: &ParameterConfig) -> Self {
        Self {
            type_: "Parameter".to_string(),
            unit: param.unit.clone(),
            observed_property: param.observed_property.clone(),
        }
    }
}

/// One-dimensional range values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdArray {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "dataType")]
    pub data_type: String,

    #[serde(rename = "axisNames")]
    pub axis_names: Vec<String>,

    /// Always `[values.len()]`; grids are not modelled.
    pub shape: Vec<usize>,

    pub values: Vec<Value>,
}

impl NdArray {
    pub fn new(values: Vec<Value>, axis_names: Vec<String>, data_type: &str) -> Self {
        Self {
            type_: "NdArray".to_string(),
            data_type: data_type.to_string(),
            axis_names,
            shape: vec![values.len()],
            values,
        }
    }
}

fn coordinate_value(c: &Coordinate) -> Value {
    Value::Array(c.iter().map(|v| Value::from(*v)).collect())
}

fn ring_value(ring: &[Coordinate]) -> Value {
    Value::Array(ring.iter().map(coordinate_value).collect())
}

fn polygon_value(rings: &[Vec<Coordinate>]) -> Value {
    Value::Array(rings.iter().map(|r| ring_value(r)).collect())
}

/// Builds CoverageJSON documents from result rows.
#[derive(Debug, Clone)]
pub struct CoverageJsonParser<'a> {
    crs: &'a CrsConfig,
    parameters: &'a [ParameterConfig],
    rows: &'a [ResultRow],
}

impl<'a> CoverageJsonParser<'a> {
    pub fn new(crs: &'a CrsConfig, parameters: &'a [ParameterConfig], rows: &'a [ResultRow]) -> Self {
        Self {
            crs,
            parameters,
            rows,
        }
    }

    /// Spatial and temporal reference systems of the response CRS.
    pub fn referencing(&self) -> Vec<ReferenceSystemConnection> {
        let mut spatial = vec!["x".to_string(), "y".to_string()];
        if self.crs.has_vertical {
            spatial.push("z".to_string());
        }
        let system = match self.crs.kind {
            crate::crs::CrsKind::Geographic => ReferenceSystem::Geographic {
                id: self.crs.uri.clone(),
            },
            crate::crs::CrsKind::Projected => ReferenceSystem::Projected {
                id: self.crs.uri.clone(),
            },
        };
        vec![
            ReferenceSystemConnection {
                coordinates: spatial,
                system,
            },
            ReferenceSystemConnection {
                coordinates: vec!["t".to_string()],
                system: ReferenceSystem::Temporal {
                    calendar: "Gregorian".to_string(),
                },
            },
        ]
    }

    /// Parameter entries in declaration order.
    pub fn parameter_entries(&self) -> IndexMap<String, CovJsonParameter> {
        self.parameters
            .iter()
            .map(|p| (p.id.clone(), CovJsonParameter::from_config(p)))
            .collect()
    }

    fn spatial_axes(&self) -> Vec<String> {
        let mut axes = vec!["x".to_string(), "y".to_string()];
        if self.crs.has_vertical {
            axes.push("z".to_string());
        }
        axes
    }

    /// Build the domain of one row.
    pub fn domain(&self, row: &ResultRow, include_referencing: bool) -> Result<Domain, EdrError> {
        let geometry = row
            .geometry
            .as_ref()
            .ok_or_else(|| EdrError::Internal("result row has no geometry".to_string()))?;
        let datetime = &row.datetime;
        let domain_type = DomainType::classify(geometry, datetime.len())?;

        let mut axes = IndexMap::new();
        match geometry {
            Geometry::Point { coordinates } => {
                let x = coordinates.first().copied().unwrap_or_default();
                let y = coordinates.get(1).copied().unwrap_or_default();
                axes.insert("x".to_string(), Axis::numbers(&[x]));
                axes.insert("y".to_string(), Axis::numbers(&[y]));
                if let Some(z) = coordinates.get(2) {
                    axes.insert("z".to_string(), Axis::numbers(&[*z]));
                }
            }
            Geometry::MultiPoint { coordinates } => {
                axes.insert(
                    "composite".to_string(),
                    Axis::Composite {
                        data_type: None,
                        coordinates: self.spatial_axes(),
                        values: coordinates.iter().map(coordinate_value).collect(),
                    },
                );
            }
            Geometry::Polygon { coordinates } => {
                axes.insert(
                    "composite".to_string(),
                    Axis::Composite {
                        data_type: Some("polygon".to_string()),
                        coordinates: vec!["x".to_string(), "y".to_string()],
                        values: vec![polygon_value(coordinates)],
                    },
                );
            }
            Geometry::MultiPolygon { coordinates } => {
                axes.insert(
                    "composite".to_string(),
                    Axis::Composite {
                        data_type: Some("polygon".to_string()),
                        coordinates: vec!["x".to_string(), "y".to_string()],
                        values: coordinates.iter().map(|p| polygon_value(p)).collect(),
                    },
                );
            }
            Geometry::LineString { coordinates } => {
                let mut names = vec!["t".to_string()];
                names.extend(self.spatial_axes());
                let values = coordinates
                    .iter()
                    .enumerate()
                    .map(|(i, position)| {
                        let mut tuple = vec![datetime
                            .get(i)
                            .map(|t| Value::String(t.clone()))
                            .unwrap_or(Value::Null)];
                        tuple.extend(position.iter().map(|v| Value::from(*v)));
                        Value::Array(tuple)
                    })
                    .collect();
                axes.insert(
                    "composite".to_string(),
                    Axis::Composite {
                        data_type: Some("tuple".to_string()),
                        coordinates: names,
                        values,
                    },
                );
            }
            Geometry::MultiLineString { .. } => {
                // classify() has already rejected this type.
            }
        }

        if domain_type != DomainType::Trajectory && !datetime.is_empty() {
            axes.insert("t".to_string(), Axis::strings(datetime));
        }

        Ok(Domain {
            type_: "Domain".to_string(),
            domain_type,
            axes,
            referencing: include_referencing.then(|| self.referencing()),
        })
    }

    /// Ranges of one row, keyed by parameter id in declaration order.
    pub fn ranges(&self, row: &ResultRow) -> IndexMap<String, NdArray> {
        self.parameters
            .iter()
            .map(|param| {
                let values = row.parameters.get(&param.id).cloned().unwrap_or_default();
                let range = NdArray::new(values, param.target_axes.clone(), param.data_type.as_str());
                (param.id.clone(), range)
            })
            .collect()
    }

    fn coverage_of(&self, row: &ResultRow, standalone: bool) -> Result<Coverage, EdrError> {
        Ok(Coverage {
            type_: "Coverage".to_string(),
            domain: self.domain(row, standalone)?,
            parameters: standalone.then(|| self.parameter_entries()),
            ranges: self.ranges(row),
        })
    }

    /// A standalone coverage of the first row, carrying its own referencing.
    pub fn coverage(&self) -> Result<Coverage, EdrError> {
        let row = self
            .rows
            .first()
            .ok_or_else(|| EdrError::Internal("no rows to build a coverage from".to_string()))?;
        self.coverage_of(row, true)
    }

    /// Every row as a coverage; parameters and referencing are collection level.
    pub fn coverage_collection(&self) -> Result<CoverageCollection, EdrError> {
        let coverages = self
            .rows
            .iter()
            .map(|row| self.coverage_of(row, false))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CoverageCollection {
            type_: "CoverageCollection".to_string(),
            coverages,
            parameters: self.parameter_entries(),
            referencing: self.referencing(),
        })
    }
}
