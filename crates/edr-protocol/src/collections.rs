//! Collection and instance metadata documents.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::crs::CrsConfig;
use crate::extent::to_extent;
use crate::links::data_query_link;
use crate::parameters::ParameterDocument;
use crate::registry::{ArchetypeConfig, Collection, QueryType};
use crate::rows::ExtentRow;
use crate::types::{Extent, Link, SpatialExtent, TemporalExtent};

/// Language tag advertised on data query links.
pub const DATA_QUERY_HREFLANG: &str = "en-KE";

/// Describes how to invoke a data query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryVariables {
    pub title: String,

    pub query_type: QueryType,

    pub default_output_format: String,

    pub output_formats: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub within_units: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub width_units: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub height_units: Vec<String>,
}

impl QueryVariables {
    pub fn from_archetype(archetype: &ArchetypeConfig) -> Self {
        Self {
            title: format!("{} queries", archetype.query_type.as_str().to_uppercase()),
            query_type: archetype.query_type,
            default_output_format: archetype.default_output_format.name().to_string(),
            output_formats: archetype
                .output_formats
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            within_units: archetype.within_units.clone(),
            width_units: archetype.width_units.clone(),
            height_units: archetype.height_units.clone(),
        }
    }
}

/// A data query link with its invocation variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataQueryLink {
    #[serde(flatten)]
    pub link: Link,

    pub variables: QueryVariables,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataQuery {
    pub link: DataQueryLink,
}

/// EDR collection (or instance) metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdrCollectionDocument {
    pub id: String,

    pub title: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    pub crs: Vec<String>,

    #[serde(rename = "storageCrs")]
    pub storage_crs: String,

    pub extent: Extent,

    pub output_formats: Vec<String>,

    pub parameter_names: IndexMap<String, ParameterDocument>,

    pub data_queries: IndexMap<String, DataQuery>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl EdrCollectionDocument {
    /// Build the document from an aggregate extent row.
    ///
    /// A row whose id differs from the collection id describes an instance:
    /// its data query links point below `/instances/{id}` and the
    /// `instances` query itself is omitted.
    pub fn generate(collection: &Collection, extent: &ExtentRow, crs: &CrsConfig, base_url: &str) -> Self {
        let instance_id = (extent.id != collection.id).then_some(extent.id.as_str());

        let data_queries = collection
            .data_queries
            .iter()
            .filter(|q| instance_id.is_none() || q.query_type != QueryType::Instances)
            .map(|archetype| {
                let link = data_query_link(
                    base_url,
                    &collection.id,
                    instance_id,
                    archetype.query_type,
                    archetype.default_output_format,
                )
                .with_templated(false)
                .with_hreflang(DATA_QUERY_HREFLANG);
                let query = DataQuery {
                    link: DataQueryLink {
                        link,
                        variables: QueryVariables::from_archetype(archetype),
                    },
                };
                (archetype.query_type.as_str().to_string(), query)
            })
            .collect();

        let parameter_names = collection
            .parameters
            .iter()
            .map(|p| (p.id.clone(), ParameterDocument::from_config(p).with_data_type(p)))
            .collect();

        Self {
            id: extent.id.clone(),
            title: collection.title.clone(),
            description: collection.description.clone(),
            keywords: collection.keywords.clone(),
            crs: collection.crs_uris(),
            storage_crs: collection.storage_crs.uri.clone(),
            extent: to_extent(extent, crs),
            output_formats: collection
                .output_formats()
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            parameter_names,
            data_queries,
            links: Vec::new(),
        }
    }

    /// The data query links without their variables.
    pub fn data_query_links(&self) -> Vec<Link> {
        self.data_queries
            .values()
            .map(|q| q.link.link.clone())
            .collect()
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }
}

/// OGC API Features collection metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeaturesCollectionDocument {
    pub id: String,

    pub title: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub extent: Extent,

    pub crs: Vec<String>,

    #[serde(rename = "storageCrs")]
    pub storage_crs: String,

    #[serde(rename = "itemType")]
    pub item_type: String,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl FeaturesCollectionDocument {
    /// Vertical CRSs get a 6-value bbox with missing heights as 0.
    pub fn generate(collection: &Collection, extent: &ExtentRow, crs: &CrsConfig) -> Self {
        let spatial = extent.bbox().map(|[xmin, ymin, xmax, ymax]| {
            let bbox = if crs.has_vertical {
                vec![
                    xmin,
                    ymin,
                    extent.zmin.unwrap_or(0.0),
                    xmax,
                    ymax,
                    extent.zmax.unwrap_or(0.0),
                ]
            } else {
                vec![xmin, ymin, xmax, ymax]
            };
            SpatialExtent {
                bbox: vec![bbox],
                crs: crs.uri.clone(),
            }
        });
        let temporal = TemporalExtent::new(
            extent.tmin.as_ref().map(crate::filters::to_iso),
            extent.tmax.as_ref().map(crate::filters::to_iso),
        );

        Self {
            id: collection.id.clone(),
            title: collection.title.clone(),
            description: collection.description.clone(),
            extent: Extent {
                spatial,
                temporal: Some(temporal),
                vertical: None,
            },
            crs: collection.crs_uris(),
            storage_crs: collection.storage_crs.uri.clone(),
            item_type: "feature".to_string(),
            links: Vec::new(),
        }
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }
}

/// The `/collections` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionList<T> {
    pub collections: Vec<T>,
    pub links: Vec<Link>,
}

/// The `/collections/{id}/instances` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceList {
    pub instances: Vec<EdrCollectionDocument>,
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{CrsRegistry, CRS84, CRS84H};
    use crate::registry::CollectionConfig;

    fn collection() -> Collection {
        let config: CollectionConfig = serde_yaml::from_str(
            r#"
id: isd-2025
title: ISD
storage_crs: http://www.opengis.net/def/crs/EPSG/0/4327
crs: [http://www.opengis.net/def/crs/OGC/0/CRS84h]
shape: observations
source:
  table: isd
  geometry_column: geom
  datetime_column: datetime
  id_column: station
parameters:
  - id: temperature
    unit: {label: {en: Kelvin}, symbol: "°C"}
    observed_property: {id: "https://codes.wmo.int/grib2/codeflag/4.2/_0-0-0", label: {en: Air Temperature}}
    source_column: temperature
    array_index: 1
    data_type: float
data_queries:
  - query_type: instances
    output_formats: [JSON, YAML]
    default_output_format: JSON
    default_instance_id: "2025-01-01"
  - query_type: radius
    output_formats: [JSON, YAML]
    default_output_format: JSON
    within_units: [m, km]
  - query_type: items
    output_formats: [GeoJSON, CoverageJSON]
    default_output_format: GeoJSON
"#,
        )
        .unwrap();
        config.resolve(&CrsRegistry::builtin()).unwrap()
    }

    fn extent(id: &str) -> ExtentRow {
        ExtentRow {
            id: id.to_string(),
            xmin: Some(33.9),
            ymin: Some(-4.7),
            xmax: Some(41.9),
            ymax: Some(5.0),
            zmin: Some(10.0),
            zmax: Some(1800.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_collection_document() {
        let c = collection();
        let registry = CrsRegistry::builtin();
        let doc = EdrCollectionDocument::generate(&c, &extent("isd-2025"), registry.resolve(CRS84).unwrap(), "http://h/edr");

        assert_eq!(doc.id, "isd-2025");
        assert_eq!(doc.crs[0], CRS84);
        assert_eq!(doc.output_formats, ["JSON", "YAML", "GeoJSON", "CoverageJSON"]);
        let keys: Vec<&String> = doc.data_queries.keys().collect();
        assert_eq!(keys, ["instances", "radius", "items"]);

        let radius = &doc.data_queries["radius"].link;
        assert_eq!(radius.link.href, "http://h/edr/collections/isd-2025/radius");
        assert_eq!(radius.link.hreflang.as_deref(), Some("en-KE"));
        assert_eq!(radius.variables.within_units, ["m", "km"]);
        assert_eq!(radius.variables.title, "RADIUS queries");

        let param = &doc.parameter_names["temperature"];
        assert_eq!(param.data_type.as_deref(), Some("float"));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["data_queries"]["radius"]["link"]["variables"]["query_type"], "radius");
        assert!(json["data_queries"]["items"]["link"]["variables"].get("within_units").is_none());
    }

    #[test]
    fn test_instance_document_drops_instances_query() {
        let c = collection();
        let registry = CrsRegistry::builtin();
        let doc = EdrCollectionDocument::generate(&c, &extent("2025-01-01"), registry.resolve(CRS84).unwrap(), "http://h/edr");
        assert!(!doc.data_queries.contains_key("instances"));
        assert_eq!(
            doc.data_query_links()[0].href,
            "http://h/edr/collections/isd-2025/instances/2025-01-01/radius"
        );
    }

    #[test]
    fn test_features_document_vertical_bbox() {
        let c = collection();
        let registry = CrsRegistry::builtin();
        let doc = FeaturesCollectionDocument::generate(&c, &extent("isd-2025"), registry.resolve(CRS84H).unwrap());
        assert_eq!(
            doc.extent.spatial.unwrap().bbox,
            vec![vec![33.9, -4.7, 10.0, 41.9, 5.0, 1800.0]]
        );
        assert_eq!(doc.item_type, "feature");

        let flat = FeaturesCollectionDocument::generate(&c, &extent("isd-2025"), registry.resolve(CRS84).unwrap());
        assert_eq!(flat.extent.spatial.unwrap().bbox[0].len(), 4);
    }
}
