//! Common test fixtures.
//!
//! The collection and CRS fixtures are the shipped YAML files under
//! `config/`, embedded at compile time, so tests exercise exactly what the
//! service loads by default.

use std::sync::Arc;

use edr_protocol::normalizer::{normalize, RawQuery, RequestContext};
use edr_protocol::{
    Collection, CollectionConfig, CollectionRegistry, CrsConfig, CrsRegistry, DataRequest,
    QueryType,
};

/// `config/crs.yaml`.
pub const CRS_YAML: &str = include_str!("../../../config/crs.yaml");
/// `config/collections/isd-2025.yaml`.
pub const ISD_YAML: &str = include_str!("../../../config/collections/isd-2025.yaml");
/// `config/collections/mountains.yaml`.
pub const MOUNTAINS_YAML: &str = include_str!("../../../config/collections/mountains.yaml");

/// Common request geometries, in CRS84 order.
pub mod coords {
    /// Nairobi.
    pub const POINT: &str = "POINT(36.8 -1.3)";
    pub const MULTIPOINT: &str = "MULTIPOINT((36.8 -1.3),(39.6 -4.0))";
    /// A square around Nairobi.
    pub const POLYGON: &str = "POLYGON((36 -2,38 -2,38 0,36 0,36 -2))";
    /// Nairobi to Mombasa.
    pub const LINESTRING: &str = "LINESTRING(36.8 -1.3,39.6 -4.0)";
    /// Kenya, `xmin,ymin,xmax,ymax`.
    pub const KENYA_BBOX: &str = "33.9,-4.7,41.9,5.0";
}

/// The shipped CRS table.
pub fn crs_registry() -> CrsRegistry {
    let entries: Vec<CrsConfig> =
        serde_yaml::from_str(CRS_YAML).expect("config/crs.yaml should parse");
    CrsRegistry::from_entries(entries).expect("config/crs.yaml should be valid")
}

pub fn isd_config() -> CollectionConfig {
    serde_yaml::from_str(ISD_YAML).expect("isd-2025.yaml should parse")
}

pub fn mountains_config() -> CollectionConfig {
    serde_yaml::from_str(MOUNTAINS_YAML).expect("mountains.yaml should parse")
}

/// The resolved `isd-2025` collection.
pub fn isd_collection() -> Arc<Collection> {
    Arc::new(
        isd_config()
            .resolve(&crs_registry())
            .expect("isd-2025 should resolve"),
    )
}

/// The resolved `mountains` collection.
pub fn mountains_collection() -> Arc<Collection> {
    Arc::new(
        mountains_config()
            .resolve(&crs_registry())
            .expect("mountains should resolve"),
    )
}

/// Both shipped collections.
pub fn collection_registry() -> CollectionRegistry {
    CollectionRegistry::from_configs(vec![isd_config(), mountains_config()], &crs_registry())
        .expect("shipped collections should form a registry")
}

/// Build a [`RawQuery`] from literal pairs.
pub fn raw_query(pairs: &[(&str, &str)]) -> RawQuery {
    RawQuery::new(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Normalize a collection-level data request, panicking on validation errors.
pub fn data_request(
    collection: Arc<Collection>,
    query_type: QueryType,
    pairs: &[(&str, &str)],
) -> DataRequest {
    normalize(&RequestContext::new(collection, query_type), &raw_query(pairs))
        .expect("request should normalize")
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_protocol::{Api, RowShape};

    #[test]
    fn test_shipped_crs_table_matches_builtin() {
        let shipped = crs_registry();
        let builtin = CrsRegistry::builtin();
        assert_eq!(shipped.len(), builtin.len());
        for crs in builtin.iter() {
            assert_eq!(shipped.resolve(&crs.uri), Some(crs));
        }
    }

    #[test]
    fn test_isd_fixture() {
        let isd = isd_collection();
        assert_eq!(isd.id, "isd-2025");
        assert_eq!(isd.shape, RowShape::Observations);
        assert_eq!(isd.storage_srid(), 4327);
        assert_eq!(isd.parameters.len(), 6);
        assert_eq!(isd.default_instance_id(), Some("2025-01-01"));
        assert!(isd.published_in(Api::Edr));
    }

    #[test]
    fn test_mountains_fixture() {
        let mountains = mountains_collection();
        assert_eq!(mountains.shape, RowShape::Features);
        assert!(mountains.parameters.is_empty());
        assert!(mountains.published_in(Api::Features));
        assert!(!mountains.published_in(Api::Edr));
    }

    #[test]
    fn test_collection_registry() {
        let registry = collection_registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.published(Api::Edr).count(), 1);
    }

    #[test]
    fn test_data_request_defaults() {
        let request = data_request(isd_collection(), QueryType::Position, &[("coords", coords::POINT)]);
        assert_eq!(request.parameters.len(), 6);
        assert_eq!(request.pagination.limit, 20);
    }
}
