//! PostGIS storage for the EDR and Features services.
//!
//! Provides:
//! - A typed PostGIS expression tree rendered through `sqlx::QueryBuilder`
//! - Predicate compilation for every data query archetype
//! - Data, locations and extent statements
//! - The `Catalog` execution context (pool + per-request transaction)

pub mod catalog;
pub mod error;
pub mod extent;
pub mod predicate;
pub mod query;
pub mod spatial;

pub use catalog::{Catalog, QueryResult};
pub use error::{StorageError, StorageResult};
pub use extent::{extent_query, ExtentMode};
pub use predicate::{output_geometry, Geom, Predicate};
pub use query::data_query;
pub use spatial::compile_predicates;
