//! Query execution against PostgreSQL/PostGIS.

use std::time::Instant;

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use edr_protocol::{Collection, CrsConfig, DataRequest, ExtentRow, JsonRow};

use crate::error::{StorageError, StorageResult};
use crate::extent::{decode_extent_row, extent_query, ExtentMode};
use crate::predicate::Predicate;
use crate::query::{data_query, exists_query};
use crate::spatial::{instance_filter, item_filter, location_filter};

/// Rows of one page plus the pre-pagination match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub number_matched: i64,
    pub rows: Vec<JsonRow>,
}

/// Database connection pool and query execution.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    /// Create a new catalog connection from database URL.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// A catalog whose connections are opened on first use.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)
            .map_err(|e| StorageError::DatabaseError(format!("Invalid database URL: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round trip to the database.
    pub async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    /// Execute a normalized data request.
    ///
    /// Path identifiers are checked for existence first, in the same
    /// transaction as the data query.
    pub async fn query(&self, request: &DataRequest) -> StorageResult<QueryResult> {
        let collection = request.collection.as_ref();
        let start = Instant::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Transaction failed: {}", e)))?;

        if let Some(id) = &request.instance_id {
            if let Some(predicate) = instance_filter(collection, id) {
                if !exists(&mut tx, collection, &predicate).await? {
                    return Err(StorageError::InstanceNotFound(id.clone()));
                }
            }
        }
        if let Some(id) = &request.location_id {
            if !exists(&mut tx, collection, &location_filter(collection, id)).await? {
                return Err(StorageError::LocationNotFound(id.clone()));
            }
        }
        if let Some(id) = &request.item_id {
            if !exists(&mut tx, collection, &item_filter(collection, id)).await? {
                return Err(StorageError::ItemNotFound(id.clone()));
            }
        }

        let mut qb = data_query(request);
        debug!(collection = %collection.id, sql = qb.sql(), "Executing data query");

        let row = qb
            .build()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Query failed: {}", e)))?;

        let number_matched: i32 = row
            .try_get("numberMatched")
            .map_err(|e| StorageError::Decode(e.to_string()))?;
        let rows: Option<Json<Vec<JsonRow>>> = row
            .try_get("rows")
            .map_err(|e| StorageError::Decode(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Commit failed: {}", e)))?;

        let rows = rows.map(|r| r.0).unwrap_or_default();
        debug!(
            collection = %collection.id,
            number_matched,
            returned = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Data query complete"
        );

        Ok(QueryResult {
            number_matched: i64::from(number_matched),
            rows,
        })
    }

    /// Aggregate extents of a collection or of its instances.
    ///
    /// Narrowing to an instance that has no rows is `InstanceNotFound`.
    pub async fn extent(
        &self,
        collection: &Collection,
        crs: &CrsConfig,
        mode: ExtentMode,
    ) -> StorageResult<Vec<ExtentRow>> {
        let mut qb = extent_query(collection, crs, &mode)?;
        debug!(collection = %collection.id, sql = qb.sql(), "Executing extent query");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Query failed: {}", e)))?;

        let extents = rows
            .iter()
            .map(|row| decode_extent_row(row, &collection.id))
            .collect::<StorageResult<Vec<_>>>()?;

        if let ExtentMode::Instances {
            instance_id: Some(id),
        } = &mode
        {
            if extents.is_empty() {
                return Err(StorageError::InstanceNotFound(id.clone()));
            }
        }

        Ok(extents)
    }
}

async fn exists(
    tx: &mut Transaction<'static, Postgres>,
    collection: &Collection,
    predicate: &Predicate,
) -> StorageResult<bool> {
    let mut qb = exists_query(collection, predicate);
    let row = qb
        .build()
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| StorageError::DatabaseError(format!("Query failed: {}", e)))?;
    Ok(row.is_some())
}
