//! Aggregate extent queries.
//!
//! One row for the whole collection, or one row per day bucket in
//! instances mode.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use edr_protocol::{Collection, CrsConfig, ExtentRow};

use crate::error::{StorageError, StorageResult};
use crate::predicate::{output_geometry, push_where, CompareOp, Literal, Predicate, Scalar};

/// Which aggregate to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtentMode {
    Collection,
    /// Grouped per day; optionally narrowed to one instance id.
    Instances { instance_id: Option<String> },
}

/// Build the extent statement for `collection`, with bounds in `crs`.
pub fn extent_query(
    collection: &Collection,
    crs: &CrsConfig,
    mode: &ExtentMode,
) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let source = &collection.source;
    let mut qb = QueryBuilder::<Postgres>::new("SELECT ");

    let bucket = match (mode, &source.datetime_column) {
        (ExtentMode::Collection, _) => None,
        (ExtentMode::Instances { .. }, Some(column)) => Some(Scalar::day_bucket(column)),
        (ExtentMode::Instances { .. }, None) => {
            return Err(StorageError::Unsupported(format!(
                "collection {} has no datetime column to group instances by",
                collection.id
            )))
        }
    };

    match &bucket {
        Some(bucket) => {
            bucket.push_to(&mut qb);
            qb.push(" AS id, ");
        }
        None => {
            qb.push("NULL::text AS id, ");
        }
    }

    match &source.datetime_column {
        Some(dt) => {
            qb.push(format!(
                "CAST(MAX({dt}) AS timestamptz) AS tmax, \
                 CAST(MIN({dt}) AS timestamptz) AS tmin, \
                 CAST(ARRAY_REMOVE(ARRAY_AGG(DISTINCT {dt}), NULL) AS timestamptz[]) AS tvalues, "
            ));
        }
        None => {
            qb.push(
                "NULL::timestamptz AS tmax, NULL::timestamptz AS tmin, \
                 NULL::timestamptz[] AS tvalues, ",
            );
        }
    }

    let z = format!("ST_Z(ST_Force3D({}))", source.geometry_column);
    qb.push(format!(
        "CAST(MAX({z}) AS float8) AS zmax, CAST(MIN({z}) AS float8) AS zmin, \
         CAST(ARRAY_AGG(DISTINCT {z}) AS float8[]) AS zvalues, "
    ));

    let bounds = ["ST_XMin", "ST_YMin", "ST_XMax", "ST_YMax"];
    let aliases = ["xmin", "ymin", "xmax", "ymax"];
    for (i, (function, alias)) in bounds.iter().zip(aliases).enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("{}(ST_Extent(", function));
        output_geometry(&source.geometry_column, collection.storage_srid(), crs).push_to(&mut qb);
        qb.push(format!(")) AS {}", alias));
    }

    qb.push(format!(" FROM {}", source.table));

    let mut predicates = vec![Predicate::IsNotNull(Scalar::column(&source.geometry_column))];
    if let (Some(bucket), ExtentMode::Instances { instance_id: Some(id) }) = (&bucket, mode) {
        predicates.push(Predicate::compare(
            bucket.clone(),
            CompareOp::Eq,
            Literal::Text(id.clone()),
        ));
    }
    push_where(&mut qb, &predicates);

    if let Some(bucket) = &bucket {
        qb.push(" GROUP BY ");
        bucket.push_to(&mut qb);
        qb.push(" ORDER BY id");
    }

    Ok(qb)
}

/// Decode one extent row. A null id is the collection aggregate.
pub fn decode_extent_row(row: &PgRow, collection_id: &str) -> StorageResult<ExtentRow> {
    let get_err = |e: sqlx::Error| StorageError::Decode(e.to_string());

    let id: Option<String> = row.try_get("id").map_err(get_err)?;
    Ok(ExtentRow {
        id: id.unwrap_or_else(|| collection_id.to_string()),
        tmin: row.try_get("tmin").map_err(get_err)?,
        tmax: row.try_get("tmax").map_err(get_err)?,
        tvalues: row
            .try_get::<Option<Vec<DateTime<Utc>>>, _>("tvalues")
            .map_err(get_err)?
            .unwrap_or_default(),
        zmin: row.try_get("zmin").map_err(get_err)?,
        zmax: row.try_get("zmax").map_err(get_err)?,
        zvalues: row
            .try_get::<Option<Vec<f64>>, _>("zvalues")
            .map_err(get_err)?
            .unwrap_or_default(),
        xmin: row.try_get("xmin").map_err(get_err)?,
        ymin: row.try_get("ymin").map_err(get_err)?,
        xmax: row.try_get("xmax").map_err(get_err)?,
        ymax: row.try_get("ymax").map_err(get_err)?,
    })
}
