//! Data query compilation.
//!
//! Every data request becomes one statement over two CTEs: `values1` holds
//! every matching row, `values2` the requested page of it. The outer select
//! returns the pre-pagination count and the page as a JSON array.

use sqlx::{Postgres, QueryBuilder};

use edr_protocol::{Collection, DataRequest, OutputFormat, ParameterConfig, QueryType, RowShape};

use crate::predicate::{output_geometry, push_where, Predicate};
use crate::spatial::compile_predicates;

/// Slice applied to aggregated arrays: the flat JSON views keep one value.
fn array_slice(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json | OutputFormat::GeoJson => "[1:1]",
        _ => "",
    }
}

fn parameter_value(param: &ParameterConfig) -> String {
    match param.array_index {
        Some(index) => format!(
            "CAST({}[{}] AS {})",
            param.source_column,
            index,
            param.data_type.sql_type()
        ),
        None => format!("CAST({} AS {})", param.source_column, param.data_type.sql_type()),
    }
}

fn aggregate(expr: &str, order_by: Option<&str>, slice: &str) -> String {
    match order_by {
        Some(order) => format!("(ARRAY_AGG({} ORDER BY {})){}", expr, order, slice),
        None => format!("(ARRAY_AGG({})){}", expr, slice),
    }
}

fn group_by_columns(collection: &Collection) -> Vec<String> {
    let source = &collection.source;
    if !source.group_by.is_empty() {
        return source.group_by.clone();
    }
    let mut columns = vec![source.id_column.clone(), source.geometry_column.clone()];
    for column in [&source.location_column, &source.label_column].into_iter().flatten() {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Select list of `values1` for observation collections.
fn push_observation_select(qb: &mut QueryBuilder<'static, Postgres>, request: &DataRequest) {
    let collection = request.collection.as_ref();
    let source = &collection.source;
    let slice = array_slice(request.format);
    let order = source.datetime_column.as_deref();

    qb.push(format!("SELECT {} AS id", source.id_column));
    if let Some(location) = &source.location_column {
        qb.push(format!(", {} AS location", location));
    }
    if let Some(label) = &source.label_column {
        qb.push(format!(", {} AS label", label));
    }
    qb.push(", ST_AsGeoJSON(");
    output_geometry(&source.geometry_column, collection.storage_srid(), &request.crs).push_to(qb);
    qb.push(") AS geom");

    for param in &request.parameters {
        qb.push(format!(
            ", {} AS \"{}\"",
            aggregate(&parameter_value(param), order, slice),
            param.id
        ));
    }

    if let Some(dt) = &source.datetime_column {
        qb.push(format!(
            ", {} AS datetime, MAX({dt}) AS tmax, MIN({dt}) AS tmin",
            aggregate(dt, Some(dt), slice)
        ));
    }
}

/// Select list of `values1` for feature collections.
fn push_feature_select(qb: &mut QueryBuilder<'static, Postgres>, request: &DataRequest) {
    let collection = request.collection.as_ref();
    let source = &collection.source;

    qb.push(format!("SELECT {} AS id", source.id_column));
    for column in &source.property_columns {
        qb.push(format!(", {}", column));
    }
    if let Some(dt) = &source.datetime_column {
        qb.push(format!(", {} AS datetime", dt));
    }
    qb.push(", ST_AsGeoJSON(");
    output_geometry(&source.geometry_column, collection.storage_srid(), &request.crs).push_to(qb);
    qb.push(") AS geom");
}

/// Select list and grouping of the locations listing.
fn push_locations_select(qb: &mut QueryBuilder<'static, Postgres>, request: &DataRequest) {
    let collection = request.collection.as_ref();
    let source = &collection.source;
    let location = source.location_column.as_ref().unwrap_or(&source.id_column);

    qb.push(format!("SELECT {} AS id", location));
    if let Some(dt) = &source.datetime_column {
        qb.push(format!(", MAX({dt}) AS tmax, MIN({dt}) AS tmin"));
    }
    qb.push(", ST_AsGeoJSON(CAST(ST_Extent(");
    output_geometry(&source.geometry_column, collection.storage_srid(), &request.crs).push_to(qb);
    qb.push(") AS geometry)) AS geom");
}

fn push_page(qb: &mut QueryBuilder<'static, Postgres>, request: &DataRequest) {
    let order_by = request.collection.source.order_by.as_deref().unwrap_or("id");
    qb.push(format!("), values2 AS (SELECT * FROM values1 ORDER BY {} LIMIT ", order_by));
    qb.push_bind(request.pagination.limit);
    qb.push(" OFFSET ");
    qb.push_bind(request.pagination.offset);
    qb.push(
        ") SELECT (SELECT CAST(COUNT(*) AS integer) FROM values1) AS \"numberMatched\", \
         (SELECT json_agg(values2) FROM values2) AS rows",
    );
}

/// True when the request lists locations rather than their observations.
pub fn is_locations_listing(request: &DataRequest) -> bool {
    request.query_type() == QueryType::Locations && request.location_id.is_none()
}

/// Compile a data request into its single statement.
pub fn data_query(request: &DataRequest) -> QueryBuilder<'static, Postgres> {
    let collection = request.collection.as_ref();
    let source = &collection.source;
    let predicates = compile_predicates(request);

    let mut qb = QueryBuilder::<Postgres>::new("WITH values1 AS (");

    if is_locations_listing(request) {
        push_locations_select(&mut qb, request);
        qb.push(format!(" FROM {}", source.table));
        push_where(&mut qb, &predicates);
        let location = source.location_column.as_ref().unwrap_or(&source.id_column);
        qb.push(format!(" GROUP BY {}", location));
    } else {
        match collection.shape {
            RowShape::Observations => {
                push_observation_select(&mut qb, request);
                qb.push(format!(" FROM {}", source.table));
                push_where(&mut qb, &predicates);
                qb.push(format!(" GROUP BY {}", group_by_columns(collection).join(", ")));
            }
            RowShape::Features => {
                push_feature_select(&mut qb, request);
                qb.push(format!(" FROM {}", source.table));
                push_where(&mut qb, &predicates);
            }
        }
    }

    push_page(&mut qb, request);
    qb
}

/// `SELECT 1 FROM table WHERE predicate LIMIT 1`.
pub fn exists_query(collection: &Collection, predicate: &Predicate) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT 1 FROM {}", collection.source.table));
    push_where(&mut qb, std::slice::from_ref(predicate));
    qb.push(" LIMIT 1");
    qb
}
