//! Request metrics exported through the Prometheus recorder.

use metrics::{counter, histogram};
use std::time::Duration;

use edr_protocol::QueryType;

/// Status class label ("2xx", "4xx", ...).
pub fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Record one data query.
pub fn record_query(query_type: QueryType, status: u16, elapsed: Duration) {
    let query_type = query_type.as_str();
    counter!("edr_requests_total", "query_type" => query_type, "status" => status_class(status))
        .increment(1);
    histogram!("edr_query_duration_seconds", "query_type" => query_type)
        .record(elapsed.as_secs_f64());
}

/// Record the rows returned by one data query.
pub fn record_rows(query_type: QueryType, rows: usize) {
    histogram!("edr_query_rows", "query_type" => query_type.as_str()).record(rows as f64);
}
