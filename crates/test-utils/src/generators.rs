//! Synthetic store rows.
//!
//! The rows mimic what `json_agg` returns for the compiled data queries:
//! geometries arrive as GeoJSON text and timestamps as ISO strings.

use chrono::{DateTime, Duration, TimeZone, Utc};
use edr_protocol::{ExtentRow, JsonRow};
use serde_json::{json, Value};

/// First timestamp of every generated series.
pub fn series_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// `count` hourly timestamps starting at [`series_start`].
pub fn hourly_series(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| (series_start() + Duration::hours(i as i64)).format("%Y-%m-%dT%H:%M:%S").to_string())
        .collect()
}

fn point_text(lon: f64, lat: f64) -> String {
    json!({ "type": "Point", "coordinates": [lon, lat] }).to_string()
}

/// An observation row of the ISD collection with `steps` hourly values.
///
/// Values are deterministic: temperature rises by 0.5 per step from 20,
/// wind speed by 0.25 from 2.
pub fn station_row(station: &str, lon: f64, lat: f64, steps: usize) -> JsonRow {
    let temperature: Vec<Value> = (0..steps).map(|i| json!(20.0 + 0.5 * i as f64)).collect();
    let wind_speed: Vec<Value> = (0..steps).map(|i| json!(2.0 + 0.25 * i as f64)).collect();
    let datetime = hourly_series(steps);

    let mut row = JsonRow::new();
    row.insert("id".to_string(), json!(station));
    row.insert("location".to_string(), json!("KE"));
    row.insert("label".to_string(), json!(format!("STATION {}", station)));
    row.insert("geom".to_string(), json!(point_text(lon, lat)));
    row.insert("temperature".to_string(), Value::Array(temperature));
    row.insert("windSpeed".to_string(), Value::Array(wind_speed));
    row.insert("tmin".to_string(), json!(datetime.first().cloned()));
    row.insert("tmax".to_string(), json!(datetime.last().cloned()));
    row.insert("datetime".to_string(), json!(datetime));
    row
}

/// `count` station rows spread eastwards from Nairobi.
pub fn station_rows(count: usize, steps: usize) -> Vec<JsonRow> {
    (0..count)
        .map(|i| station_row(&format!("6374{}", i), 36.8 + 0.1 * i as f64, -1.3, steps))
        .collect()
}

/// A row of the mountains collection.
pub fn mountain_row(name: &str, lon: f64, lat: f64, height_m: f64) -> JsonRow {
    let mut row = JsonRow::new();
    row.insert("id".to_string(), json!(name));
    row.insert("continent".to_string(), json!("Africa"));
    row.insert("countries".to_string(), json!("Tanzania"));
    row.insert("height_ft".to_string(), json!((height_m * 3.28084).round()));
    row.insert("height_m".to_string(), json!(height_m));
    row.insert("regions".to_string(), json!("Kilimanjaro Region"));
    row.insert(
        "geom".to_string(),
        json!(json!({ "type": "Point", "coordinates": [lon, lat, height_m] }).to_string()),
    );
    row
}

/// A one-day extent row over `bbox` with hourly time values.
pub fn extent_row(id: &str, bbox: [f64; 4], hours: usize) -> ExtentRow {
    let tvalues: Vec<DateTime<Utc>> = (0..hours)
        .map(|i| series_start() + Duration::hours(i as i64))
        .collect();
    ExtentRow {
        id: id.to_string(),
        tmin: tvalues.first().copied(),
        tmax: tvalues.last().copied(),
        tvalues,
        zmin: Some(0.0),
        zmax: Some(0.0),
        zvalues: vec![0.0],
        xmin: Some(bbox[0]),
        ymin: Some(bbox[1]),
        xmax: Some(bbox[2]),
        ymax: Some(bbox[3]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_series() {
        let series = hourly_series(3);
        assert_eq!(series[0], "2025-01-01T00:00:00");
        assert_eq!(series[2], "2025-01-01T02:00:00");
    }

    #[test]
    fn test_station_row_arrays_align() {
        let row = station_row("63740", 36.8, -1.3, 4);
        assert_eq!(row["temperature"].as_array().unwrap().len(), 4);
        assert_eq!(row["datetime"].as_array().unwrap().len(), 4);
        assert_eq!(row["tmax"], json!("2025-01-01T03:00:00"));
    }

    #[test]
    fn test_station_rows_distinct_ids() {
        let rows = station_rows(3, 1);
        assert_ne!(rows[0]["id"], rows[1]["id"]);
    }

    #[test]
    fn test_extent_row() {
        let row = extent_row("2025-01-01", [33.9, -4.7, 41.9, 5.0], 24);
        assert_eq!(row.tvalues.len(), 24);
        assert_eq!(row.bbox(), Some([33.9, -4.7, 41.9, 5.0]));
    }
}
