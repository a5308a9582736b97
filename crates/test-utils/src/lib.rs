//! Shared test utilities for the EDR workspace.
//!
//! This crate provides common testing infrastructure including:
//! - The built-in collections and CRS table as ready-made registries
//! - Synthetic store rows for the response parsers
//! - A skip macro for tests that need a live PostGIS database
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{isd_collection, station_row};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Skip a test unless `TEST_DATABASE_URL` points at a PostGIS database.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_database;
///
/// #[tokio::test]
/// async fn test_query_roundtrip() {
///     let url = require_database!();
///     let catalog = Catalog::connect(&url, 2).await.unwrap();
/// }
/// ```
#[macro_export]
macro_rules! require_database {
    () => {{
        match $crate::test_database_url() {
            Some(url) => url,
            None => {
                eprintln!("SKIPPED: TEST_DATABASE_URL is not set.");
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of a GeoJSON position's first two ordinates.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_position_approx_eq;
///
/// assert_position_approx_eq!(&[36.8001, -1.2999], (36.8, -1.3), 0.001);
/// ```
#[macro_export]
macro_rules! assert_position_approx_eq {
    ($position:expr, ($x:expr, $y:expr), $epsilon:expr) => {{
        let position = $position;
        $crate::assert_approx_eq!(position[0], $x, $epsilon);
        $crate::assert_approx_eq!(position[1], $y, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_position_approx_eq_passes() {
        assert_position_approx_eq!(&[36.8001, -1.2999, 10.0], (36.8, -1.3), 0.001);
    }
}
