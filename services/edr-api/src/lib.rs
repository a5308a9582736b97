//! EDR API Service Library
//!
//! HTTP server for the OGC API - Environmental Data Retrieval and
//! OGC API - Features trees over PostGIS collections.

pub mod config;
pub mod content_negotiation;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
