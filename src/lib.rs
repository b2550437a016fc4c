//! Weather Route - weather along a driving route
//!
//! This library computes a driving route between two addresses, samples a
//! bounded set of waypoints along it and fetches current weather for each,
//! tolerating per-waypoint weather failures. Query history is written to
//! PostgreSQL on a best-effort basis.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{sample_waypoints, PipelineError, RouteWeatherPipeline};
pub use models::{
    QueryLogRecord, RoutePath, RouteRequest, RouteWeatherResult, Waypoint, WeatherObservation,
};
