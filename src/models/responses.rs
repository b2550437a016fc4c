use serde::{Deserialize, Serialize};
use crate::models::domain::{RouteWeatherResult, WaypointWeather};

/// Success body for `POST /api/route_weather`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteWeatherResponse {
    pub success: bool,
    pub start_address: String,
    pub end_address: String,
    pub distance: String,
    pub duration: String,
    pub weather_data: Vec<WaypointWeather>,
}

impl From<RouteWeatherResult> for RouteWeatherResponse {
    fn from(result: RouteWeatherResult) -> Self {
        Self {
            success: true,
            start_address: result.start_address,
            end_address: result.end_address,
            distance: result.distance,
            duration: result.duration,
            weather_data: result.weather_data,
        }
    }
}

/// Health check response
///
/// Reports collaborator availability as known at startup; nothing is called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub google_maps_configured: bool,
    pub weather_api_configured: bool,
    /// Whether the query-log store connected at startup
    pub mongodb_connected: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
