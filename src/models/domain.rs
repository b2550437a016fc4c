use serde::{Deserialize, Serialize};

/// A point on the earth's surface in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Key used to detect duplicate points (4 decimal places, roughly 11 m)
    pub fn dedup_key(&self) -> (i64, i64) {
        (
            (self.lat * 10_000.0).round() as i64,
            (self.lon * 10_000.0).round() as i64,
        )
    }
}

/// A computed driving route between two addresses
///
/// `ordered_points` always holds at least the start and end of the route when
/// produced by the directions client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    pub distance: String,
    pub duration: String,
    /// Start address as resolved by the directions provider (may be empty)
    pub start_address: String,
    /// End address as resolved by the directions provider (may be empty)
    pub end_address: String,
    pub ordered_points: Vec<Coordinate>,
}

/// A coordinate along the route selected for weather sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions at a single waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub temperature: String,
    pub conditions: String,
    pub description: String,
    pub humidity: String,
    pub wind_speed: String,
}

/// One entry of the aggregated result; `weather` is `None` when the fetch
/// for this waypoint failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointWeather {
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub weather: Option<WeatherObservation>,
}

/// The aggregated answer for one route request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWeatherResult {
    pub start_address: String,
    pub end_address: String,
    pub distance: String,
    pub duration: String,
    pub weather_data: Vec<WaypointWeather>,
}

impl RouteWeatherResult {
    /// Number of entries whose weather could not be fetched
    pub fn degraded_count(&self) -> usize {
        self.weather_data
            .iter()
            .filter(|entry| entry.weather.is_none())
            .count()
    }
}

/// Append-only history record for a route query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogRecord {
    pub id: uuid::Uuid,
    pub start_address: String,
    pub end_address: String,
    pub waypoint_count: i32,
    pub success: bool,
    pub error: Option<String>,
    pub result: Option<RouteWeatherResult>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl QueryLogRecord {
    /// Record for a request that produced a result
    pub fn succeeded(result: RouteWeatherResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            start_address: result.start_address.clone(),
            end_address: result.end_address.clone(),
            waypoint_count: result.weather_data.len() as i32,
            success: true,
            error: None,
            result: Some(result),
            created_at: chrono::Utc::now(),
        }
    }

    /// Record for a request that failed before a result could be assembled
    pub fn failed(start_address: &str, end_address: &str, error: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            start_address: start_address.to_string(),
            end_address: end_address.to_string(),
            waypoint_count: 0,
            success: false,
            error: Some(error.into()),
            result: None,
            created_at: chrono::Utc::now(),
        }
    }
}
