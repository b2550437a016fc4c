// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Coordinate, QueryLogRecord, RoutePath, RouteWeatherResult, Waypoint, WaypointWeather,
    WeatherObservation,
};
pub use requests::{RouteRequest, RouteWeatherRequest};
pub use responses::{ErrorResponse, HealthResponse, RouteWeatherResponse};
