use crate::config::ConfigurationError;
use crate::core::sampler::sample_waypoints;
use crate::models::{RouteRequest, RouteWeatherResult, WaypointWeather};
use crate::services::{RouteProvider, RoutingError, WeatherProvider};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

/// Failures that abort a route weather request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Route-to-waypoint weather aggregation
///
/// # Pipeline Stages
/// 1. Route computation (hard dependency, failure aborts the request)
/// 2. Waypoint sampling
/// 3. Concurrent per-waypoint weather lookups (soft dependency, a failure
///    degrades only that waypoint to `None`)
/// 4. Result assembly in route order
///
/// A provider left as `None` was not configured at startup.
#[derive(Clone)]
pub struct RouteWeatherPipeline {
    routes: Option<Arc<dyn RouteProvider>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    max_waypoints: usize,
}

impl RouteWeatherPipeline {
    pub fn new(
        routes: Option<Arc<dyn RouteProvider>>,
        weather: Option<Arc<dyn WeatherProvider>>,
        max_waypoints: usize,
    ) -> Self {
        Self {
            routes,
            weather,
            max_waypoints,
        }
    }

    pub fn routing_configured(&self) -> bool {
        self.routes.is_some()
    }

    pub fn weather_configured(&self) -> bool {
        self.weather.is_some()
    }

    pub fn max_waypoints(&self) -> usize {
        self.max_waypoints
    }

    /// Compute the route and the weather along it
    pub async fn get_route_weather(
        &self,
        request: &RouteRequest,
    ) -> Result<RouteWeatherResult, PipelineError> {
        let routes = self
            .routes
            .as_ref()
            .ok_or(ConfigurationError::MissingCredential("Google Maps API"))?;
        let weather = self
            .weather
            .as_ref()
            .ok_or(ConfigurationError::MissingCredential("Weather API"))?;

        let path = routes
            .compute_route(&request.start_address, &request.end_address)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Routing failed for {:?} -> {:?}: {}",
                    request.start_address,
                    request.end_address,
                    e
                );
                e
            })?;

        let waypoints = sample_waypoints(&path, self.max_waypoints);

        tracing::debug!(
            "Sampled {} waypoints from {} route points",
            waypoints.len(),
            path.ordered_points.len()
        );

        // join_all yields results in input order regardless of completion order
        let observations = join_all(
            waypoints
                .iter()
                .map(|waypoint| weather.fetch_weather(waypoint.lat, waypoint.lon)),
        )
        .await;

        let weather_data: Vec<WaypointWeather> = waypoints
            .into_iter()
            .zip(observations)
            .map(|(waypoint, observation)| {
                let weather = match observation {
                    Ok(observation) => Some(observation),
                    Err(e) if e.is_timeout() => {
                        tracing::warn!(
                            "Weather request timed out for {} ({:.4}, {:.4})",
                            waypoint.label,
                            waypoint.lat,
                            waypoint.lon
                        );
                        None
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Weather unavailable for {} ({:.4}, {:.4}): {}",
                            waypoint.label,
                            waypoint.lat,
                            waypoint.lon,
                            e
                        );
                        None
                    }
                };

                WaypointWeather {
                    location: waypoint.label,
                    lat: waypoint.lat,
                    lon: waypoint.lon,
                    weather,
                }
            })
            .collect();

        let result = RouteWeatherResult {
            start_address: request.start_address.clone(),
            end_address: request.end_address.clone(),
            distance: path.distance,
            duration: path.duration,
            weather_data,
        };

        tracing::info!(
            "Route weather assembled: {} waypoints ({} degraded)",
            result.weather_data.len(),
            result.degraded_count()
        );

        Ok(result)
    }
}
