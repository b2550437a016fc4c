use crate::config::{ConfigurationError, DirectionsSettings};
use crate::models::{Coordinate, RoutePath};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when computing a route
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Directions request failed: {0}")]
    Request(reqwest::Error),

    #[error("Directions API returned HTTP {0}")]
    Http(StatusCode),

    #[error("Directions API error {status}: {message}")]
    Provider { status: String, message: String },

    #[error("No route found between the specified addresses ({0})")]
    NotFound(String),

    #[error("Invalid directions response: {0}")]
    InvalidResponse(String),
}

// The request URL carries the API key, so it never reaches error text
impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        RoutingError::Request(e.without_url())
    }
}

impl RoutingError {
    /// True when the request itself never got a usable answer (network or timeout)
    pub fn is_transport(&self) -> bool {
        matches!(self, RoutingError::Request(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RoutingError::Request(e) if e.is_timeout())
    }
}

/// Source of driving routes between two free-form addresses
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn compute_route(&self, start: &str, end: &str) -> Result<RoutePath, RoutingError>;
}

/// Google Directions API client
pub struct DirectionsClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl DirectionsClient {
    /// Create a new directions client
    ///
    /// Fails when no API key is configured.
    pub fn new(settings: &DirectionsSettings) -> Result<Self, ConfigurationError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ConfigurationError::MissingCredential("Google Maps API"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                key: "directions",
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            api_key,
            client,
        })
    }

    fn directions_url(&self, start: &str, end: &str) -> String {
        format!(
            "{}/maps/api/directions/json?origin={}&destination={}&mode=driving&key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(start),
            urlencoding::encode(end),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl RouteProvider for DirectionsClient {
    async fn compute_route(&self, start: &str, end: &str) -> Result<RoutePath, RoutingError> {
        tracing::debug!("Requesting driving directions: {:?} -> {:?}", start, end);

        let response = self
            .client
            .get(self.directions_url(start, end))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Directions API returned HTTP {}", status);
            return Err(RoutingError::Http(status));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::InvalidResponse(e.without_url().to_string()))?;

        let path = body.into_route_path()?;

        tracing::debug!(
            "Route resolved: {} / {} with {} points",
            path.distance,
            path.duration,
            path.ordered_points.len()
        );

        Ok(path)
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    distance: Option<TextValue>,
    #[serde(default)]
    duration: Option<TextValue>,
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
    start_location: LatLng,
    end_location: LatLng,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    end_location: LatLng,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(value: LatLng) -> Self {
        Coordinate::new(value.lat, value.lng)
    }
}

impl DirectionsResponse {
    fn into_route_path(self) -> Result<RoutePath, RoutingError> {
        match self.status.as_str() {
            "OK" => {}
            "NOT_FOUND" | "ZERO_RESULTS" => {
                return Err(RoutingError::NotFound(self.status));
            }
            _ => {
                let message = self.error_message.unwrap_or_default();
                tracing::error!("Directions API error {}: {}", self.status, message);
                return Err(RoutingError::Provider {
                    status: self.status,
                    message,
                });
            }
        }

        let legs = self
            .routes
            .into_iter()
            .next()
            .map(|route| route.legs)
            .ok_or_else(|| RoutingError::NotFound("no routes returned".into()))?;

        let (first, last) = match (legs.first(), legs.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(RoutingError::InvalidResponse("route has no legs".into())),
        };

        let mut ordered_points = vec![Coordinate::from(first.start_location)];
        ordered_points.extend(
            legs.iter()
                .flat_map(|leg| leg.steps.iter())
                .map(|step| Coordinate::from(step.end_location)),
        );
        ordered_points.push(Coordinate::from(last.end_location));

        let text_or_na = |value: &Option<TextValue>| {
            value
                .as_ref()
                .map(|v| v.text.clone())
                .unwrap_or_else(|| "N/A".to_string())
        };

        Ok(RoutePath {
            distance: text_or_na(&first.distance),
            duration: text_or_na(&first.duration),
            start_address: first.start_address.clone(),
            end_address: last.end_address.clone(),
            ordered_points,
        })
    }
}
