use crate::config::{ConfigurationError, WeatherSettings};
use crate::models::WeatherObservation;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching weather for one coordinate
#[derive(Debug, Error)]
pub enum WeatherFetchError {
    #[error("Weather request failed: {0}")]
    Request(reqwest::Error),

    #[error("Unauthorized: weather API rejected the key")]
    Unauthorized,

    #[error("Weather API returned HTTP {0}")]
    Http(StatusCode),

    #[error("Invalid weather response: {0}")]
    InvalidResponse(String),
}

// Strip the URL: it carries the appid
impl From<reqwest::Error> for WeatherFetchError {
    fn from(e: reqwest::Error) -> Self {
        WeatherFetchError::Request(e.without_url())
    }
}

impl WeatherFetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WeatherFetchError::Request(e) if e.is_timeout())
    }
}

/// Source of current weather conditions for a coordinate
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherObservation, WeatherFetchError>;
}

/// Unit system requested from OpenWeatherMap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Standard,
    Metric,
    Imperial,
}

impl Units {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Units::Standard),
            "metric" => Some(Units::Metric),
            "imperial" => Some(Units::Imperial),
            _ => None,
        }
    }

    fn as_query(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Standard => "K",
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Standard | Units::Metric => "m/s",
        }
    }
}

/// OpenWeatherMap current-weather client
pub struct WeatherClient {
    base_url: String,
    api_key: String,
    units: Units,
    client: Client,
}

impl WeatherClient {
    /// Create a new weather client
    ///
    /// Fails when no API key is configured.
    pub fn new(settings: &WeatherSettings) -> Result<Self, ConfigurationError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ConfigurationError::MissingCredential("Weather API"))?;

        let units = Units::parse(&settings.units).ok_or_else(|| ConfigurationError::Invalid {
            key: "weather.units",
            message: format!("unknown unit system {:?}", settings.units),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                key: "weather",
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            api_key,
            units,
            client,
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherObservation, WeatherFetchError> {
        let url = format!(
            "{}/data/2.5/weather?lat={}&lon={}&appid={}&units={}",
            self.base_url.trim_end_matches('/'),
            lat,
            lon,
            urlencoding::encode(&self.api_key),
            self.units.as_query()
        );

        tracing::trace!("Fetching weather for {:.4}, {:.4}", lat, lon);

        let response = self.client.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(WeatherFetchError::Unauthorized);
            }
            status => return Err(WeatherFetchError::Http(status)),
        }

        let body: CurrentWeather = response
            .json()
            .await
            .map_err(|e| WeatherFetchError::InvalidResponse(e.without_url().to_string()))?;

        body.into_observation(self.units)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

impl CurrentWeather {
    fn into_observation(self, units: Units) -> Result<WeatherObservation, WeatherFetchError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| {
                WeatherFetchError::InvalidResponse("missing weather conditions".into())
            })?;

        Ok(WeatherObservation {
            temperature: format!("{}{}", self.main.temp, units.temperature_suffix()),
            conditions: condition.main,
            description: condition.description,
            humidity: format!("{}%", self.main.humidity),
            wind_speed: format!("{} {}", self.wind.speed, units.speed_suffix()),
        })
    }
}
