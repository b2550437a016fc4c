use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Missing or invalid configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
}

impl ConfigurationError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub directions: DirectionsSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }

/// Google Directions API settings
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_directions_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for DirectionsSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_directions_base_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_directions_base_url() -> String { "https://maps.googleapis.com".to_string() }

/// OpenWeatherMap settings
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// `standard`, `metric` or `imperial`
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            units: default_units(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_weather_base_url() -> String { "https://api.openweathermap.org".to_string() }
fn default_units() -> String { "metric".to_string() }
fn default_request_timeout() -> u64 { 10 }

/// Query-log store settings; without a URL the service runs without history
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: None,
            min_connections: None,
            acquire_timeout_secs: default_acquire_timeout(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

fn default_acquire_timeout() -> u64 { 5 }
fn default_write_timeout() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Upper bound on weather lookups per route
    #[serde(default = "default_max_waypoints")]
    pub max_waypoints: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_waypoints: default_max_waypoints(),
        }
    }
}

pub const MIN_WAYPOINTS: usize = 2;
pub const MAX_WAYPOINTS: usize = 25;

fn default_max_waypoints() -> usize { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, config/local.toml)
    /// 3. Environment variables (prefixed with WEATHER_ROUTE__)
    /// 4. Conventional variables (GOOGLE_MAPS_KEY, WEATHER_API_KEY, DATABASE_URL, PORT)
    pub fn load() -> Result<Self, ConfigurationError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., WEATHER_ROUTE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("WEATHER_ROUTE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(settings)
    }

    /// Load configuration from a custom path
    ///
    /// Environment overrides apply exactly as in [`Settings::load`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("WEATHER_ROUTE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(settings)
    }

    fn finish(layered: Config) -> Result<Self, ConfigurationError> {
        let layered = apply_conventional_env(layered)?;

        let mut settings: Settings = layered.try_deserialize()?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Treat blank credentials and URLs as absent
    pub fn normalize(&mut self) {
        fn blank_to_none(value: &mut Option<String>) {
            if value.as_deref().map(str::trim).is_some_and(str::is_empty) {
                *value = None;
            }
        }

        blank_to_none(&mut self.directions.api_key);
        blank_to_none(&mut self.weather.api_key);
        blank_to_none(&mut self.database.url);
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (key, url) in [
            ("directions.base_url", &self.directions.base_url),
            ("weather.base_url", &self.weather.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigurationError::invalid(key, "must be an HTTP or HTTPS URL"));
            }
        }

        for (key, secs) in [
            ("directions.timeout_secs", self.directions.timeout_secs),
            ("weather.timeout_secs", self.weather.timeout_secs),
            ("database.write_timeout_secs", self.database.write_timeout_secs),
            ("database.acquire_timeout_secs", self.database.acquire_timeout_secs),
        ] {
            if secs == 0 || secs > 120 {
                return Err(ConfigurationError::invalid(key, "must be between 1 and 120 seconds"));
            }
        }

        if !(MIN_WAYPOINTS..=MAX_WAYPOINTS).contains(&self.pipeline.max_waypoints) {
            return Err(ConfigurationError::invalid(
                "pipeline.max_waypoints",
                format!("must be between {} and {}", MIN_WAYPOINTS, MAX_WAYPOINTS),
            ));
        }

        let units = ["standard", "metric", "imperial"];
        if !units.contains(&self.weather.units.as_str()) {
            return Err(ConfigurationError::invalid(
                "weather.units",
                format!("must be one of: {}", units.join(", ")),
            ));
        }

        let levels = ["error", "warn", "info", "debug", "trace"];
        if !levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigurationError::invalid(
                "logging.level",
                format!("must be one of: {}", levels.join(", ")),
            ));
        }

        let formats = ["pretty", "json"];
        if !formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigurationError::invalid(
                "logging.format",
                format!("must be one of: {}", formats.join(", ")),
            ));
        }

        Ok(())
    }
}

/// Map the conventional deployment variables onto their settings keys
fn apply_conventional_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in [
        ("GOOGLE_MAPS_KEY", "directions.api_key"),
        ("WEATHER_API_KEY", "weather.api_key"),
        ("DATABASE_URL", "database.url"),
    ] {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    if let Ok(port) = env::var("PORT") {
        builder = builder.set_override("server.port", port)?;
    }

    builder.build()
}
