use serde::{Deserialize, Serialize};
use validator::Validate;

/// Raw body of `POST /api/route_weather`
///
/// Missing fields deserialize to empty strings so that they are reported by
/// validation rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteWeatherRequest {
    #[serde(default)]
    pub start_address: String,
    #[serde(default)]
    pub end_address: String,
}

/// A validated route query: both addresses trimmed and non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RouteRequest {
    #[validate(length(min = 1))]
    pub start_address: String,
    #[validate(length(min = 1))]
    pub end_address: String,
}

impl RouteRequest {
    /// Trim both addresses and validate them
    pub fn new(
        start_address: &str,
        end_address: &str,
    ) -> Result<Self, validator::ValidationErrors> {
        let request = Self {
            start_address: start_address.trim().to_string(),
            end_address: end_address.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}

impl TryFrom<RouteWeatherRequest> for RouteRequest {
    type Error = validator::ValidationErrors;

    fn try_from(value: RouteWeatherRequest) -> Result<Self, Self::Error> {
        Self::new(&value.start_address, &value.end_address)
    }
}
