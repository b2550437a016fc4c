use crate::config::ConfigurationError;
use crate::core::{PipelineError, RouteWeatherPipeline};
use crate::models::{
    ErrorResponse, HealthResponse, QueryLogRecord, RouteRequest, RouteWeatherRequest,
    RouteWeatherResponse,
};
use crate::services::{QueryLogger, RoutingError};
use actix_web::{http::StatusCode, web, HttpResponse, Responder, ResponseError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: RouteWeatherPipeline,
    pub logger: QueryLogger,
}

/// Errors surfaced to API callers as `{success: false, error}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidJson(String),

    #[error("Both start_address and end_address are required")]
    MissingAddress,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Pipeline(PipelineError::Configuration(
                ConfigurationError::MissingCredential(name),
            )) => {
                format!("{} not configured. Please set the corresponding API key.", name)
            }
            ApiError::Pipeline(PipelineError::Configuration(_)) => {
                "Service is not configured correctly.".to_string()
            }
            ApiError::Pipeline(PipelineError::Routing(RoutingError::NotFound(_))) => {
                "No route found between the specified addresses".to_string()
            }
            ApiError::Pipeline(PipelineError::Routing(RoutingError::Provider { .. })) => {
                "Google Maps API error. Please check your API key and try again.".to_string()
            }
            ApiError::Pipeline(PipelineError::Routing(_)) => {
                "Error calculating route. Please verify your addresses and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) | ApiError::MissingAddress => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::Configuration(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Pipeline(PipelineError::Routing(RoutingError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Pipeline(PipelineError::Routing(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.message()))
    }
}

/// Configure the route weather API
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/route_weather", web::post().to(route_weather));
}

/// Health check endpoint
///
/// Reports what was configured and connected at startup without calling any
/// collaborator.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        google_maps_configured: state.pipeline.routing_configured(),
        weather_api_configured: state.pipeline.weather_configured(),
        mongodb_connected: state.logger.is_connected(),
    })
}

/// Route weather endpoint
///
/// POST /api/route_weather
///
/// Request body:
/// ```json
/// {
///   "start_address": "New York, NY",
///   "end_address": "Boston, MA"
/// }
/// ```
async fn route_weather(
    state: web::Data<AppState>,
    body: web::Json<RouteWeatherRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = RouteRequest::try_from(body.into_inner()).map_err(|errors| {
        tracing::info!("Validation failed for route_weather request: {}", errors);
        ApiError::MissingAddress
    })?;

    tracing::info!(
        "Route weather query: {:?} -> {:?}",
        request.start_address,
        request.end_address
    );

    match state.pipeline.get_route_weather(&request).await {
        Ok(result) => {
            // Detached: the response never waits on the history write
            let _ = state.logger.log_query(QueryLogRecord::succeeded(result.clone()));
            Ok(HttpResponse::Ok().json(RouteWeatherResponse::from(result)))
        }
        Err(e) => {
            let _ = state.logger.log_query(QueryLogRecord::failed(
                &request.start_address,
                &request.end_address,
                e.to_string(),
            ));
            Err(ApiError::from(e))
        }
    }
}
