// Route exports
pub mod route_weather;

pub use route_weather::{ApiError, AppState};

use actix_web::{error, web, HttpRequest, HttpResponse};
use crate::models::ErrorResponse;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(route_weather::configure),
    );
}

/// Handle JSON payload errors (malformed body, wrong content type, missing body)
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    let message = match err {
        error::JsonPayloadError::ContentType => "Request body must be JSON".to_string(),
        other => format!("Invalid JSON: {}", other),
    };
    ApiError::InvalidJson(message).into()
}

/// Fallback for unknown endpoints
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("Endpoint not found"))
}
