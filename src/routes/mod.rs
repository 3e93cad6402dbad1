// Route exports
pub mod matches;
pub mod rounds;

use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::MatchingError;
use crate::models::ErrorResponse;
use crate::services::MatchingService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchingService>,
}

impl AppState {
    pub fn new(service: MatchingService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(rounds::configure)
            .configure(matches::configure),
    );
}

/// Translate a core error into a JSON response
pub fn error_response(err: &MatchingError) -> HttpResponse {
    let (status, error) = match err {
        MatchingError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        MatchingError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
        MatchingError::CapacityExceeded { .. } => (StatusCode::CONFLICT, "capacity_exceeded"),
        MatchingError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
        MatchingError::AlgorithmExecution { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "algorithm_execution_failed")
        }
        MatchingError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository_error"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, MatchingError> {
    Uuid::parse_str(raw).map_err(|_| MatchingError::validation(format!("invalid {} id: {}", entity, raw)))
}

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}
