use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{ErrorResponse, HealthResponse, MatchStatus, UpdateMatchStatusRequest};
use crate::routes::{error_response, parse_id, AppState};

/// Configure health and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/{id}", web::get().to(get_match))
        .route("/matches/{id}/status", web::post().to(update_match_status))
        .route("/students/{id}/matches", web::get().to(student_matches))
        .route("/organizations/{id}/matches", web::get().to(organization_matches));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn get_match(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let result = parse_id(&path, "match").and_then(|id| state.service.get_match(id));
    match result {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(err) => error_response(&err),
    }
}

/// Move a match through the approval workflow
///
/// POST /api/v1/matches/{id}/status
///
/// Request body:
/// ```json
/// {
///   "status": "ACCEPTED|REJECTED|CONFIRMED",
///   "approverId": "string",
///   "notes": "string"
/// }
/// ```
async fn update_match_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<UpdateMatchStatusRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    let result = parse_id(&path, "match").and_then(|match_id| {
        let status: MatchStatus = req.status.parse()?;
        state
            .service
            .update_match_status(match_id, status, req.approver_id, req.notes)
    });

    match result {
        Ok(record) => {
            tracing::info!("Match {} moved to {}", record.id, record.status);
            HttpResponse::Ok().json(record)
        }
        Err(err) => error_response(&err),
    }
}

async fn student_matches(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.service.matches_for_student(&path) {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(err) => error_response(&err),
    }
}

async fn organization_matches(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.service.matches_for_organization(&path) {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    use crate::services::{InMemoryStore, MatchingDefaults, MatchingService, Repositories};
    use std::sync::Arc;

    fn state() -> AppState {
        let store = Arc::new(InMemoryStore::new());
        AppState::new(MatchingService::new(
            Repositories::from_store(store),
            MatchingDefaults::default(),
        ))
    }

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.status, "healthy");
    }

    #[actix_web::test]
    async fn test_unknown_match_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let uri = format!("/api/v1/matches/{}", uuid::Uuid::new_v4());
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status().as_u16(), 404);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/v1/matches/not-a-uuid").to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 400);
    }
}
