use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{
    AlgorithmType, CreateRoundRequest, ErrorResponse, PageQuery, RunMatchingRequest,
    StatisticsQuery,
};
use crate::routes::{error_response, parse_id, AppState};

/// Configure round and statistics routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/rounds", web::post().to(create_round))
        .route("/rounds", web::get().to(list_rounds))
        .route("/rounds/{id}", web::get().to(get_round))
        .route("/rounds/{id}/run", web::post().to(run_matching))
        .route("/rounds/{id}/matches", web::get().to(round_matches))
        .route("/statistics", web::get().to(statistics));
}

/// Create a matching round
///
/// POST /api/v1/rounds
///
/// Request body:
/// ```json
/// {
///   "name": "Spring 2025",
///   "algorithmType": "weighted_preference|preference_priority",
///   "settings": { "area_weight": 0.35, "statement_weight": 0.25 }
/// }
/// ```
async fn create_round(
    state: web::Data<AppState>,
    req: web::Json<CreateRoundRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    let algorithm_type = match req.algorithm_type.as_deref().map(str::parse::<AlgorithmType>) {
        Some(Ok(algorithm)) => Some(algorithm),
        Some(Err(err)) => return error_response(&err),
        None => None,
    };

    match state
        .service
        .create_round(&req.name, req.description, algorithm_type, req.settings)
    {
        Ok(round) => HttpResponse::Created().json(round),
        Err(err) => error_response(&err),
    }
}

/// GET /api/v1/rounds?limit=&offset=
async fn list_rounds(state: web::Data<AppState>, query: web::Query<PageQuery>) -> impl Responder {
    match state.service.list_rounds(query.limit, query.offset) {
        Ok(rounds) => HttpResponse::Ok().json(rounds),
        Err(err) => error_response(&err),
    }
}

async fn get_round(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let result = parse_id(&path, "round").and_then(|id| state.service.get_round(id));
    match result {
        Ok(round) => HttpResponse::Ok().json(round),
        Err(err) => error_response(&err),
    }
}

/// Execute a round
///
/// POST /api/v1/rounds/{id}/run
///
/// The body is optional; `{"userId": "..."}` records who started the round.
/// Running a completed round returns it unchanged.
async fn run_matching(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: Option<web::Json<RunMatchingRequest>>,
) -> impl Responder {
    let round_id = match parse_id(&path, "round") {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    let initiated_by = req.and_then(|body| body.into_inner().user_id);

    tracing::info!("Run requested for round {}", round_id);

    let service = state.service.clone();
    match web::block(move || service.run_matching(round_id, initiated_by)).await {
        Ok(Ok(round)) => HttpResponse::Ok().json(round),
        Ok(Err(err)) => error_response(&err),
        Err(e) => {
            tracing::error!("Matching worker failed for round {}: {}", round_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "worker_failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

async fn round_matches(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let result = parse_id(&path, "round").and_then(|id| state.service.matches_for_round(id));
    match result {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(err) => error_response(&err),
    }
}

/// GET /api/v1/statistics?roundId={roundId}
async fn statistics(state: web::Data<AppState>, query: web::Query<StatisticsQuery>) -> impl Responder {
    let round_id = match query.round_id.as_deref().map(|raw| parse_id(raw, "round")) {
        Some(Ok(id)) => Some(id),
        Some(Err(err)) => return error_response(&err),
        None => None,
    };

    match state.service.get_matching_statistics(round_id) {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(err) => error_response(&err),
    }
}
