use super::{validate_body, AppState};
use crate::error::ExchangeError;
use crate::models::{
    AttemptMatchRequest, AttemptMatchResponse, CancelRequestRequest, HealthResponse,
    HostRequestsQuery, ListRequestsResponse, OpenRequestRequest, RankCandidatesRequest, RankCandidatesResponse,
    ScorePreviewRequest,
};
use actix_web::{web, HttpResponse};
use uuid::Uuid;

/// Configure health, companion request and compatibility routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/compatibility", web::post().to(score_preview))
        .route("/requests", web::post().to(open_request))
        .route("/requests/{id}", web::get().to(get_request))
        .route("/requests/{id}/cancel", web::post().to(cancel_request))
        .route("/requests/{id}/match", web::post().to(attempt_match))
        .route("/requests/{id}/candidates", web::post().to(rank_candidates))
        .route(
            "/exhibitions/{exhibition_id}/requests",
            web::get().to(list_open_requests),
        )
        .route("/users/{user_id}/requests", web::get().to(list_my_requests));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let status = match state.store.health_check().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            "degraded"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.backend().to_string(),
        compatibility_cache: state.scores.stats(),
        timestamp: chrono::Utc::now(),
    })
}

/// Compatibility preview
///
/// POST /api/v1/compatibility
///
/// Request body:
/// ```json
/// { "a": "LAEF", "b": "SRMC" }
/// ```
async fn score_preview(
    state: web::Data<AppState>,
    req: web::Json<ScorePreviewRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let result = state.pool.preview(&req.a, &req.b).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Open a companion request
///
/// POST /api/v1/requests
///
/// Request body:
/// ```json
/// {
///   "hostUserId": "string",
///   "exhibitionId": "string",
///   "artworkId": "string",
///   "preferredDate": "2026-10-17",
///   "timeSlot": "afternoon",
///   "allowedArchetypes": ["LAEF"],
///   "minCompatibility": 60
/// }
/// ```
async fn open_request(
    state: web::Data<AppState>,
    req: web::Json<OpenRequestRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let request = state.pool.open_request(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(request))
}

async fn get_request(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ExchangeError> {
    let request = state.pool.get_request(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// GET /api/v1/exhibitions/{exhibition_id}/requests
async fn list_open_requests(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ExchangeError> {
    let requests = state.pool.list_open_requests(&path).await?;
    Ok(HttpResponse::Ok().json(ListRequestsResponse {
        total: requests.len(),
        requests,
    }))
}

/// A host's own requests, any status unless filtered
///
/// GET /api/v1/users/{user_id}/requests?status=matched
async fn list_my_requests(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HostRequestsQuery>,
) -> Result<HttpResponse, ExchangeError> {
    let requests = state.pool.list_my_requests(&path, query.status).await?;
    Ok(HttpResponse::Ok().json(ListRequestsResponse {
        total: requests.len(),
        requests,
    }))
}

async fn cancel_request(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<CancelRequestRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let request = state.pool.cancel_request(path.into_inner(), &req.user_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Attempt a match
///
/// POST /api/v1/requests/{id}/match
///
/// Request body:
/// ```json
/// { "candidateUserId": "string" }
/// ```
async fn attempt_match(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<AttemptMatchRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let (request, session) = state
        .pool
        .attempt_match(path.into_inner(), &req.candidate_user_id)
        .await?;
    Ok(HttpResponse::Created().json(AttemptMatchResponse { request, session }))
}

async fn rank_candidates(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<RankCandidatesRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let result = state
        .pool
        .rank_candidates(path.into_inner(), &req.candidate_user_ids, req.limit)
        .await?;

    tracing::debug!(
        "Ranked {} of {} candidates",
        result.candidates.len(),
        result.total_candidates
    );

    Ok(HttpResponse::Ok().json(RankCandidatesResponse {
        candidates: result.candidates,
        total_candidates: result.total_candidates,
    }))
}
