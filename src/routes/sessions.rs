use super::{validate_body, AppState};
use crate::error::ExchangeError;
use crate::models::{
    ListReviewsResponse, ListSessionsResponse, MarkReadResponse, MessageView, ParticipantRequest,
    ReactRequest, ReviewCompanionRequest, SubmitMessageRequest, SubmitMessageResponse, ViewerQuery,
};
use actix_web::{web, HttpResponse};
use uuid::Uuid;

/// Configure exchange session and message routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/sessions", web::get().to(list_sessions))
        .route("/sessions/{id}", web::get().to(get_session_view))
        .route("/sessions/{id}/messages", web::post().to(submit_message))
        .route("/sessions/{id}/advance", web::post().to(advance_phase))
        .route("/sessions/{id}/skip", web::post().to(skip_final_phase))
        .route("/sessions/{id}/abandon", web::post().to(abandon_session))
        .service(
            web::resource("/sessions/{id}/reviews")
                .route(web::post().to(review_companion))
                .route(web::get().to(list_reviews)),
        )
        .route("/messages/{id}/reactions", web::post().to(react))
        .route("/messages/{id}/read", web::post().to(mark_read));
}

/// GET /api/v1/sessions?userId=...
async fn list_sessions(
    state: web::Data<AppState>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*query)?;
    let sessions = state.exchanges.list_sessions(&query.user_id).await?;
    let stats = state.exchanges.stats(&query.user_id).await?;
    Ok(HttpResponse::Ok().json(ListSessionsResponse { sessions, stats }))
}

/// GET /api/v1/sessions/{id}?userId=...
///
/// Counterpart identity is redacted according to the current phase.
async fn get_session_view(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*query)?;
    let view = state
        .exchanges
        .get_session_view(path.into_inner(), &query.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Submit a message to the current phase
///
/// POST /api/v1/sessions/{id}/messages
///
/// Request body:
/// ```json
/// { "userId": "string", "content": "string", "emotionTags": ["awe"] }
/// ```
async fn submit_message(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<SubmitMessageRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let submission = state
        .exchanges
        .submit_message(path.into_inner(), &req.user_id, &req.content, &req.emotion_tags)
        .await?;

    Ok(HttpResponse::Created().json(SubmitMessageResponse {
        message: MessageView::from_message(&submission.message, &req.user_id),
        authoritative: submission.outcome.authoritative,
        current_phase: submission.session.current_phase,
        session_status: submission.session.status,
    }))
}

async fn advance_phase(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ParticipantRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let session_id = path.into_inner();
    state.exchanges.advance_phase(session_id, &req.user_id).await?;
    let view = state.exchanges.get_session_view(session_id, &req.user_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn skip_final_phase(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ParticipantRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let session_id = path.into_inner();
    state.exchanges.skip_final_phase(session_id, &req.user_id).await?;
    let view = state.exchanges.get_session_view(session_id, &req.user_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn abandon_session(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ParticipantRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let session = state
        .exchanges
        .abandon_session(path.into_inner(), &req.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "sessionId": session.id,
        "status": session.status,
        "endedAt": session.ended_at,
    })))
}

/// Review the counterpart of a completed session
///
/// POST /api/v1/sessions/{id}/reviews
///
/// Request body:
/// ```json
/// { "userId": "string", "rating": 5, "tags": ["punctual"], "note": "string" }
/// ```
async fn review_companion(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ReviewCompanionRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let review = state
        .exchanges
        .review_companion(
            path.into_inner(),
            &req.user_id,
            req.rating,
            &req.tags,
            req.note.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Created().json(review))
}

async fn list_reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*query)?;
    let reviews = state
        .exchanges
        .list_reviews(path.into_inner(), &query.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(ListReviewsResponse {
        total: reviews.len(),
        reviews,
    }))
}

async fn react(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ReactRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let message = state
        .exchanges
        .react(path.into_inner(), &req.user_id, req.reaction)
        .await?;
    Ok(HttpResponse::Ok().json(MessageView::from_message(&message, &req.user_id)))
}

async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ParticipantRequest>,
) -> Result<HttpResponse, ExchangeError> {
    validate_body(&*req)?;
    let updated = state.exchanges.mark_read(path.into_inner(), &req.user_id).await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { updated }))
}
