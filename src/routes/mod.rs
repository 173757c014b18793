// Route exports
pub mod requests;
pub mod sessions;

use crate::error::ExchangeError;
use crate::services::{CompatibilityCache, ExchangeService, ExchangeStore, MatchingPool};
use actix_web::web;
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<MatchingPool>,
    pub exchanges: Arc<ExchangeService>,
    pub store: Arc<dyn ExchangeStore>,
    pub scores: Arc<CompatibilityCache>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(requests::configure)
            .configure(sessions::configure),
    );
}

/// Run `validator` rules on a request body
pub(crate) fn validate_body<T: Validate>(body: &T) -> Result<(), ExchangeError> {
    body.validate().map_err(|errors| {
        tracing::info!("Validation failed: field_errors={:?}", errors);
        ExchangeError::InvalidInput(errors.to_string())
    })
}
