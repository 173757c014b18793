use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use artmate::config::Settings;
use artmate::core::{Clock, Matcher, SystemClock};
use artmate::routes::{self, AppState};
use artmate::services::{
    spawn_reaper, AppwriteClient, AppwriteCollections, ArtworkCatalog, CompatibilityCache,
    ExchangeService, ExchangeStore, LogNotifier, MatchingPool, MemoryStore, Notifier, PgStore,
    ProfileDirectory, StaticDirectory, WebhookNotifier,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

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
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path segment errors, e.g. malformed ids
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn other_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        other_error(e)
    })?;

    init_tracing(&settings.logging.level, &settings.logging.format);
    info!("Starting Artmate exchange service...");

    let pool_settings = settings.matching.to_pool_settings().map_err(|e| {
        error!("Invalid matching configuration: {}", e);
        other_error(e)
    })?;
    let exchange_rules = settings.exchange.to_rules();

    // Storage: PostgreSQL when configured, otherwise in memory
    let store: Arc<dyn ExchangeStore> = match settings.database.url.as_deref() {
        Some(url) => {
            let store = PgStore::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                other_error(e)
            })?;
            info!("PostgreSQL store initialized");
            Arc::new(store)
        }
        None => {
            warn!("No database configured, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // Profile directory and artwork catalog
    let (profiles, artworks): (Arc<dyn ProfileDirectory>, Arc<dyn ArtworkCatalog>) =
        match settings.collaborators.endpoint.clone() {
            Some(endpoint) => {
                let client = Arc::new(
                    AppwriteClient::new(
                        endpoint,
                        settings.collaborators.api_key.clone(),
                        settings.collaborators.project_id.clone(),
                        settings.collaborators.database_id.clone(),
                        AppwriteCollections {
                            profiles: settings.collaborators.profiles_collection.clone(),
                            artworks: settings.collaborators.artworks_collection.clone(),
                        },
                    )
                    .map_err(other_error)?,
                );
                info!("Appwrite client initialized");
                (client.clone() as Arc<dyn ProfileDirectory>, client as Arc<dyn ArtworkCatalog>)
            }
            None => {
                warn!("No collaborator endpoint configured, using an empty static directory");
                let directory = Arc::new(StaticDirectory::new());
                (directory.clone() as Arc<dyn ProfileDirectory>, directory as Arc<dyn ArtworkCatalog>)
            }
        };

    let notifier: Arc<dyn Notifier> = match settings.collaborators.notify_url.clone() {
        Some(url) => Arc::new(WebhookNotifier::new(url).map_err(other_error)?),
        None => Arc::new(LogNotifier),
    };

    let weights = settings.scoring.to_weights();
    info!("Matcher initialized with weights: {:?}", weights);

    let cache_capacity = settings.cache.compatibility_capacity.unwrap_or(1024);
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(3600);
    let scores = Arc::new(CompatibilityCache::new(Matcher::new(weights), cache_capacity, cache_ttl));
    info!("Compatibility cache initialized ({} entries, TTL: {}s)", cache_capacity, cache_ttl);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let pool = Arc::new(MatchingPool::new(
        store.clone(),
        profiles.clone(),
        artworks.clone(),
        notifier.clone(),
        scores.clone(),
        clock.clone(),
        pool_settings,
        exchange_rules,
    ));

    let exchanges = Arc::new(ExchangeService::new(
        store.clone(),
        profiles,
        artworks,
        notifier,
        clock,
        exchange_rules,
    ));

    if let Some(secs) = settings.exchange.sweep_interval_secs {
        spawn_reaper(pool.clone(), exchanges.clone(), std::time::Duration::from_secs(secs));
        info!("Expiry sweep running every {}s", secs);
    }

    let app_state = AppState {
        pool,
        exchanges,
        store,
        scores,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
