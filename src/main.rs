use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod crypto;
mod db;
mod error;
mod models;
mod services;
mod utils;

use config::Config;
use constants::API_VERSION;
use db::Database;
use services::{DecryptionOracle, FheEngine, FusionService, FusionVault};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fusionlab_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting FusionLab Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    if config.is_testnet() {
        tracing::info!("Running against a test network");
    }

    // Initialize database
    let db = Database::new(&config).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db.run_migrations().await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let redis_manager = redis::aio::ConnectionManager::new(redis).await?;

    // FHE coprocessor, vault ledger and the oracle that bridges them
    let engine = Arc::new(FheEngine::new());
    let vault = Arc::new(FusionVault::new(
        engine.clone(),
        config.vault_address.clone(),
        config.vault_owner_address.clone(),
        config.oracle_signing_secret.clone(),
        config.submission_cooldown(),
        config.fusion_cooldown(),
    ));
    let oracle = Arc::new(DecryptionOracle::new(
        engine.clone(),
        vault.clone(),
        config.oracle_signing_secret.clone(),
    ));
    let fusion = Arc::new(FusionService::new(db.clone()));

    let app_state = api::AppState {
        db: db.clone(),
        redis: redis_manager,
        config: config.clone(),
        engine,
        fusion,
        vault,
        oracle: oracle.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(db.clone(), oracle));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Authentication
        .route("/api/v1/auth/connect", post(api::auth::connect_wallet))
        .route("/api/v1/auth/refresh", post(api::auth::refresh_token))
        // Client fusion flow
        .route("/api/v1/fusion/fuse", post(api::fusion::fuse))
        .route("/api/v1/fusion/records", get(api::fusion::list_records))
        .route("/api/v1/fusion/records/{id}", get(api::fusion::get_record))
        .route(
            "/api/v1/fusion/decrypt/prepare",
            post(api::fusion::prepare_decrypt),
        )
        .route("/api/v1/fusion/decrypt", post(api::fusion::decrypt))
        // Vault administration
        .route("/api/v1/vault/batches", post(api::vault::open_batch))
        .route(
            "/api/v1/vault/batches/{id}/close",
            post(api::vault::close_batch),
        )
        .route("/api/v1/vault/providers", post(api::vault::add_provider))
        .route(
            "/api/v1/vault/providers/{address}",
            delete(api::vault::remove_provider),
        )
        .route("/api/v1/vault/pause", post(api::vault::pause))
        .route("/api/v1/vault/unpause", post(api::vault::unpause))
        // Vault provider flow
        .route("/api/v1/vault/encrypt", post(api::vault::encrypt_triple))
        .route("/api/v1/vault/submissions", post(api::vault::submit_nft))
        .route("/api/v1/vault/fusions", post(api::vault::request_fusion))
        // Vault read surface
        .route("/api/v1/vault/batches/{id}", get(api::vault::get_batch))
        .route("/api/v1/vault/requests/{id}", get(api::vault::get_request))
        .route("/api/v1/vault/status", get(api::vault::status))
        // Notifications
        .route(
            "/api/v1/notifications/list",
            get(api::notifications::list_notifications),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
