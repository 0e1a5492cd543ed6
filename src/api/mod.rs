// src/api/mod.rs
pub mod auth;
pub mod fusion;
pub mod health;
pub mod notifications;
pub mod vault;

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::services::{DecryptionOracle, FheEngine, FusionService, FusionVault};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub redis: redis::aio::ConnectionManager,
    pub config: Config,
    pub engine: Arc<FheEngine>,
    pub fusion: Arc<FusionService>,
    pub vault: Arc<FusionVault>,
    pub oracle: Arc<DecryptionOracle>,
}

pub async fn require_user(headers: &HeaderMap, state: &AppState) -> Result<String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("Missing Authorization header".to_string()))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid Authorization header".to_string()))?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthError("Invalid Authorization scheme".to_string()))?;

    let user_address = auth::extract_user_from_token(token, &state.config.jwt_secret).await?;
    state.db.create_user(&user_address).await?;
    state.db.update_last_active(&user_address).await?;
    Ok(user_address)
}
