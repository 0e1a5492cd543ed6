// src/api/vault.rs

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::{ApiResponse, BatchRequest, ProviderRequest, RequestFusionResponse, SubmitNftRequest},
    services::fusion_vault::{BatchView, RequestView, VaultStatus},
};

use super::{require_user, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct EncryptTripleRequest {
    pub attack: u64,
    pub defense: u64,
    pub speed: u64,
}

#[derive(Debug, Serialize)]
pub struct EncryptTripleResponse {
    pub ciphertexts: [String; 3],
}

#[derive(Debug, Serialize)]
pub struct SubmitNftResponse {
    pub batch_id: u64,
    pub entries: usize,
}

// ==================== OWNER OPS ====================

/// POST /api/v1/vault/batches
pub async fn open_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<BatchView>>> {
    let caller = require_user(&headers, &state).await?;
    let batch_id = state.vault.open_batch(&caller)?;
    Ok(Json(ApiResponse::success(state.vault.get_batch(batch_id)?)))
}

/// POST /api/v1/vault/batches/{id}/close
pub async fn close_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(batch_id): Path<u64>,
) -> Result<Json<ApiResponse<BatchView>>> {
    let caller = require_user(&headers, &state).await?;
    state.vault.close_batch(&caller, batch_id)?;
    Ok(Json(ApiResponse::success(state.vault.get_batch(batch_id)?)))
}

/// POST /api/v1/vault/providers
pub async fn add_provider(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProviderRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let caller = require_user(&headers, &state).await?;
    state.vault.add_provider(&caller, &req.provider)?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "provider": req.provider,
        "active": true,
    }))))
}

/// DELETE /api/v1/vault/providers/{address}
pub async fn remove_provider(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let caller = require_user(&headers, &state).await?;
    state.vault.remove_provider(&caller, &address)?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "provider": address,
        "active": false,
    }))))
}

/// POST /api/v1/vault/pause
pub async fn pause(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<VaultStatus>>> {
    let caller = require_user(&headers, &state).await?;
    state.vault.pause(&caller)?;
    Ok(Json(ApiResponse::success(state.vault.status())))
}

/// POST /api/v1/vault/unpause
pub async fn unpause(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<VaultStatus>>> {
    let caller = require_user(&headers, &state).await?;
    state.vault.unpause(&caller)?;
    Ok(Json(ApiResponse::success(state.vault.status())))
}

// ==================== PROVIDER OPS ====================

/// POST /api/v1/vault/encrypt
///
/// Convenience endpoint so providers can obtain ciphertext handles
/// without running the coprocessor client themselves.
pub async fn encrypt_triple(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EncryptTripleRequest>,
) -> Result<Json<ApiResponse<EncryptTripleResponse>>> {
    require_user(&headers, &state).await?;
    let ciphertexts = [
        state.engine.encrypt(req.attack),
        state.engine.encrypt(req.defense),
        state.engine.encrypt(req.speed),
    ];
    Ok(Json(ApiResponse::success(EncryptTripleResponse {
        ciphertexts,
    })))
}

/// POST /api/v1/vault/submissions
pub async fn submit_nft(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitNftRequest>,
) -> Result<Json<ApiResponse<SubmitNftResponse>>> {
    let caller = require_user(&headers, &state).await?;
    let entries = state
        .vault
        .submit_nft(&caller, req.batch_id, req.ciphertexts)?;
    Ok(Json(ApiResponse::success(SubmitNftResponse {
        batch_id: req.batch_id,
        entries,
    })))
}

/// POST /api/v1/vault/fusions
pub async fn request_fusion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchRequest>,
) -> Result<Json<ApiResponse<RequestFusionResponse>>> {
    let caller = require_user(&headers, &state).await?;
    let request = state.vault.request_fusion(&caller, req.batch_id)?;

    tracing::info!(
        request_id = request.request_id,
        batch_id = request.batch_id,
        "Fusion request queued for decryption"
    );

    Ok(Json(ApiResponse::success(RequestFusionResponse {
        request_id: request.request_id,
        batch_id: request.batch_id,
        commitment: request.commitment,
    })))
}

// ==================== READ SURFACE ====================

/// GET /api/v1/vault/batches/{id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<u64>,
) -> Result<Json<ApiResponse<BatchView>>> {
    Ok(Json(ApiResponse::success(state.vault.get_batch(batch_id)?)))
}

/// GET /api/v1/vault/requests/{id}
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<u64>,
) -> Result<Json<ApiResponse<RequestView>>> {
    Ok(Json(ApiResponse::success(
        state.vault.get_request(request_id)?,
    )))
}

/// GET /api/v1/vault/status
pub async fn status(State(state): State<AppState>) -> Result<Json<ApiResponse<VaultStatus>>> {
    Ok(Json(ApiResponse::success(state.vault.status())))
}
