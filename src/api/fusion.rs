// src/api/fusion.rs

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use redis::AsyncCommands;

use crate::{
    constants::{DECRYPT_MESSAGE_TEMPLATE, DECRYPT_WINDOW_SECS},
    crypto::{cipher, signature::SignatureVerifier},
    error::{AppError, Result},
    models::{
        ApiResponse, DecryptPrepareResponse, DecryptRequest, DecryptResponse, FuseRequest,
        FuseResponse, FusionRecord,
    },
};

use super::{require_user, AppState};

// ==================== HANDLERS ====================

/// POST /api/v1/fusion/fuse
pub async fn fuse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FuseRequest>,
) -> Result<Json<ApiResponse<FuseResponse>>> {
    let user_address = require_user(&headers, &state).await?;

    if req.input_nft_a.is_empty() || req.input_nft_b.is_empty() {
        return Err(AppError::BadRequest(
            "Both input NFTs are required".to_string(),
        ));
    }

    let record = state
        .fusion
        .fuse(&user_address, &req.input_nft_a, &req.input_nft_b)
        .await?;

    state
        .db
        .create_notification(
            &user_address,
            "fusion.created",
            "Fusion complete",
            &format!("{} is ready", record.output.name),
            Some(serde_json::json!({ "record_id": record.id })),
        )
        .await?;

    tracing::info!(
        record_id = %record.id,
        owner = %user_address,
        "Fusion record stored"
    );

    Ok(Json(ApiResponse::success(FuseResponse { record })))
}

/// GET /api/v1/fusion/records
pub async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<FusionRecord>>>> {
    require_user(&headers, &state).await?;

    let records = state.fusion.load_records().await?;
    Ok(Json(ApiResponse::success(records)))
}

/// GET /api/v1/fusion/records/{id}
pub async fn get_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FusionRecord>>> {
    require_user(&headers, &state).await?;

    let record = state
        .fusion
        .get_record(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fusion record {} not found", id)))?;

    Ok(Json(ApiResponse::success(record)))
}

/// POST /api/v1/fusion/decrypt/prepare
pub async fn prepare_decrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<DecryptPrepareResponse>>> {
    let user_address = require_user(&headers, &state).await?;

    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let message = DECRYPT_MESSAGE_TEMPLATE
        .replace("{public_key}", &nonce)
        .replace("{contract}", &state.config.storage_contract_address)
        .replace("{chain_id}", &state.config.chain_id.to_string())
        .replace("{window}", &DECRYPT_WINDOW_SECS.to_string());

    let mut redis = state.redis.clone();
    let key = format!("decrypt:{}:{}", user_address, nonce);
    let _: () = redis.set_ex(&key, &message, DECRYPT_WINDOW_SECS).await?;

    Ok(Json(ApiResponse::success(DecryptPrepareResponse {
        nonce,
        message,
        expires_in: DECRYPT_WINDOW_SECS,
    })))
}

/// POST /api/v1/fusion/decrypt
pub async fn decrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DecryptRequest>,
) -> Result<Json<ApiResponse<DecryptResponse>>> {
    let user_address = require_user(&headers, &state).await?;

    // One-shot nonce: consumed on first use, gone after the window.
    let mut redis = state.redis.clone();
    let key = format!("decrypt:{}:{}", user_address, req.nonce);
    let message: Option<String> = redis.get_del(&key).await?;
    let message = message
        .ok_or_else(|| AppError::AuthError("Decrypt session expired or unknown".to_string()))?;

    let is_valid = SignatureVerifier::verify_signature(&user_address, &message, &req.signature)?;
    if !is_valid {
        return Err(AppError::InvalidSignature);
    }

    let record = state
        .fusion
        .get_record(&req.record_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fusion record {} not found", req.record_id)))?;

    let attributes = cipher::decrypt_attributes(&record.output.encrypted_attributes);

    Ok(Json(ApiResponse::success(DecryptResponse {
        record_id: record.id,
        attributes,
    })))
}
