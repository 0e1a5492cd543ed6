use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::signature::SignatureVerifier,
    error::{AppError, Result},
    models::ApiResponse,
};

use super::AppState;

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct ConnectWalletRequest {
    pub address: String,
    pub signature: String,
    pub message: String,
    pub chain_id: u64,
}

#[derive(Debug, Serialize)]
pub struct ConnectWalletResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub address: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user address
    pub exp: usize,  // expiry
    pub iat: usize,  // issued at
}

// ==================== HANDLERS ====================

/// POST /api/v1/auth/connect
pub async fn connect_wallet(
    State(state): State<AppState>,
    Json(req): Json<ConnectWalletRequest>,
) -> Result<Json<ApiResponse<ConnectWalletResponse>>> {
    if req.chain_id != state.config.chain_id {
        return Err(AppError::BadRequest(format!(
            "Wrong chain id {}, expected {}",
            req.chain_id, state.config.chain_id
        )));
    }
    verify_signature(&req.address, &req.message, &req.signature)?;

    state.db.create_user(&req.address).await?;
    let user = state
        .db
        .get_user(&req.address)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    state.db.update_last_active(&req.address).await?;

    let token = generate_jwt_token(
        &req.address,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;
    let expires_in = state.config.jwt_expiry_hours * 3600;

    Ok(Json(ApiResponse::success(ConnectWalletResponse {
        token,
        expires_in: expires_in as i64,
        user: UserInfo {
            address: user.address,
            created_at: user.created_at,
        },
    })))
}

/// POST /api/v1/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<ConnectWalletResponse>>> {
    let user_address = extract_user_from_token(&req.refresh_token, &state.config.jwt_secret).await?;

    let user = state
        .db
        .get_user(&user_address)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let new_token = generate_jwt_token(
        &user_address,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;
    let expires_in = state.config.jwt_expiry_hours * 3600;

    Ok(Json(ApiResponse::success(ConnectWalletResponse {
        token: new_token,
        expires_in: expires_in as i64,
        user: UserInfo {
            address: user.address,
            created_at: user.created_at,
        },
    })))
}

// ==================== HELPER FUNCTIONS ====================

fn verify_signature(address: &str, message: &str, signature: &str) -> Result<()> {
    tracing::debug!("Initiating signature verification for {}", address);

    let is_valid = SignatureVerifier::verify_signature(address, message, signature)?;
    if !is_valid {
        return Err(AppError::InvalidSignature);
    }

    Ok(())
}

fn generate_jwt_token(address: &str, secret: &str, expiry_hours: u64) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(expiry_hours as i64))
        .ok_or_else(|| AppError::Internal("Token expiry overflow".to_string()))?
        .timestamp();

    let claims = Claims {
        sub: address.to_string(),
        exp: expiration as usize,
        iat: Utc::now().timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok(token)
}

pub async fn extract_user_from_token(token: &str, secret: &str) -> Result<String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid or expired token".to_string()))?;

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_round_trip_preserves_subject() {
        let token = generate_jwt_token("0xabc", "secret", 1).unwrap();
        let subject = extract_user_from_token(&token, "secret").await.unwrap();
        assert_eq!(subject, "0xabc");
    }

    #[tokio::test]
    async fn wrong_secret_rejects_token() {
        let token = generate_jwt_token("0xabc", "secret", 1).unwrap();
        let result = extract_user_from_token(&token, "other").await;
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }
}
