use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Vault conditions. Each is a fatal abort of the current ledger call;
    // no partial state is committed and the caller must resubmit.
    #[error("Caller is not the vault owner")]
    NotOwner,

    #[error("Caller is not a registered provider")]
    NotProvider,

    #[error("Vault is paused")]
    Paused,

    #[error("Cooldown active, retry in {0}s")]
    CooldownActive(i64),

    #[error("Batch is closed")]
    BatchClosed,

    #[error("Invalid batch")]
    InvalidBatch,

    #[error("Batch needs at least two submitted NFTs")]
    NotEnoughNFTs,

    #[error("Invalid NFT ciphertexts")]
    InvalidNFT,

    #[error("Request already processed")]
    ReplayAttempt,

    #[error("Batch state changed since the decryption request")]
    StateMismatch,

    #[error("Invalid decryption proof")]
    InvalidProof,

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Database(ref e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                e.to_string(),
            ),
            AppError::Redis(ref e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CACHE_ERROR",
                e.to_string(),
            ),
            AppError::AuthError(ref msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone()),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "INVALID_SIGNATURE",
                "Signature verification failed".to_string(),
            ),
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests. Please try again later.".to_string(),
            ),
            AppError::NotOwner => (
                StatusCode::FORBIDDEN,
                "NOT_OWNER",
                "Caller is not the vault owner".to_string(),
            ),
            AppError::NotProvider => (
                StatusCode::FORBIDDEN,
                "NOT_PROVIDER",
                "Caller is not a registered provider".to_string(),
            ),
            AppError::Paused => (
                StatusCode::CONFLICT,
                "PAUSED",
                "Vault is paused".to_string(),
            ),
            AppError::CooldownActive(secs) => (
                StatusCode::TOO_MANY_REQUESTS,
                "COOLDOWN_ACTIVE",
                format!("Cooldown active, retry in {}s", secs),
            ),
            AppError::BatchClosed => (
                StatusCode::CONFLICT,
                "BATCH_CLOSED",
                "Batch is closed".to_string(),
            ),
            AppError::InvalidBatch => (
                StatusCode::BAD_REQUEST,
                "INVALID_BATCH",
                "Invalid batch".to_string(),
            ),
            AppError::NotEnoughNFTs => (
                StatusCode::BAD_REQUEST,
                "NOT_ENOUGH_NFTS",
                "Batch needs at least two submitted NFTs".to_string(),
            ),
            AppError::InvalidNFT => (
                StatusCode::BAD_REQUEST,
                "INVALID_NFT",
                "Invalid NFT ciphertexts".to_string(),
            ),
            AppError::ReplayAttempt => (
                StatusCode::CONFLICT,
                "REPLAY_ATTEMPT",
                "Request already processed".to_string(),
            ),
            AppError::StateMismatch => (
                StatusCode::CONFLICT,
                "STATE_MISMATCH",
                "Batch state changed since the decryption request".to_string(),
            ),
            AppError::InvalidProof => (
                StatusCode::UNAUTHORIZED,
                "INVALID_PROOF",
                "Invalid decryption proof".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
