use axum::{extract::State, Json};
use serde_json::json;

use crate::{error::Result, models::ApiResponse};

use super::AppState;

/// GET /api/v1/health
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let db_healthy = state.db.is_available().await;

    let mut redis = state.redis.clone();
    let redis_healthy = redis::cmd("PING")
        .query_async::<String>(&mut redis)
        .await
        .is_ok();

    let status = if db_healthy && redis_healthy {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(ApiResponse::success(json!({
        "status": status,
        "database": db_healthy,
        "redis": redis_healthy,
        "version": env!("CARGO_PKG_VERSION"),
    }))))
}
