// src/api/notifications.rs

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    error::Result,
    models::{ApiResponse, Notification, PaginatedResponse},
    utils::ensure_page_limit,
};

use super::{require_user, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// GET /api/v1/notifications/list
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Notification>>>> {
    let user_address = require_user(&headers, &state).await?;

    ensure_page_limit(query.limit)?;
    let page = query.page.max(1);
    let limit = query.limit;
    let offset = (page - 1) as i64 * limit as i64;

    let items = state
        .db
        .get_user_notifications(&user_address, limit as i64, offset)
        .await?;
    let total = state.db.count_user_notifications(&user_address).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        page: page as i32,
        limit: limit as i32,
        total,
    })))
}
