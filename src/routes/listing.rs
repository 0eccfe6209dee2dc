use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::upload::ListQuery;
use crate::services::listing_service;
use crate::state::AppState;

/// Query form: `GET /list?userId=42&month=2025-08`.
pub async fn list_query(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = query
        .user_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("userId is required".into()))?;
    let month = query
        .month
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("month is required".into()))?;
    list(&state, user_id, month).await
}

/// Path form: `GET /lista/42/2025-08`.
pub async fn list_path(
    State(state): State<AppState>,
    Path((user_id, month)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    list(&state, &user_id, &month).await
}

async fn list(state: &AppState, user_id: &str, month: &str) -> Result<Json<Value>, AppError> {
    let items = listing_service::list_comprovantes(state, user_id, month).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}
