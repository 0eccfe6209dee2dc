use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::upload::UploadRequest;
use crate::services::upload_service;
use crate::state::AppState;

pub async fn upload_comprovante(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Value>, AppError> {
    let stored = upload_service::store_comprovante(&state, req).await?;

    Ok(Json(json!({
        "ok": true,
        "key": stored.key,
        "id": stored.id,
        "url": stored.url,
        "size": stored.size,
    })))
}
