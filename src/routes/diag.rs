//! Diagnostic endpoints. Presence checks only: credential *values* are
//! never echoed back.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub async fn credentials(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;

    let credentials_file_present = config
        .drive_credentials_path
        .as_deref()
        .map(|p| std::path::Path::new(p).exists())
        .unwrap_or(false);

    Json(json!({
        "ok": true,
        "backend": config.storage_backend,
        "s3": {
            "endpoint": config.s3_endpoint.is_some(),
            "region": config.s3_region.is_some(),
            "bucket": config.s3_bucket.is_some(),
            "accessKey": config.s3_access_key.is_some(),
            "secretKey": config.s3_secret_key.is_some(),
        },
        "drive": {
            "credentialsFile": credentials_file_present,
            "rootFolderId": config.drive_root_folder_id.is_some(),
            "rootFolderName": config.drive_root_folder_name,
        },
    }))
}

pub async fn storage(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let storage = state.storage().await?;
    storage.check_access().await?;

    Ok(Json(json!({
        "ok": true,
        "backend": storage.kind(),
    })))
}
