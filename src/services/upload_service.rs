use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use crate::error::AppError;
use crate::keys::{self, ReceiptKey};
use crate::models::object::StoredObject;
use crate::models::upload::UploadRequest;
use crate::state::AppState;

const DEFAULT_MIME: &str = "application/octet-stream";

/// Validate the payload, derive the key and hand the bytes to the
/// backend. Every rejection happens before the backend is touched, so a
/// bad request never costs a network call.
pub async fn store_comprovante(
    state: &AppState,
    req: UploadRequest,
) -> Result<StoredObject, AppError> {
    let user_id = req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("userId is required".into()))?;

    let date = req
        .date
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("date is required".into()))?;
    if !keys::is_valid_date(date) {
        return Err(AppError::BadRequest("date must be YYYY-MM-DD".into()));
    }

    let encoded = req
        .file_base64
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("fileBase64 is required".into()))?;
    let data = BASE64
        .decode(encoded.trim())
        .map_err(|_| AppError::BadRequest("fileBase64 is not valid base64".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("decoded payload is empty".into()));
    }

    // The raw mime (possibly absent) feeds key derivation, so an omitted
    // type gets the `bin` extension; the default only applies to the
    // content type sent to the backend.
    let mime_raw = req
        .mime_type
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let mime_type = mime_raw.unwrap_or(DEFAULT_MIME);

    let key = ReceiptKey::derive(user_id, date, req.descricao.as_deref(), mime_raw);
    if key.user_id.is_empty() {
        return Err(AppError::BadRequest(
            "userId contains no usable characters".into(),
        ));
    }

    let storage = state.storage().await?;
    let stored = storage.store(&key, Bytes::from(data), mime_type).await?;

    tracing::info!(
        user_id = %key.user_id,
        key = %stored.key,
        size = stored.size,
        backend = storage.kind(),
        "Comprovante stored"
    );

    Ok(stored)
}
