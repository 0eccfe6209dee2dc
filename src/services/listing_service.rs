use crate::error::AppError;
use crate::keys;
use crate::models::object::ObjectEntry;
use crate::state::AppState;

/// List a user's stored comprovantes for one month. The month selector
/// is validated before any backend call; the backend then scans the same
/// prefix an upload for that (user, month) would have produced.
pub async fn list_comprovantes(
    state: &AppState,
    user_id: &str,
    month: &str,
) -> Result<Vec<ObjectEntry>, AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::BadRequest("userId is required".into()));
    }
    if !keys::is_valid_month(month) {
        return Err(AppError::BadRequest("month must be YYYY-MM".into()));
    }

    let storage = state.storage().await?;
    let entries = storage.list(user_id, month).await?;

    tracing::debug!(
        user_id,
        month,
        count = entries.len(),
        backend = storage.kind(),
        "Listed comprovantes"
    );

    Ok(entries)
}
