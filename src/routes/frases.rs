use axum::extract::Path;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::frases;

pub async fn frase(Path(tag): Path<String>) -> Result<Json<Value>, AppError> {
    let frase = frases::pick(&tag)
        .ok_or_else(|| AppError::NotFound(format!("no frases for tag {:?}", tag)))?;

    Ok(Json(json!({
        "ok": true,
        "tag": tag,
        "frase": frase,
    })))
}
