use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a successful store: where the object lives and how to
/// retrieve it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub key: String,
    /// Backend-native identifier, when the backend has one (Drive file id).
    pub id: Option<String>,
    pub url: String,
    pub size: u64,
}

/// One entry in a user/month listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: Option<String>,
}
