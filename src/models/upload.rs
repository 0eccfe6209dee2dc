use serde::Deserialize;

/// Body of `POST /upload-comprovante`.
///
/// Field names follow the original wire contract (`descricao`,
/// `fileBase64`). Everything is optional at the serde level so that
/// missing fields surface as 400s from validation instead of
/// deserialization rejections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub user_id: Option<String>,
    pub date: Option<String>,
    pub descricao: Option<String>,
    pub mime_type: Option<String>,
    pub file_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub month: Option<String>,
}
