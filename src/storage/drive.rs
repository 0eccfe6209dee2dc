//! Document-store binding (Google Drive v3).
//!
//! Files live in a two-level hierarchy under a root folder: one folder
//! per userId, one `YYYY-MM` folder per month inside it. The root is
//! either a pre-shared folder id (verified at startup) or a well-known
//! folder name created on demand. Locators are `webViewLink`s.
//!
//! Auth is a service-account JWT (RS256) exchanged for a bearer token at
//! the OAuth token endpoint; the token is cached and refreshed behind a
//! mutex so concurrent first-uses trigger a single exchange.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::keys::{self, ReceiptKey};
use crate::models::object::{ObjectEntry, StoredObject};
use crate::storage::provisioner::FolderProvisioner;
use crate::storage::Storage;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Drive reports sizes as decimal strings.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

/// The slice of the Drive API this service needs. Kept as a trait so the
/// provisioner and the storage binding can be exercised against a fake.
#[async_trait]
pub trait FolderApi: Send + Sync {
    /// First non-trashed folder matching (parent, name), if any.
    async fn find_folder(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<Option<DriveFolder>, AppError>;

    async fn create_folder(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<DriveFolder, AppError>;

    /// Fetch a folder by id; errors if it is inaccessible.
    async fn get_folder(&self, id: &str) -> Result<DriveFolder, AppError>;

    async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<DriveFile, AppError>;

    /// Non-folder children of a folder.
    async fn list_files(&self, parent_id: &str) -> Result<Vec<DriveFile>, AppError>;
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct HttpDriveApi {
    http: reqwest::Client,
    key: ServiceAccountKey,
    files_url: String,
    upload_url: String,
    token: tokio::sync::Mutex<Option<CachedToken>>,
}

impl HttpDriveApi {
    pub fn from_key_file(path: &str) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "cannot read GOOGLE_APPLICATION_CREDENTIALS {}: {}",
                path, e
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            AppError::Configuration(format!("invalid service account key {}: {}", path, e))
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            key,
            files_url: FILES_URL.to_string(),
            upload_url: UPLOAD_URL.to_string(),
            token: tokio::sync::Mutex::new(None),
        })
    }

    /// Bearer token, refreshed when less than a minute of validity is
    /// left. The mutex makes concurrent refreshes single-flight.
    async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now();
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| AppError::Configuration(format!("invalid service account private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| AppError::Internal(format!("JWT signing failed: {}", e)))?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "token exchange").await?;
        let token: TokenResponse = response.json().await?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        tracing::debug!("Drive access token refreshed");
        Ok(value)
    }
}

/// The metadata POST asks for `fields=id` only.
#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FolderList {
    #[serde(default)]
    files: Vec<DriveFolder>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[async_trait]
impl FolderApi for HttpDriveApi {
    async fn find_folder(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<Option<DriveFolder>, AppError> {
        let token = self.access_token().await?;
        let mut q = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query(name),
            FOLDER_MIME
        );
        if let Some(parent) = parent_id {
            q.push_str(&format!(" and '{}' in parents", escape_query(parent)));
        }

        let response = self
            .http
            .get(&self.files_url)
            .bearer_auth(token)
            .query(&[
                ("q", q.as_str()),
                ("fields", "files(id, name)"),
                ("pageSize", "10"),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "folder lookup").await?;
        let list: FolderList = response.json().await?;
        Ok(list.files.into_iter().next())
    }

    async fn create_folder(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<DriveFolder, AppError> {
        let token = self.access_token().await?;
        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .http
            .post(&self.files_url)
            .bearer_auth(token)
            .query(&[("fields", "id, name")])
            .json(&metadata)
            .send()
            .await?;
        let response = ensure_success(response, "folder creation").await?;
        Ok(response.json().await?)
    }

    async fn get_folder(&self, id: &str) -> Result<DriveFolder, AppError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/{}", self.files_url, id))
            .bearer_auth(token)
            .query(&[("fields", "id, name")])
            .send()
            .await?;
        let response = ensure_success(response, "folder fetch").await?;
        Ok(response.json().await?)
    }

    async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<DriveFile, AppError> {
        let token = self.access_token().await?;

        // Metadata first, then the content under uploadType=media. This
        // avoids hand-rolling a multipart/related body.
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
        });
        let response = self
            .http
            .post(&self.files_url)
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;
        let response = ensure_success(response, "file creation").await?;
        let created: CreatedFile = response.json().await?;

        let upload = async {
            let response = self
                .http
                .patch(format!("{}/{}", self.upload_url, created.id))
                .bearer_auth(&token)
                .query(&[
                    ("uploadType", "media"),
                    ("fields", "id, name, size, modifiedTime, webViewLink"),
                ])
                .header(reqwest::header::CONTENT_TYPE, mime_type)
                .body(data)
                .send()
                .await?;
            let response = ensure_success(response, "file content upload").await?;
            Ok::<DriveFile, AppError>(response.json().await?)
        }
        .await;

        match upload {
            Ok(file) => Ok(file),
            Err(e) => {
                // The metadata POST already persisted an empty entry;
                // delete the shell so a failed upload leaves nothing in
                // the month folder. Cleanup is best effort.
                let cleanup = self
                    .http
                    .delete(format!("{}/{}", self.files_url, created.id))
                    .bearer_auth(&token)
                    .send()
                    .await;
                if let Err(cleanup_err) = cleanup {
                    tracing::warn!(
                        file_id = %created.id,
                        error = %cleanup_err,
                        "Failed to delete orphaned file entry"
                    );
                }
                Err(e)
            }
        }
    }

    async fn list_files(&self, parent_id: &str) -> Result<Vec<DriveFile>, AppError> {
        let token = self.access_token().await?;
        let q = format!(
            "'{}' in parents and trashed = false and mimeType != '{}'",
            escape_query(parent_id),
            FOLDER_MIME
        );
        let response = self
            .http
            .get(&self.files_url)
            .bearer_auth(token)
            .query(&[
                ("q", q.as_str()),
                ("fields", "files(id, name, size, modifiedTime, webViewLink)"),
                ("pageSize", "1000"),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "file listing").await?;
        let list: FileList = response.json().await?;
        Ok(list.files)
    }
}

async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let mut body = response.text().await.unwrap_or_default();
    body.truncate(300);
    Err(AppError::Backend(format!(
        "drive {} failed with {}: {}",
        what, status, body
    )))
}

/// Single quotes delimit strings in Drive query expressions.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub struct DriveStorage {
    api: Arc<dyn FolderApi>,
    provisioner: FolderProvisioner,
    root_id: String,
}

impl DriveStorage {
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let path = AppConfig::require(
            &config.drive_credentials_path,
            "GOOGLE_APPLICATION_CREDENTIALS",
        )?;
        let api: Arc<dyn FolderApi> = Arc::new(HttpDriveApi::from_key_file(path)?);
        Self::with_api(
            api,
            config.drive_root_folder_id.as_deref(),
            &config.drive_root_folder_name,
        )
        .await
    }

    /// Resolve the root folder up front so a misconfigured id fails at
    /// startup rather than on the first upload.
    pub async fn with_api(
        api: Arc<dyn FolderApi>,
        root_folder_id: Option<&str>,
        root_folder_name: &str,
    ) -> Result<Self, AppError> {
        let provisioner = FolderProvisioner::new(api.clone());
        let root_id = match root_folder_id {
            Some(id) => {
                let folder = api.get_folder(id).await.map_err(|e| {
                    AppError::Configuration(format!(
                        "DRIVE_ROOT_FOLDER_ID {} is not accessible: {}",
                        id, e
                    ))
                })?;
                folder.id
            }
            None => provisioner.get_or_create(None, root_folder_name).await?,
        };
        Ok(Self {
            api,
            provisioner,
            root_id,
        })
    }
}

#[async_trait]
impl Storage for DriveStorage {
    async fn store(
        &self,
        key: &ReceiptKey,
        data: Bytes,
        mime_type: &str,
    ) -> Result<StoredObject, AppError> {
        let size = data.len() as u64;
        let user_folder = self
            .provisioner
            .get_or_create(Some(&self.root_id), &key.user_id)
            .await?;
        let month_folder = self
            .provisioner
            .get_or_create(Some(&user_folder), &key.month)
            .await?;

        let file = self
            .api
            .create_file(&month_folder, &key.file_name, mime_type, data)
            .await?;

        let url = file
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id));

        Ok(StoredObject {
            key: key.object_key(),
            id: Some(file.id),
            url,
            size,
        })
    }

    async fn list(&self, user_id: &str, month: &str) -> Result<Vec<ObjectEntry>, AppError> {
        // Folders were created from the sanitized id, so the lookup must
        // use the same form or listings for mixed-case users come back
        // empty.
        let user_id = keys::sanitize_segment(user_id);
        let Some(user_folder) = self.provisioner.resolve(Some(&self.root_id), &user_id).await?
        else {
            return Ok(vec![]);
        };
        let Some(month_folder) = self.provisioner.resolve(Some(&user_folder), month).await?
        else {
            return Ok(vec![]);
        };

        let prefix = keys::month_prefix(&user_id, month);
        let mut entries: Vec<ObjectEntry> = self
            .api
            .list_files(&month_folder)
            .await?
            .into_iter()
            .map(|f| ObjectEntry {
                key: format!("{}{}", prefix, f.name),
                size: f.size.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0),
                last_modified: f
                    .modified_time
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&Utc)),
                url: Some(
                    f.web_view_link
                        .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", f.id)),
                ),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn check_access(&self) -> Result<(), AppError> {
        self.api.get_folder(&self.root_id).await.map(|_| ())
    }

    fn kind(&self) -> &'static str {
        "drive"
    }
}
