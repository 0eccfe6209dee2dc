use std::env;

use crate::error::AppError;

/// Storage backend selected via `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    S3,
    Drive,
    Memory,
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_upload_size: u64,
    pub cors_allowed_origins: String,
    pub storage_backend: String,

    // Object store (S3-compatible, e.g. Cloudflare R2 or MinIO)
    pub s3_endpoint: Option<String>,
    pub s3_region: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub signed_url_expiry_secs: u32,

    // Google Drive
    pub drive_credentials_path: Option<String>,
    pub drive_root_folder_id: Option<String>,
    pub drive_root_folder_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            max_upload_size: parse_env("MAX_UPLOAD_SIZE", 20_971_520),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".into()),
            storage_backend: env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".into()),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            s3_region: env_opt("S3_REGION"),
            s3_bucket: env_opt("S3_BUCKET"),
            s3_access_key: env_opt("S3_ACCESS_KEY"),
            s3_secret_key: env_opt("S3_SECRET_KEY"),
            signed_url_expiry_secs: parse_env("SIGNED_URL_EXPIRY_SECS", 3600),
            drive_credentials_path: env_opt("GOOGLE_APPLICATION_CREDENTIALS"),
            drive_root_folder_id: env_opt("DRIVE_ROOT_FOLDER_ID"),
            drive_root_folder_name: env::var("DRIVE_ROOT_FOLDER_NAME")
                .unwrap_or_else(|_| "Miguel_Comprovantes".into()),
        }
    }

    pub fn backend_kind(&self) -> Result<BackendKind, AppError> {
        match self.storage_backend.as_str() {
            "s3" => Ok(BackendKind::S3),
            "drive" => Ok(BackendKind::Drive),
            "memory" => Ok(BackendKind::Memory),
            other => Err(AppError::Configuration(format!(
                "STORAGE_BACKEND must be one of s3, drive, memory (got {:?})",
                other
            ))),
        }
    }

    /// Fetch a required setting, naming it in the error so the operator
    /// knows which variable to fix.
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Configuration(format!("{} is not set", name)))
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
