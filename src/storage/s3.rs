//! Object-store binding (S3 API: Cloudflare R2, MinIO, AWS).
//!
//! One PUT per upload keyed by the derived object key; listing is a
//! prefix scan. Locators are presigned GET URLs whose lifetime comes
//! from `SIGNED_URL_EXPIRY_SECS` (default one hour).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::keys::{self, ReceiptKey};
use crate::models::object::{ObjectEntry, StoredObject};
use crate::storage::Storage;

#[derive(Debug)]
pub struct S3Storage {
    bucket: Box<Bucket>,
    signed_url_expiry_secs: u32,
}

impl S3Storage {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let endpoint = AppConfig::require(&config.s3_endpoint, "S3_ENDPOINT")?;
        let region = AppConfig::require(&config.s3_region, "S3_REGION")?;
        let bucket_name = AppConfig::require(&config.s3_bucket, "S3_BUCKET")?;
        let access_key = AppConfig::require(&config.s3_access_key, "S3_ACCESS_KEY")?;
        let secret_key = AppConfig::require(&config.s3_secret_key, "S3_SECRET_KEY")?;

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| AppError::Configuration(format!("S3 credentials rejected: {}", e)))?;

        let bucket = Bucket::new(
            bucket_name,
            Region::Custom {
                region: region.to_string(),
                endpoint: endpoint.to_string(),
            },
            credentials,
        )?
        .with_path_style();

        Ok(Self {
            bucket: Box::new(bucket),
            signed_url_expiry_secs: config.signed_url_expiry_secs,
        })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn store(
        &self,
        key: &ReceiptKey,
        data: Bytes,
        mime_type: &str,
    ) -> Result<StoredObject, AppError> {
        let object_key = key.object_key();
        let size = data.len() as u64;

        let response = self
            .bucket
            .put_object_with_content_type(&object_key, &data, mime_type)
            .await?;
        if response.status_code() >= 300 {
            return Err(AppError::Backend(format!(
                "put {} returned status {}",
                object_key,
                response.status_code()
            )));
        }

        let url = self
            .bucket
            .presign_get(&object_key, self.signed_url_expiry_secs, None)
            .await?;

        tracing::debug!(key = %object_key, size, "Object stored");

        Ok(StoredObject {
            key: object_key,
            id: None,
            url,
            size,
        })
    }

    async fn list(&self, user_id: &str, month: &str) -> Result<Vec<ObjectEntry>, AppError> {
        let prefix = keys::month_prefix(user_id, month);
        let pages = self.bucket.list(prefix, None).await?;

        let mut entries = Vec::new();
        for page in pages {
            for object in page.contents {
                let url = self
                    .bucket
                    .presign_get(&object.key, self.signed_url_expiry_secs, None)
                    .await?;
                entries.push(ObjectEntry {
                    last_modified: DateTime::parse_from_rfc3339(&object.last_modified)
                        .ok()
                        .map(|t| t.with_timezone(&Utc)),
                    key: object.key,
                    size: object.size,
                    url: Some(url),
                });
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn check_access(&self) -> Result<(), AppError> {
        if self.bucket.exists().await? {
            Ok(())
        } else {
            Err(AppError::Configuration(format!(
                "S3 bucket {} does not exist or is not accessible",
                self.bucket.name()
            )))
        }
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            log_level: "error".into(),
            max_upload_size: 20_971_520,
            cors_allowed_origins: "*".into(),
            storage_backend: "s3".into(),
            s3_endpoint: Some("http://localhost:9000".into()),
            s3_region: Some("auto".into()),
            s3_bucket: Some("comprovantes".into()),
            s3_access_key: Some("test-access".into()),
            s3_secret_key: Some("test-secret".into()),
            signed_url_expiry_secs: 3600,
            drive_credentials_path: None,
            drive_root_folder_id: None,
            drive_root_folder_name: "Miguel_Comprovantes".into(),
        }
    }

    #[test]
    fn from_config_builds_the_client() {
        let storage = S3Storage::from_config(&s3_config()).unwrap();
        assert_eq!(storage.kind(), "s3");
        assert_eq!(storage.bucket.name(), "comprovantes");
    }

    #[test]
    fn missing_setting_is_named_in_the_error() {
        let mut config = s3_config();
        config.s3_bucket = None;
        let err = S3Storage::from_config(&config).unwrap_err();
        match err {
            AppError::Configuration(msg) => assert!(msg.contains("S3_BUCKET")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
