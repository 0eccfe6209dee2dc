pub mod drive;
pub mod memory;
pub mod provisioner;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{AppConfig, BackendKind};
use crate::error::AppError;
use crate::keys::ReceiptKey;
use crate::models::object::{ObjectEntry, StoredObject};

/// Uniform surface over the two cloud bindings (plus the in-process one
/// used for tests and local runs). Implementations perform network I/O
/// with no retries; failures propagate to the caller unmodified.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write one object under the derived key and return its locator.
    /// Re-storing the same key overwrites on the object-store backends;
    /// Drive has no name uniqueness, so repeats accumulate there.
    async fn store(
        &self,
        key: &ReceiptKey,
        data: Bytes,
        mime_type: &str,
    ) -> Result<StoredObject, AppError>;

    /// Enumerate a user's objects for one `YYYY-MM` month.
    async fn list(&self, user_id: &str, month: &str) -> Result<Vec<ObjectEntry>, AppError>;

    /// Cheap reachability probe used by the diagnostics endpoint.
    async fn check_access(&self) -> Result<(), AppError>;

    fn kind(&self) -> &'static str;
}

/// Construct the backend selected by configuration. Called once through
/// the state's single-flight cell; cloud bindings validate their settings
/// here and fail with a `Configuration` error naming the missing one.
pub async fn build(config: &AppConfig) -> Result<Arc<dyn Storage>, AppError> {
    match config.backend_kind()? {
        BackendKind::Memory => Ok(Arc::new(memory::MemoryStorage::new())),
        BackendKind::S3 => Ok(Arc::new(s3::S3Storage::from_config(config)?)),
        BackendKind::Drive => Ok(Arc::new(drive::DriveStorage::connect(config).await?)),
    }
}
