use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::storage::{self, Storage};

/// Shared per-process state. The backend client is constructed lazily on
/// first use through a `OnceCell`, so concurrent first requests trigger a
/// single initialization and every later request reuses the handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    backend: Arc<OnceCell<Arc<dyn Storage>>>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            backend: Arc::new(OnceCell::new()),
            start_time: chrono::Utc::now(),
        }
    }

    /// State with a pre-built backend, bypassing configuration. Used by
    /// tests to inject the in-memory double.
    pub fn with_storage(config: AppConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            config: Arc::new(config),
            backend: Arc::new(OnceCell::new_with(Some(storage))),
            start_time: chrono::Utc::now(),
        }
    }

    pub async fn storage(&self) -> Result<Arc<dyn Storage>, AppError> {
        let config = self.config.clone();
        self.backend
            .get_or_try_init(|| async move { storage::build(&config).await })
            .await
            .map(Arc::clone)
    }
}
