//! Idempotent get-or-create for the Drive folder hierarchy.
//!
//! The backend has no uniqueness constraint on (parent, name), so a bare
//! list-then-create races with itself under concurrent uploads. Policy
//! here: a per-provisioner mutex serializes list-then-create inside this
//! process, and resolved ids are memoized so the common path is a cache
//! hit. Duplicates created by *other* processes are still possible; the
//! first match wins on lookup, which is the accepted behavior.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::storage::drive::FolderApi;

pub struct FolderProvisioner {
    api: Arc<dyn FolderApi>,
    cache: DashMap<(String, String), String>,
    create_lock: Mutex<()>,
}

impl FolderProvisioner {
    pub fn new(api: Arc<dyn FolderApi>) -> Self {
        Self {
            api,
            cache: DashMap::new(),
            create_lock: Mutex::new(()),
        }
    }

    /// Return the id of the folder `name` under `parent_id`, creating it
    /// if absent. `parent_id = None` means the backend root.
    pub async fn get_or_create(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<String, AppError> {
        let cache_key = cache_key(parent_id, name);
        if let Some(id) = self.cache.get(&cache_key) {
            return Ok(id.clone());
        }

        let _guard = self.create_lock.lock().await;
        // Re-check: another request may have resolved it while we waited.
        if let Some(id) = self.cache.get(&cache_key) {
            return Ok(id.clone());
        }

        let id = match self.api.find_folder(parent_id, name).await? {
            Some(folder) => folder.id,
            None => {
                let folder = self.api.create_folder(parent_id, name).await?;
                tracing::info!(folder_id = %folder.id, name, "Folder created");
                folder.id
            }
        };
        self.cache.insert(cache_key, id.clone());
        Ok(id)
    }

    /// Resolve without creating. Used by listing, which must not invent
    /// folders for months that never saw an upload.
    pub async fn resolve(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<Option<String>, AppError> {
        let cache_key = cache_key(parent_id, name);
        if let Some(id) = self.cache.get(&cache_key) {
            return Ok(Some(id.clone()));
        }
        match self.api.find_folder(parent_id, name).await? {
            Some(folder) => {
                self.cache.insert(cache_key, folder.id.clone());
                Ok(Some(folder.id))
            }
            None => Ok(None),
        }
    }
}

fn cache_key(parent_id: Option<&str>, name: &str) -> (String, String) {
    (parent_id.unwrap_or("").to_string(), name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::drive::{DriveFile, DriveFolder};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeApi {
        folders: StdMutex<Vec<(Option<String>, String, String)>>,
        finds: AtomicUsize,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl FolderApi for FakeApi {
        async fn find_folder(
            &self,
            parent_id: Option<&str>,
            name: &str,
        ) -> Result<Option<DriveFolder>, AppError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            let folders = self.folders.lock().unwrap();
            Ok(folders
                .iter()
                .find(|(p, n, _)| p.as_deref() == parent_id && n == name)
                .map(|(_, n, id)| DriveFolder {
                    id: id.clone(),
                    name: n.clone(),
                }))
        }

        async fn create_folder(
            &self,
            parent_id: Option<&str>,
            name: &str,
        ) -> Result<DriveFolder, AppError> {
            let n = self.creates.fetch_add(1, Ordering::SeqCst);
            let id = format!("folder-{}", n);
            self.folders.lock().unwrap().push((
                parent_id.map(str::to_string),
                name.to_string(),
                id.clone(),
            ));
            Ok(DriveFolder {
                id,
                name: name.to_string(),
            })
        }

        async fn get_folder(&self, id: &str) -> Result<DriveFolder, AppError> {
            Ok(DriveFolder {
                id: id.to_string(),
                name: "fake".into(),
            })
        }

        async fn create_file(
            &self,
            _parent_id: &str,
            name: &str,
            _mime_type: &str,
            _data: Bytes,
        ) -> Result<DriveFile, AppError> {
            Ok(DriveFile {
                id: "file-0".into(),
                name: name.to_string(),
                mime_type: None,
                size: None,
                modified_time: None,
                web_view_link: None,
            })
        }

        async fn list_files(&self, _parent_id: &str) -> Result<Vec<DriveFile>, AppError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let api = Arc::new(FakeApi::default());
        let provisioner = FolderProvisioner::new(api.clone());

        let first = provisioner.get_or_create(Some("root"), "2025-08").await.unwrap();
        let second = provisioner.get_or_create(Some("root"), "2025-08").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_resolution_skips_the_backend() {
        let api = Arc::new(FakeApi::default());
        let provisioner = FolderProvisioner::new(api.clone());

        provisioner.get_or_create(Some("root"), "42").await.unwrap();
        let finds_after_first = api.finds.load(Ordering::SeqCst);
        provisioner.get_or_create(Some("root"), "42").await.unwrap();

        assert_eq!(api.finds.load(Ordering::SeqCst), finds_after_first);
    }

    #[tokio::test]
    async fn existing_folder_is_reused_not_recreated() {
        let api = Arc::new(FakeApi::default());
        api.create_folder(Some("root"), "42").await.unwrap();

        let provisioner = FolderProvisioner::new(api.clone());
        let id = provisioner.get_or_create(Some("root"), "42").await.unwrap();

        assert_eq!(id, "folder-0");
        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_does_not_create() {
        let api = Arc::new(FakeApi::default());
        let provisioner = FolderProvisioner::new(api.clone());

        let missing = provisioner.resolve(Some("root"), "2025-01").await.unwrap();

        assert!(missing.is_none());
        assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn distinct_parents_get_distinct_folders() {
        let api = Arc::new(FakeApi::default());
        let provisioner = FolderProvisioner::new(api.clone());

        let a = provisioner.get_or_create(Some("user-a"), "2025-08").await.unwrap();
        let b = provisioner.get_or_create(Some("user-b"), "2025-08").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(api.creates.load(Ordering::SeqCst), 2);
    }
}
