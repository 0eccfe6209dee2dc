//! In-process backend used by the `memory` deployment mode and by tests.
//!
//! Keeps objects in a `DashMap` keyed by the flat object key and counts
//! invocations, so tests can assert that a rejected request never reached
//! the backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::AppError;
use crate::keys::{self, ReceiptKey};
use crate::models::object::{ObjectEntry, StoredObject};
use crate::storage::Storage;

#[derive(Debug, Clone)]
struct MemoryObject {
    size: u64,
    #[allow(dead_code)]
    mime_type: String,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: DashMap<String, MemoryObject>,
    store_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store(
        &self,
        key: &ReceiptKey,
        data: Bytes,
        mime_type: &str,
    ) -> Result<StoredObject, AppError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        let object_key = key.object_key();
        let size = data.len() as u64;
        self.objects.insert(
            object_key.clone(),
            MemoryObject {
                size,
                mime_type: mime_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(StoredObject {
            url: format!("memory://{}", object_key),
            key: object_key,
            id: None,
            size,
        })
    }

    async fn list(&self, user_id: &str, month: &str) -> Result<Vec<ObjectEntry>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let prefix = keys::month_prefix(user_id, month);
        let mut entries: Vec<ObjectEntry> = self
            .objects
            .iter()
            .filter(|e| e.key().starts_with(&prefix))
            .map(|e| ObjectEntry {
                key: e.key().clone(),
                size: e.value().size,
                last_modified: Some(e.value().last_modified),
                url: Some(format!("memory://{}", e.key())),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn check_access(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
