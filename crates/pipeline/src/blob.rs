//! In-memory ephemeral resources addressed by `blob:` handles.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use genflow_core::GenerationError;

/// Prefix of handles minted by [`BlobRegistry`].
pub const BLOB_PREFIX: &str = "blob:";

/// Bytes and MIME type of a local resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl BlobData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Resolves `blob:` handles to their contents.
#[async_trait]
pub trait BlobSource: Send + Sync {
    async fn fetch(&self, handle: &str) -> Result<BlobData, GenerationError>;
}

/// Process-local blob store.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: Mutex<HashMap<String, BlobData>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under a fresh handle and return it.
    pub fn register(&self, data: BlobData) -> String {
        let handle = format!("{BLOB_PREFIX}genflow/{}", uuid::Uuid::new_v4());
        self.insert(handle.clone(), data);
        handle
    }

    /// Store `data` under a caller-chosen handle, replacing any previous one.
    pub fn insert(&self, handle: impl Into<String>, data: BlobData) {
        self.lock().insert(handle.into(), data);
    }

    /// Forget a handle. Returns whether it was known.
    pub fn revoke(&self, handle: &str) -> bool {
        self.lock().remove(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, BlobData>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobSource for BlobRegistry {
    async fn fetch(&self, handle: &str) -> Result<BlobData, GenerationError> {
        self.lock()
            .get(handle)
            .cloned()
            .ok_or_else(|| GenerationError::Staging(format!("Unknown blob handle: {handle}")))
    }
}
