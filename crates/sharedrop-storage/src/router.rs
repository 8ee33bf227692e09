//! Storage routing
//!
//! Images and videos below [`PRIMARY_SIZE_LIMIT_BYTES`] go to the primary
//! (transformation-capable) backend; everything else goes to the secondary raw
//! object store. A primary failure is retried once on the secondary with the same
//! bytes, so only a secondary failure reaches the caller.

use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use bytes::Bytes;
use sharedrop_core::models::{FileCategory, NewStoredFile};
use sharedrop_core::StorageBackend;
use std::sync::Arc;

/// Files at or above this size always go to the secondary backend.
pub const PRIMARY_SIZE_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary,
    Secondary,
}

impl Route {
    /// Pure routing decision; ignores whether a primary backend is configured.
    pub fn for_file(category: FileCategory, size_bytes: u64) -> Route {
        if category.is_media() && size_bytes < PRIMARY_SIZE_LIMIT_BYTES {
            Route::Primary
        } else {
            Route::Secondary
        }
    }
}

#[derive(Clone)]
pub struct StorageRouter {
    primary: Option<Arc<dyn Storage>>,
    secondary: Arc<dyn Storage>,
}

impl StorageRouter {
    pub fn new(primary: Option<Arc<dyn Storage>>, secondary: Arc<dyn Storage>) -> Self {
        Self { primary, secondary }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Classify and store one file, falling back to the secondary backend when the
    /// primary fails.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn store(
        &self,
        data: Bytes,
        original_name: &str,
        mime_type: &str,
    ) -> StorageResult<NewStoredFile> {
        let category = FileCategory::classify(mime_type, original_name);
        let size_bytes = data.len() as u64;

        let stored = match (Route::for_file(category, size_bytes), &self.primary) {
            (Route::Primary, Some(primary)) => {
                match primary
                    .upload(original_name, mime_type, category, data.clone())
                    .await
                {
                    Ok(stored) => stored,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            category = %category,
                            primary = %primary.backend_type(),
                            secondary = %self.secondary.backend_type(),
                            "Primary storage failed, falling back to secondary"
                        );
                        self.secondary
                            .upload(original_name, mime_type, category, data)
                            .await?
                    }
                }
            }
            _ => {
                self.secondary
                    .upload(original_name, mime_type, category, data)
                    .await?
            }
        };

        let StoredObject { key, url, backend } = stored;
        Ok(NewStoredFile {
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: size_bytes as i64,
            category,
            backend,
            storage_key: key,
            url,
        })
    }

    /// Backend instance holding files recorded with `backend`.
    pub fn backend_for(&self, backend: StorageBackend) -> Option<&Arc<dyn Storage>> {
        if self.secondary.backend_type() == backend {
            return Some(&self.secondary);
        }
        self.primary
            .as_ref()
            .filter(|primary| primary.backend_type() == backend)
    }

    fn require_backend(&self, backend: StorageBackend) -> StorageResult<&Arc<dyn Storage>> {
        self.backend_for(backend).ok_or_else(|| {
            StorageError::ConfigError(format!("Storage backend '{}' is not configured", backend))
        })
    }

    pub async fn download(&self, backend: StorageBackend, key: &str) -> StorageResult<Vec<u8>> {
        self.require_backend(backend)?.download(key).await
    }

    pub async fn delete(&self, backend: StorageBackend, key: &str) -> StorageResult<()> {
        self.require_backend(backend)?.delete(key).await
    }
}
