//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use sharedrop_core::models::FileCategory;
use sharedrop_core::StorageBackend;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Where a backend put an uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Backend-specific key, needed for download and delete
    pub key: String,
    /// Retrieval URL handed to clients
    pub url: String,
    pub backend: StorageBackend,
}

/// Storage abstraction trait
///
/// Backends receive the whole file in memory. `category` lets a backend pick a
/// resource class (Cloudinary distinguishes image, video, and raw uploads).
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        category: FileCategory,
        data: Bytes,
    ) -> StorageResult<StoredObject>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Get the backend type (for logging/metrics)
    fn backend_type(&self) -> StorageBackend;
}
