#[cfg(feature = "storage-cloudinary")]
use crate::CloudinaryStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult, StorageRouter};
use sharedrop_core::Config;
use std::sync::Arc;

/// Create the primary backend, or `None` when Cloudinary credentials are absent.
pub fn create_primary_storage(config: &Config) -> StorageResult<Option<Arc<dyn Storage>>> {
    let (Some(cloud_name), Some(api_key), Some(api_secret)) = (
        config.cloudinary_cloud_name(),
        config.cloudinary_api_key(),
        config.cloudinary_api_secret(),
    ) else {
        return Ok(None);
    };

    build_cloudinary(config, cloud_name, api_key, api_secret).map(Some)
}

#[cfg(feature = "storage-cloudinary")]
fn build_cloudinary(
    config: &Config,
    cloud_name: &str,
    api_key: &str,
    api_secret: &str,
) -> StorageResult<Arc<dyn Storage>> {
    let storage = CloudinaryStorage::new(
        cloud_name.to_string(),
        api_key.to_string(),
        api_secret.to_string(),
        config.cloudinary_folder().to_string(),
        config.cloudinary_api_url().to_string(),
    )?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-cloudinary"))]
fn build_cloudinary(
    _config: &Config,
    _cloud_name: &str,
    _api_key: &str,
    _api_secret: &str,
) -> StorageResult<Arc<dyn Storage>> {
    Err(StorageError::ConfigError(
        "Cloudinary backend not available (storage-cloudinary feature not enabled)".to_string(),
    ))
}

/// Create the secondary (raw object) backend based on configuration
pub async fn create_secondary_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.secondary_storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let public_url = config.s3_public_url().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_PUBLIC_URL not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage =
                S3Storage::new(bucket, config.s3_region().to_string(), endpoint, public_url)
                    .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config
                .local_storage_path()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Cloudinary => Err(StorageError::ConfigError(
            "Cloudinary cannot be used as the secondary backend".to_string(),
        )),
    }
}

/// Build the router from configuration.
pub async fn create_storage_router(config: &Config) -> StorageResult<StorageRouter> {
    let primary = create_primary_storage(config)?;
    let secondary = create_secondary_storage(config).await?;

    let primary_name = primary
        .as_ref()
        .map(|p| p.backend_type().to_string())
        .unwrap_or_else(|| "none".to_string());
    tracing::info!(
        primary = %primary_name,
        secondary = %secondary.backend_type(),
        "Storage router configured"
    );

    Ok(StorageRouter::new(primary, secondary))
}
