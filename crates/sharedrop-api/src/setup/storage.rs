//! Storage backend setup

use anyhow::{Context, Result};
use sharedrop_core::Config;
use sharedrop_storage::{create_storage_router, StorageRouter};

/// Build the storage router (optional Cloudinary primary, configured secondary).
pub async fn setup_storage(config: &Config) -> Result<StorageRouter> {
    let router = create_storage_router(config)
        .await
        .context("Failed to initialize storage backends")?;

    if !router.has_primary() {
        tracing::warn!("Cloudinary not configured - media files will go to the secondary backend");
    }

    Ok(router)
}
