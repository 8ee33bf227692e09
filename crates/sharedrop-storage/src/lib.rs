//! Sharedrop Storage Library
//!
//! Storage abstraction, the concrete backends, and the router that decides which
//! backend receives a file.
//!
//! # Backends
//!
//! - **Cloudinary** (primary): images and videos below the size threshold
//! - **S3-compatible** (secondary, e.g. Cloudflare R2) or **local filesystem** (secondary):
//!   everything else, plus fallback when the primary rejects a file
//!
//! # Storage key format
//!
//! Secondary backends use `{prefix}/{millis}-{suffix}-{filename}` keys generated by the
//! `keys` module. Cloudinary keys are `{resource_type}/{public_id}`. Keys must not
//! contain `..` or a leading `/`.

#[cfg(feature = "storage-cloudinary")]
pub mod cloudinary;
pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod router;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-cloudinary")]
pub use cloudinary::CloudinaryStorage;
pub use factory::{create_primary_storage, create_secondary_storage, create_storage_router};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use router::{Route, StorageRouter, PRIMARY_SIZE_LIMIT_BYTES};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use sharedrop_core::models::FileCategory;
pub use sharedrop_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
