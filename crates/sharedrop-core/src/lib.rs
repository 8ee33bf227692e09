//! Sharedrop Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! access rules (expiration policy, access evaluator, password hashing) shared
//! across all Sharedrop components.

pub mod access;
pub mod config;
pub mod error;
pub mod expiration;
pub mod ids;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use access::{AccessDecision, AccessReason};
pub use config::{AppConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
