//! Configuration validation
//!
//! Checks critical settings at startup so misconfiguration fails before the
//! server accepts traffic.

use anyhow::Result;
use sharedrop_core::Config;

const MIN_MAX_FILE_SIZE: usize = 1024;

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Set specific allowed origins via CORS_ORIGINS."
        ));
    }

    if config.db_max_connections() == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }

    if config.db_timeout_seconds() == 0 {
        return Err(anyhow::anyhow!("Database timeout cannot be 0"));
    }

    if config.max_file_size_bytes() < MIN_MAX_FILE_SIZE {
        return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB is too small"));
    }

    if config.max_request_body_bytes() < config.max_file_size_bytes() {
        tracing::warn!(
            max_file_size_bytes = config.max_file_size_bytes(),
            max_request_body_bytes = config.max_request_body_bytes(),
            "Request body limit is below the per-file limit - large files will be cut off"
        );
    }

    if config.razorpay_key_id().trim().is_empty() {
        return Err(anyhow::anyhow!("RAZORPAY_KEY_ID must not be empty"));
    }

    if config.is_production() && config.recaptcha_secret_key().is_none() {
        tracing::warn!("RECAPTCHA_SECRET_KEY not set in production - uploads are not bot-protected");
    }

    if config.is_production() && !config.app_url().starts_with("https://") {
        tracing::warn!(app_url = %config.app_url(), "APP_URL is not HTTPS in production");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharedrop_core::{AppConfig, StorageBackend};

    fn config() -> AppConfig {
        AppConfig {
            server_port: 4000,
            cors_origins: vec!["https://sharedrop.example".to_string()],
            environment: "production".to_string(),
            database_url: "postgres://localhost/sharedrop".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 5,
            app_url: "https://sharedrop.example".to_string(),
            max_file_size_bytes: 100 * 1024 * 1024,
            max_request_body_bytes: 1024 * 1024 * 1024,
            http_concurrency_limit: 10_000,
            bcrypt_cost: 10,
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_folder: "sharedrop".to_string(),
            cloudinary_api_url: "https://api.cloudinary.com".to_string(),
            secondary_storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: "auto".to_string(),
            s3_endpoint: None,
            s3_public_url: None,
            local_storage_path: Some("/tmp/sharedrop".to_string()),
            local_storage_base_url: Some("https://files.sharedrop.example".to_string()),
            razorpay_key_id: "rzp_live".to_string(),
            razorpay_key_secret: "secret".to_string(),
            razorpay_webhook_secret: "whsec".to_string(),
            razorpay_api_url: "https://api.razorpay.com".to_string(),
            recaptcha_secret_key: Some("captcha".to_string()),
            recaptcha_min_score: 0.5,
            recaptcha_verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
        }
    }

    #[test]
    fn accepts_production_config() {
        assert!(validate_config(&Config(Box::new(config()))).is_ok());
    }

    #[test]
    fn rejects_wildcard_cors_in_production() {
        let mut app = config();
        app.cors_origins = vec!["*".to_string()];
        assert!(validate_config(&Config(Box::new(app))).is_err());
    }

    #[test]
    fn rejects_zero_pool_size() {
        let mut app = config();
        app.db_max_connections = 0;
        assert!(validate_config(&Config(Box::new(app))).is_err());
    }

    #[test]
    fn rejects_empty_key_id() {
        let mut app = config();
        app.razorpay_key_id = "  ".to_string();
        assert!(validate_config(&Config(Box::new(app))).is_err());
    }
}
