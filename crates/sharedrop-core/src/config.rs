//! Configuration module
//!
//! Environment-driven settings for the HTTP server, database pool, storage
//! backends, payment provider, and CAPTCHA verification.

use std::env;

use crate::access::DEFAULT_BCRYPT_COST;
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 100;
const MAX_REQUEST_BODY_MB: usize = 1024;
const RECAPTCHA_MIN_SCORE: f64 = 0.5;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Public site URL used to build share links
    pub app_url: String,
    pub max_file_size_bytes: usize,
    pub max_request_body_bytes: usize,
    /// In-flight request cap applied in front of the router
    pub http_concurrency_limit: usize,
    pub bcrypt_cost: u32,
    // Primary (transformation-capable) backend; disabled when the cloud name is unset
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    pub cloudinary_folder: String,
    pub cloudinary_api_url: String,
    // Secondary (raw object) backend
    pub secondary_storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_public_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Payment provider
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub razorpay_api_url: String,
    // CAPTCHA; verification is skipped when no secret is configured
    pub recaptcha_secret_key: Option<String>,
    pub recaptcha_min_score: f64,
    pub recaptcha_verify_url: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

impl Config {
    fn inner(&self) -> &AppConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AppConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().environment)
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn app_url(&self) -> &str {
        self.inner().app_url.trim_end_matches('/')
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.inner().max_request_body_bytes
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().http_concurrency_limit
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.inner().bcrypt_cost
    }

    pub fn cloudinary_enabled(&self) -> bool {
        let c = self.inner();
        c.cloudinary_cloud_name.is_some()
            && c.cloudinary_api_key.is_some()
            && c.cloudinary_api_secret.is_some()
    }

    pub fn cloudinary_cloud_name(&self) -> Option<&str> {
        self.inner().cloudinary_cloud_name.as_deref()
    }

    pub fn cloudinary_api_key(&self) -> Option<&str> {
        self.inner().cloudinary_api_key.as_deref()
    }

    pub fn cloudinary_api_secret(&self) -> Option<&str> {
        self.inner().cloudinary_api_secret.as_deref()
    }

    pub fn cloudinary_folder(&self) -> &str {
        &self.inner().cloudinary_folder
    }

    pub fn cloudinary_api_url(&self) -> &str {
        &self.inner().cloudinary_api_url
    }

    pub fn secondary_storage_backend(&self) -> StorageBackend {
        self.inner().secondary_storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> &str {
        &self.inner().s3_region
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn s3_public_url(&self) -> Option<&str> {
        self.inner().s3_public_url.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn razorpay_key_id(&self) -> &str {
        &self.inner().razorpay_key_id
    }

    pub fn razorpay_key_secret(&self) -> &str {
        &self.inner().razorpay_key_secret
    }

    pub fn razorpay_webhook_secret(&self) -> &str {
        &self.inner().razorpay_webhook_secret
    }

    pub fn razorpay_api_url(&self) -> &str {
        &self.inner().razorpay_api_url
    }

    pub fn recaptcha_secret_key(&self) -> Option<&str> {
        self.inner().recaptcha_secret_key.as_deref()
    }

    pub fn recaptcha_min_score(&self) -> f64 {
        self.inner().recaptcha_min_score
    }

    pub fn recaptcha_verify_url(&self) -> &str {
        &self.inner().recaptcha_verify_url
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);
        let max_request_body_mb = env::var("MAX_REQUEST_BODY_MB")
            .unwrap_or_else(|_| MAX_REQUEST_BODY_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_REQUEST_BODY_MB);

        let secondary_storage_backend = match optional_var("SECONDARY_STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        Ok(AppConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            app_url: env::var("APP_URL")
                .or_else(|_| env::var("NEXT_PUBLIC_APP_URL"))
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            max_request_body_bytes: max_request_body_mb * 1024 * 1024,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| DEFAULT_BCRYPT_COST.to_string())
                .parse()
                .unwrap_or(DEFAULT_BCRYPT_COST),
            cloudinary_cloud_name: optional_var("CLOUDINARY_CLOUD_NAME"),
            cloudinary_api_key: optional_var("CLOUDINARY_API_KEY"),
            cloudinary_api_secret: optional_var("CLOUDINARY_API_SECRET"),
            cloudinary_folder: env::var("CLOUDINARY_FOLDER")
                .unwrap_or_else(|_| "sharedrop".to_string()),
            cloudinary_api_url: env::var("CLOUDINARY_API_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com".to_string()),
            secondary_storage_backend,
            s3_bucket: optional_var("S3_BUCKET"),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),
            s3_endpoint: optional_var("S3_ENDPOINT"),
            s3_public_url: optional_var("S3_PUBLIC_URL"),
            local_storage_path: optional_var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: optional_var("LOCAL_STORAGE_BASE_URL"),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")
                .map_err(|_| anyhow::anyhow!("RAZORPAY_KEY_ID must be set"))?,
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")
                .map_err(|_| anyhow::anyhow!("RAZORPAY_KEY_SECRET must be set"))?,
            razorpay_webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")
                .map_err(|_| anyhow::anyhow!("RAZORPAY_WEBHOOK_SECRET must be set"))?,
            razorpay_api_url: env::var("RAZORPAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            recaptcha_secret_key: optional_var("RECAPTCHA_SECRET_KEY"),
            recaptcha_min_score: env::var("RECAPTCHA_MIN_SCORE")
                .unwrap_or_else(|_| RECAPTCHA_MIN_SCORE.to_string())
                .parse()
                .unwrap_or(RECAPTCHA_MIN_SCORE),
            recaptcha_verify_url: env::var("RECAPTCHA_VERIFY_URL").unwrap_or_else(|_| {
                "https://www.google.com/recaptcha/api/siteverify".to_string()
            }),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(anyhow::anyhow!("BCRYPT_COST must be between 4 and 31"));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!(
                "HTTP_CONCURRENCY_LIMIT must be greater than 0"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.razorpay_key_secret.is_empty() || self.razorpay_webhook_secret.is_empty() {
            return Err(anyhow::anyhow!(
                "RAZORPAY_KEY_SECRET and RAZORPAY_WEBHOOK_SECRET must not be empty"
            ));
        }

        match self.secondary_storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_public_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_PUBLIC_URL must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Cloudinary => {
                return Err(anyhow::anyhow!(
                    "SECONDARY_STORAGE_BACKEND must be 's3' or 'local'"
                ));
            }
        }

        Ok(())
    }
}
