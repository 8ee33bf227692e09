//! CAPTCHA verification for upload creation
//!
//! Tokens are checked against the reCAPTCHA `siteverify` endpoint. Transport
//! failures count as a failed verification.

use async_trait::async_trait;
use serde::Deserialize;
use sharedrop_core::{AppError, Config};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: Option<&str>) -> Result<(), AppError>;
}

/// Accepts every request; used when no secret key is configured.
pub struct DisabledCaptcha;

#[async_trait]
impl CaptchaVerifier for DisabledCaptcha {
    async fn verify(&self, _token: Option<&str>) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    min_score: f64,
    verify_url: String,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl RecaptchaVerifier {
    pub fn new(secret: String, min_score: f64, verify_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            secret,
            min_score,
            verify_url,
        })
    }

    async fn site_verify(&self, token: &str) -> Result<SiteVerifyResponse, reqwest::Error> {
        self.client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: Option<&str>) -> Result<(), AppError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(AppError::BadRequest("CAPTCHA token is required".to_string()));
        };

        let response = match self.site_verify(token).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "CAPTCHA verification request failed");
                return Err(AppError::BadRequest("CAPTCHA verification failed".to_string()));
            }
        };

        let score = response.score.unwrap_or(0.0);
        if response.success && score > self.min_score {
            return Ok(());
        }

        tracing::info!(
            success = response.success,
            score,
            errors = ?response.error_codes,
            "CAPTCHA rejected"
        );
        Err(AppError::BadRequest("CAPTCHA verification failed".to_string()))
    }
}

/// Build the verifier from configuration; disabled when no secret key is set.
pub fn create_captcha_verifier(config: &Config) -> Result<Arc<dyn CaptchaVerifier>, AppError> {
    match config.recaptcha_secret_key() {
        Some(secret) => Ok(Arc::new(RecaptchaVerifier::new(
            secret.to_string(),
            config.recaptcha_min_score(),
            config.recaptcha_verify_url().to_string(),
        )?)),
        None => {
            tracing::warn!("RECAPTCHA_SECRET_KEY not set, CAPTCHA verification disabled");
            Ok(Arc::new(DisabledCaptcha))
        }
    }
}
