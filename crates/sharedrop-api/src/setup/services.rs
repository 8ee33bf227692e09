//! Service and repository wiring

use crate::services::UploadService;
use crate::state::{AppState, DbState, UploadLimits};
use anyhow::Result;
use sharedrop_core::Config;
use sharedrop_db::{PaymentRepository, PgPaymentRepository, PgUploadRepository, UploadRepository};
use sharedrop_services::{create_captcha_verifier, PaymentProvider, PaymentService, RazorpayClient};
use sharedrop_storage::StorageRouter;
use sqlx::PgPool;
use std::sync::Arc;

/// Construct every client and service and assemble the shared state.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: StorageRouter,
) -> Result<Arc<AppState>> {
    let uploads: Arc<dyn UploadRepository> = Arc::new(PgUploadRepository::new(pool.clone()));
    let payments: Arc<dyn PaymentRepository> = Arc::new(PgPaymentRepository::new(pool.clone()));

    let provider: Arc<dyn PaymentProvider> = Arc::new(RazorpayClient::new(
        config.razorpay_key_id().to_string(),
        config.razorpay_key_secret().to_string(),
        config.razorpay_api_url().to_string(),
    )?);
    let captcha = create_captcha_verifier(config)?;

    let upload_service = UploadService::new(
        uploads.clone(),
        storage,
        captcha,
        config.bcrypt_cost(),
        config.app_url().to_string(),
    );
    let payment_service = PaymentService::new(
        uploads,
        payments,
        provider,
        config.razorpay_key_secret().to_string(),
        config.razorpay_webhook_secret().to_string(),
    );

    tracing::info!("Services initialized");

    Ok(Arc::new(AppState {
        db: DbState { pool: Some(pool) },
        uploads: upload_service,
        payments: payment_service,
        limits: UploadLimits {
            max_file_size: config.max_file_size_bytes(),
        },
    }))
}
