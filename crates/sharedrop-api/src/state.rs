//! Application state and sub-state extractors.

use crate::services::UploadService;
use sharedrop_services::PaymentService;
use sqlx::PgPool;
use std::sync::Arc;

/// Database handle used by the health check.
///
/// `pool` is `None` when the repositories are not Postgres-backed (tests).
#[derive(Clone)]
pub struct DbState {
    pub pool: Option<PgPool>,
}

/// Upload limits enforced while reading multipart bodies.
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_file_size: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub uploads: UploadService,
    pub payments: PaymentService,
    pub limits: UploadLimits,
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}
