//! Domain route groups (uploads, payments, bundles, history).

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/uploads", API_PREFIX),
            post(handlers::upload_create::create_upload),
        )
        .route(
            &format!("{}/uploads/{{id}}", API_PREFIX),
            get(handlers::upload_get::get_upload)
                .post(handlers::upload_password::verify_upload_password)
                .delete(handlers::upload_delete::delete_upload),
        )
}

pub fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/payments/create", API_PREFIX),
            post(handlers::payments::create_order),
        )
        .route(
            &format!("{}/payments/verify", API_PREFIX),
            post(handlers::payments::verify_payment),
        )
        .route(
            &format!("{}/payments/webhook", API_PREFIX),
            post(handlers::payments::payment_webhook),
        )
}

pub fn bundle_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/bundle/{{id}}", API_PREFIX),
        get(handlers::bundle::download_bundle),
    )
}

pub fn history_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/history", API_PREFIX),
        get(handlers::history::list_history),
    )
}
