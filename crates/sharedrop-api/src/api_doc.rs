//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use sharedrop_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sharedrop API",
        version = "0.1.0",
        description = "Share files and text behind a link. Uploads are readable for 24 hours unless lifetime access is purchased; private uploads also require their password."
    ),
    paths(
        handlers::upload_create::create_upload,
        handlers::upload_get::get_upload,
        handlers::upload_password::verify_upload_password,
        handlers::upload_delete::delete_upload,
        handlers::history::list_history,
        handlers::bundle::download_bundle,
        handlers::payments::create_order,
        handlers::payments::verify_payment,
        handlers::payments::payment_webhook,
    ),
    components(
        schemas(
            models::CreateUploadResponse,
            models::UploadMetadata,
            models::TextBoxInput,
            models::UploadView,
            models::UploadDetailsResponse,
            models::StoredFileResponse,
            models::TextBlockResponse,
            models::FileCategory,
            models::VerifyPasswordRequest,
            models::VerifyPasswordResponse,
            models::DeleteUploadRequest,
            models::HistoryItem,
            models::HistoryResponse,
            models::SuccessResponse,
            models::PaymentStatus,
            models::PaymentSummary,
            models::CreateOrderRequest,
            models::CreateOrderResponse,
            models::VerifyPaymentRequest,
            models::WebhookAck,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Upload creation, retrieval, password checks, deletion, and ZIP bundles"),
        (name = "payments", description = "Lifetime access orders, checkout verification, and provider webhooks")
    )
)]
pub struct ApiDoc;
