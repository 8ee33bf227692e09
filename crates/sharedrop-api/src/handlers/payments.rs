use crate::constants::WEBHOOK_SIGNATURE_HEADER;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use sharedrop_core::models::{
    CompletionOutcome, CreateOrderRequest, CreateOrderResponse, SuccessResponse,
    VerifyPaymentRequest, WebhookAck,
};
use std::sync::Arc;

/// Create a provider order for lifetime access to an upload.
#[utoipa::path(
    post,
    path = "/api/payments/create",
    tag = "payments",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Upload already paid or uploadId missing", body = ErrorResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse),
        (status = 502, description = "Payment provider error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(upload_id = %request.upload_id))]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let order = state
        .payments
        .create_order(&request.upload_id, request.reason.as_deref())
        .await?;
    Ok(Json(order))
}

/// Checkout callback: verify the signature and grant lifetime access.
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    tag = "payments",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = SuccessResponse),
        (status = 400, description = "Missing fields, order mismatch, or invalid signature", body = ErrorResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state.payments.verify_checkout(request).await?;
    if outcome == CompletionOutcome::AlreadyCompleted {
        tracing::debug!("Payment was already completed");
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// Provider webhook; the raw body is authenticated with `X-Razorpay-Signature`.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    tag = "payments",
    request_body(content = inline(Object), content_type = "application/json"),
    params(
        ("X-Razorpay-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state.payments.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck { received: true }))
}
