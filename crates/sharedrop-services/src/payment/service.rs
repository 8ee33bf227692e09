use super::provider::{OrderRequest, PaymentProvider};
use super::signature::{self, SignatureError};
use chrono::Utc;
use serde::Deserialize;
use sharedrop_core::models::{
    CompletionOutcome, CreateOrderResponse, PaymentStatus, VerifyPaymentRequest,
    DEFAULT_PAYMENT_REASON,
};
use sharedrop_core::AppError;
use sharedrop_db::{PaymentRepository, UploadRepository};
use std::sync::Arc;

const CAPTURED_EVENT: &str = "payment.captured";

/// Orchestrates order creation, checkout verification, and webhook handling.
#[derive(Clone)]
pub struct PaymentService {
    uploads: Arc<dyn UploadRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: Arc<dyn PaymentProvider>,
    key_secret: String,
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
struct PaymentWrapper {
    entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
}

impl PaymentService {
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
        key_secret: String,
        webhook_secret: String,
    ) -> Self {
        Self {
            uploads,
            payments,
            provider,
            key_secret,
            webhook_secret,
        }
    }

    /// Create (or refresh) the provider order for an unpaid upload.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        upload_id: &str,
        reason: Option<&str>,
    ) -> Result<CreateOrderResponse, AppError> {
        if upload_id.trim().is_empty() {
            return Err(AppError::BadRequest("uploadId is required".to_string()));
        }

        let record = self
            .uploads
            .find_by_upload_id(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))?;

        if record.is_paid {
            return Err(AppError::BadRequest(
                "Upload already has lifetime access".to_string(),
            ));
        }

        let attempt = self.payments.ensure_attempt(record.id).await?;
        if attempt.status == PaymentStatus::Completed {
            return Err(AppError::BadRequest(
                "Upload already has lifetime access".to_string(),
            ));
        }

        let request = OrderRequest {
            amount: attempt.amount,
            currency: attempt.currency.clone(),
            receipt: format!("upload_{}_{}", record.upload_id, Utc::now().timestamp_millis()),
            upload_id: record.upload_id.clone(),
            reason: reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(DEFAULT_PAYMENT_REASON)
                .to_string(),
        };
        let order = self.provider.create_order(&request).await?;

        let attempt = self
            .payments
            .set_order(attempt.id, &order.id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Upload already has lifetime access".to_string())
            })?;

        tracing::info!(order_id = %attempt.order_id, "Payment order bound to upload");

        Ok(CreateOrderResponse {
            order_id: attempt.order_id,
            amount: attempt.amount,
            currency: attempt.currency,
            key: self.provider.key_id().to_string(),
        })
    }

    /// Verify the checkout callback and complete the payment.
    #[tracing::instrument(skip(self, request), fields(order_id = ?request.razorpay_order_id))]
    pub async fn verify_checkout(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<CompletionOutcome, AppError> {
        let (Some(order_id), Some(payment_id), Some(signature), Some(upload_id)) = (
            non_empty(request.razorpay_order_id),
            non_empty(request.razorpay_payment_id),
            non_empty(request.razorpay_signature),
            non_empty(request.upload_id),
        ) else {
            return Err(AppError::BadRequest(
                "Missing payment verification fields".to_string(),
            ));
        };

        let message = signature::checkout_message(&order_id, &payment_id);
        signature::verify(&self.key_secret, message.as_bytes(), &signature).map_err(|e| {
            tracing::warn!(error = %e, "Checkout signature rejected");
            AppError::from(e)
        })?;

        let record = self
            .uploads
            .find_by_upload_id(&upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))?;

        // Any order issued for this upload counts, including one superseded by a retry.
        let attempt = self.payments.find_by_order_id(&order_id).await?;
        if attempt.map(|a| a.upload_id) != Some(record.id) {
            return Err(AppError::BadRequest(
                "Order does not belong to this upload".to_string(),
            ));
        }

        let outcome = self
            .payments
            .complete(&order_id, &payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment order not found".to_string()))?;

        tracing::info!(outcome = ?outcome, "Checkout payment verified");
        Ok(outcome)
    }

    /// Apply a provider webhook. Only a missing or bad signature is an error;
    /// everything else is acknowledged.
    #[tracing::instrument(skip(self, body, signature_header), fields(body_len = body.len()))]
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), AppError> {
        let signature = signature_header.ok_or(SignatureError::Missing)?;
        signature::verify(&self.webhook_secret, body, signature).map_err(|e| {
            tracing::warn!(error = %e, "Webhook signature rejected");
            AppError::from(e)
        })?;

        let event: WebhookEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparsable webhook body");
                return Ok(());
            }
        };

        let Some(PaymentWrapper { entity }) = event.payload.payment else {
            tracing::debug!(event = %event.event, "Webhook without payment entity");
            return Ok(());
        };
        let Some(order_id) = non_empty(entity.order_id) else {
            tracing::debug!(event = %event.event, "Webhook payment without order id");
            return Ok(());
        };

        if event.event == CAPTURED_EVENT {
            match self.payments.complete(&order_id, &entity.id).await? {
                Some(outcome) => {
                    tracing::info!(order_id = %order_id, outcome = ?outcome, "Webhook completed payment")
                }
                None => tracing::warn!(order_id = %order_id, "Webhook for unknown order"),
            }
        } else {
            match self.payments.fail(&order_id, Some(&entity.id)).await? {
                Some(status) => tracing::info!(
                    order_id = %order_id,
                    event = %event.event,
                    status = %status,
                    "Webhook recorded payment event"
                ),
                None => tracing::warn!(order_id = %order_id, "Webhook for unknown order"),
            }
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::provider::ProviderOrder;
    use async_trait::async_trait;
    use sharedrop_core::expiration::{compute_expiry, lifetime_sentinel};
    use sharedrop_core::models::{NewTextBlock, NewUpload};
    use sharedrop_db::test_helpers::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY_SECRET: &str = "key_secret";
    const WEBHOOK_SECRET: &str = "whsec";

    struct FakeProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder, AppError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ProviderOrder {
                id: format!("order_{}", n),
                amount: request.amount,
                currency: request.currency.clone(),
            })
        }

        fn key_id(&self) -> &str {
            "rzp_test_key"
        }
    }

    async fn setup(upload_id: &str) -> (PaymentService, InMemoryStore) {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .create(NewUpload {
                upload_id: upload_id.to_string(),
                device_id: "dev".to_string(),
                is_private: false,
                password_hash: None,
                created_at: now,
                expires_at: compute_expiry(now),
                files: vec![],
                text_blocks: vec![NewTextBlock {
                    title: "Text 1".to_string(),
                    content: "<p>hi</p>".to_string(),
                }],
                create_pending_payment: false,
            })
            .await
            .unwrap();

        let service = PaymentService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FakeProvider {
                calls: AtomicUsize::new(0),
            }),
            KEY_SECRET.to_string(),
            WEBHOOK_SECRET.to_string(),
        );
        (service, store)
    }

    fn checkout(order_id: &str, payment_id: &str, upload_id: &str) -> VerifyPaymentRequest {
        let message = signature::checkout_message(order_id, payment_id);
        VerifyPaymentRequest {
            razorpay_order_id: Some(order_id.to_string()),
            razorpay_payment_id: Some(payment_id.to_string()),
            razorpay_signature: Some(signature::sign(KEY_SECRET, message.as_bytes()).unwrap()),
            upload_id: Some(upload_id.to_string()),
        }
    }

    fn webhook_body(event: &str, order_id: &str) -> Vec<u8> {
        serde_json::json!({
            "event": event,
            "payload": {"payment": {"entity": {"id": "pay_wh", "order_id": order_id}}}
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn create_order_binds_provider_order() {
        let (service, store) = setup("upload000001").await;
        let response = service.create_order("upload000001", None).await.unwrap();

        assert_eq!(response.order_id, "order_1");
        assert_eq!(response.amount, 200);
        assert_eq!(response.currency, "INR");
        assert_eq!(response.key, "rzp_test_key");
        let attempt = store.payment_for("upload000001").unwrap();
        assert_eq!(attempt.order_id, "order_1");
        assert_eq!(attempt.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn create_order_unknown_upload_is_not_found() {
        let (service, _) = setup("upload000001").await;
        let result = service.create_order("missing00000", None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn verify_then_webhook_is_idempotent() {
        let (service, store) = setup("upload000001").await;
        let order = service.create_order("upload000001", None).await.unwrap();

        let outcome = service
            .verify_checkout(checkout(&order.order_id, "pay_1", "upload000001"))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Applied);

        let body = webhook_body("payment.captured", &order.order_id);
        let sig = signature::sign(WEBHOOK_SECRET, &body).unwrap();
        service.handle_webhook(&body, Some(&sig)).await.unwrap();

        let record = store.find_by_upload_id("upload000001").await.unwrap().unwrap();
        assert!(record.is_paid);
        assert_eq!(record.expires_at, lifetime_sentinel());
        assert_eq!(
            store.payment_for("upload000001").unwrap().status,
            PaymentStatus::Completed
        );

        let again = service.create_order("upload000001", None).await;
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn failure_webhook_does_not_downgrade_completed() {
        let (service, store) = setup("upload000001").await;
        let order = service.create_order("upload000001", None).await.unwrap();

        let captured = webhook_body("payment.captured", &order.order_id);
        let sig = signature::sign(WEBHOOK_SECRET, &captured).unwrap();
        service.handle_webhook(&captured, Some(&sig)).await.unwrap();

        let failed = webhook_body("payment.failed", &order.order_id);
        let sig = signature::sign(WEBHOOK_SECRET, &failed).unwrap();
        service.handle_webhook(&failed, Some(&sig)).await.unwrap();

        assert_eq!(
            store.payment_for("upload000001").unwrap().status,
            PaymentStatus::Completed
        );
    }

    #[tokio::test]
    async fn failed_attempt_can_be_retried_with_new_order() {
        let (service, store) = setup("upload000001").await;
        let first = service.create_order("upload000001", None).await.unwrap();

        let failed = webhook_body("payment.failed", &first.order_id);
        let sig = signature::sign(WEBHOOK_SECRET, &failed).unwrap();
        service.handle_webhook(&failed, Some(&sig)).await.unwrap();
        assert_eq!(
            store.payment_for("upload000001").unwrap().status,
            PaymentStatus::Failed
        );

        let second = service.create_order("upload000001", None).await.unwrap();
        assert_eq!(second.order_id, "order_2");
        let attempt = store.payment_for("upload000001").unwrap();
        assert_eq!(attempt.status, PaymentStatus::Pending);
        assert_eq!(attempt.payment_id, None);
    }

    #[tokio::test]
    async fn bad_checkout_signature_changes_nothing() {
        let (service, store) = setup("upload000001").await;
        let order = service.create_order("upload000001", None).await.unwrap();

        let mut request = checkout(&order.order_id, "pay_1", "upload000001");
        request.razorpay_signature = Some("deadbeef".to_string());
        let result = service.verify_checkout(request).await;

        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
        let record = store.find_by_upload_id("upload000001").await.unwrap().unwrap();
        assert!(!record.is_paid);
    }

    #[tokio::test]
    async fn checkout_missing_fields_is_bad_request() {
        let (service, _) = setup("upload000001").await;
        let mut request = checkout("order_1", "pay_1", "upload000001");
        request.razorpay_payment_id = None;
        let result = service.verify_checkout(request).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn checkout_for_foreign_order_is_rejected() {
        let (service, _) = setup("upload000001").await;
        service.create_order("upload000001", None).await.unwrap();

        let result = service
            .verify_checkout(checkout("order_other", "pay_1", "upload000001"))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn checkout_for_superseded_order_still_completes() {
        let (service, store) = setup("upload000001").await;
        let first = service.create_order("upload000001", None).await.unwrap();
        let second = service.create_order("upload000001", None).await.unwrap();
        assert_ne!(first.order_id, second.order_id);

        let outcome = service
            .verify_checkout(checkout(&first.order_id, "pay_1", "upload000001"))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Applied);

        let upload = store.find_by_upload_id("upload000001").await.unwrap().unwrap();
        assert!(upload.is_paid);
        assert_eq!(upload.expires_at, lifetime_sentinel());
    }

    #[tokio::test]
    async fn webhook_signature_is_required() {
        let (service, _) = setup("upload000001").await;
        let body = webhook_body("payment.captured", "order_1");

        let missing = service.handle_webhook(&body, None).await;
        assert!(matches!(missing, Err(AppError::InvalidSignature(_))));

        let wrong = service.handle_webhook(&body, Some("00")).await;
        assert!(matches!(wrong, Err(AppError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn webhook_for_unknown_order_or_garbage_is_acknowledged() {
        let (service, _) = setup("upload000001").await;

        let body = webhook_body("payment.captured", "order_unknown");
        let sig = signature::sign(WEBHOOK_SECRET, &body).unwrap();
        assert!(service.handle_webhook(&body, Some(&sig)).await.is_ok());

        let garbage = b"not json".to_vec();
        let sig = signature::sign(WEBHOOK_SECRET, &garbage).unwrap();
        assert!(service.handle_webhook(&garbage, Some(&sig)).await.is_ok());
    }
}
