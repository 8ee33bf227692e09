//! In-memory repository implementations for testing
//!
//! One store backs both traits because completing a payment rewrites its upload.

use crate::db::{PaymentRepository, UploadRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sharedrop_core::expiration::lifetime_sentinel;
use sharedrop_core::models::{
    CompletionOutcome, NewUpload, PaymentAttempt, PaymentStatus, StoredFile, TextBlock,
    UploadDetails, UploadRecord, UploadSummary, LIFETIME_ACCESS_AMOUNT,
    LIFETIME_ACCESS_CURRENCY,
};
use sharedrop_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    uploads: HashMap<Uuid, UploadRecord>,
    files: Vec<StoredFile>,
    text_blocks: Vec<TextBlock>,
    payments: HashMap<Uuid, PaymentAttempt>,
    /// Every order ever issued, keyed to the owning upload.
    orders: HashMap<String, Uuid>,
    fail_next_create: bool,
}

impl State {
    fn upload_pk(&self, upload_id: &str) -> Option<Uuid> {
        self.uploads
            .values()
            .find(|u| u.upload_id == upload_id)
            .map(|u| u.id)
    }

    fn payment_by_order_mut(&mut self, order_id: &str) -> Option<&mut PaymentAttempt> {
        let upload_pk = *self.orders.get(order_id)?;
        self.payments.get_mut(&upload_pk)
    }

    fn grant_lifetime(&mut self, upload_pk: Uuid) {
        if let Some(upload) = self.uploads.get_mut(&upload_pk) {
            upload.is_paid = true;
            upload.expires_at = lifetime_sentinel();
        }
    }
}

/// Shared in-memory store; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Rewrite an upload's expiry, e.g. to simulate the retention window passing.
    pub fn set_expires_at(&self, upload_id: &str, expires_at: DateTime<Utc>) {
        let mut state = self.lock();
        if let Some(pk) = state.upload_pk(upload_id) {
            if let Some(upload) = state.uploads.get_mut(&pk) {
                upload.expires_at = expires_at;
            }
        }
    }

    /// Make the next `create` fail with a database error.
    pub fn fail_next_create(&self) {
        self.lock().fail_next_create = true;
    }

    pub fn upload_count(&self) -> usize {
        self.lock().uploads.len()
    }

    pub fn payment_for(&self, upload_id: &str) -> Option<PaymentAttempt> {
        let state = self.lock();
        let pk = state.upload_pk(upload_id)?;
        state.payments.get(&pk).cloned()
    }
}

#[async_trait]
impl UploadRepository for InMemoryStore {
    async fn create(&self, upload: NewUpload) -> Result<UploadRecord, AppError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_create) {
            return Err(AppError::Internal("simulated database failure".to_string()));
        }
        if state.upload_pk(&upload.upload_id).is_some() {
            return Err(AppError::Internal(format!(
                "duplicate upload id {}",
                upload.upload_id
            )));
        }

        let id = Uuid::new_v4();
        let record = UploadRecord {
            id,
            upload_id: upload.upload_id,
            device_id: upload.device_id,
            is_private: upload.is_private,
            password_hash: upload.password_hash,
            is_paid: false,
            expires_at: upload.expires_at,
            created_at: upload.created_at,
        };

        for file in upload.files {
            state.files.push(StoredFile {
                id: Uuid::new_v4(),
                upload_id: id,
                original_name: file.original_name,
                mime_type: file.mime_type,
                size_bytes: file.size_bytes,
                category: file.category,
                backend: file.backend,
                storage_key: file.storage_key,
                url: file.url,
                created_at: upload.created_at,
            });
        }

        for (position, block) in upload.text_blocks.into_iter().enumerate() {
            state.text_blocks.push(TextBlock {
                id: Uuid::new_v4(),
                upload_id: id,
                title: block.title,
                content: block.content,
                position: position as i32,
            });
        }

        if upload.create_pending_payment {
            state.payments.insert(
                id,
                PaymentAttempt {
                    id: Uuid::new_v4(),
                    upload_id: id,
                    order_id: String::new(),
                    payment_id: None,
                    amount: LIFETIME_ACCESS_AMOUNT,
                    currency: LIFETIME_ACCESS_CURRENCY.to_string(),
                    status: PaymentStatus::Pending,
                    created_at: upload.created_at,
                    updated_at: upload.created_at,
                },
            );
        }

        state.uploads.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<UploadRecord>, AppError> {
        let state = self.lock();
        Ok(state
            .upload_pk(upload_id)
            .and_then(|pk| state.uploads.get(&pk).cloned()))
    }

    async fn get_details(&self, upload_id: &str) -> Result<Option<UploadDetails>, AppError> {
        let state = self.lock();
        let Some(record) = state
            .upload_pk(upload_id)
            .and_then(|pk| state.uploads.get(&pk).cloned())
        else {
            return Ok(None);
        };

        let files = state
            .files
            .iter()
            .filter(|f| f.upload_id == record.id)
            .cloned()
            .collect();
        let mut text_blocks: Vec<TextBlock> = state
            .text_blocks
            .iter()
            .filter(|t| t.upload_id == record.id)
            .cloned()
            .collect();
        text_blocks.sort_by_key(|t| t.position);
        let payment = state.payments.get(&record.id).cloned();

        Ok(Some(UploadDetails {
            record,
            files,
            text_blocks,
            payment,
        }))
    }

    async fn list_by_device(&self, device_id: &str) -> Result<Vec<UploadSummary>, AppError> {
        let state = self.lock();
        let mut rows: Vec<UploadSummary> = state
            .uploads
            .values()
            .filter(|u| u.device_id == device_id)
            .map(|u| UploadSummary {
                upload_id: u.upload_id.clone(),
                is_private: u.is_private,
                is_paid: u.is_paid,
                expires_at: u.expires_at,
                created_at: u.created_at,
                file_count: state.files.iter().filter(|f| f.upload_id == u.id).count() as i64,
                text_count: state
                    .text_blocks
                    .iter()
                    .filter(|t| t.upload_id == u.id)
                    .count() as i64,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(crate::db::upload::HISTORY_LIMIT as usize);
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.lock();
        if state.uploads.remove(&id).is_none() {
            return Ok(false);
        }
        state.files.retain(|f| f.upload_id != id);
        state.text_blocks.retain(|t| t.upload_id != id);
        state.payments.remove(&id);
        state.orders.retain(|_, upload_pk| *upload_pk != id);
        Ok(true)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn find_by_upload(&self, upload_pk: Uuid) -> Result<Option<PaymentAttempt>, AppError> {
        Ok(self.lock().payments.get(&upload_pk).cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentAttempt>, AppError> {
        let mut state = self.lock();
        Ok(state.payment_by_order_mut(order_id).map(|p| p.clone()))
    }

    async fn ensure_attempt(&self, upload_pk: Uuid) -> Result<PaymentAttempt, AppError> {
        let mut state = self.lock();
        let now = Utc::now();
        let attempt = state
            .payments
            .entry(upload_pk)
            .or_insert_with(|| PaymentAttempt {
                id: Uuid::new_v4(),
                upload_id: upload_pk,
                order_id: String::new(),
                payment_id: None,
                amount: LIFETIME_ACCESS_AMOUNT,
                currency: LIFETIME_ACCESS_CURRENCY.to_string(),
                status: PaymentStatus::Pending,
                created_at: now,
                updated_at: now,
            });
        Ok(attempt.clone())
    }

    async fn set_order(
        &self,
        attempt_id: Uuid,
        order_id: &str,
    ) -> Result<Option<PaymentAttempt>, AppError> {
        let mut state = self.lock();
        let Some(attempt) = state.payments.values_mut().find(|p| p.id == attempt_id) else {
            return Ok(None);
        };
        if attempt.status == PaymentStatus::Completed {
            return Ok(None);
        }
        attempt.order_id = order_id.to_string();
        attempt.payment_id = None;
        attempt.status = PaymentStatus::Pending;
        attempt.updated_at = Utc::now();
        let updated = attempt.clone();
        state
            .orders
            .insert(order_id.to_string(), updated.upload_id);
        Ok(Some(updated))
    }

    async fn complete(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Option<CompletionOutcome>, AppError> {
        let mut state = self.lock();
        let Some(attempt) = state.payment_by_order_mut(order_id) else {
            return Ok(None);
        };

        let outcome = if attempt.status == PaymentStatus::Completed {
            CompletionOutcome::AlreadyCompleted
        } else {
            attempt.status = PaymentStatus::Completed;
            attempt.order_id = order_id.to_string();
            attempt.payment_id = Some(payment_id.to_string());
            attempt.updated_at = Utc::now();
            CompletionOutcome::Applied
        };
        let upload_pk = attempt.upload_id;
        state.grant_lifetime(upload_pk);

        Ok(Some(outcome))
    }

    async fn fail(
        &self,
        order_id: &str,
        payment_id: Option<&str>,
    ) -> Result<Option<PaymentStatus>, AppError> {
        let mut state = self.lock();
        let Some(attempt) = state.payment_by_order_mut(order_id) else {
            return Ok(None);
        };
        if attempt.status != PaymentStatus::Completed && attempt.order_id == order_id {
            attempt.status = PaymentStatus::Failed;
            if let Some(payment_id) = payment_id {
                attempt.payment_id = Some(payment_id.to_string());
            }
            attempt.updated_at = Utc::now();
        }
        Ok(Some(attempt.status))
    }
}
