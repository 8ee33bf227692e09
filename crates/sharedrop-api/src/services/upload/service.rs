use super::types::{Bundle, IncomingFile, UploadForm};
use crate::error::storage_error_to_app;
use chrono::Utc;
use futures::future::join_all;
use sharedrop_core::access::{self, AccessDecision};
use sharedrop_core::expiration::compute_expiry;
use sharedrop_core::ids::generate_upload_id;
use sharedrop_core::models::{
    CreateUploadResponse, HistoryItem, HistoryResponse, NewStoredFile, NewTextBlock, NewUpload,
    PaymentSummary, StoredFileResponse, TextBlockResponse, TextBoxInput, UploadDetails,
    UploadDetailsResponse, UploadRecord, UploadView, VerifyPasswordResponse,
};
use sharedrop_core::AppError;
use sharedrop_db::UploadRepository;
use sharedrop_services::{build_bundle, CaptchaVerifier};
use sharedrop_storage::StorageRouter;
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

/// Coordinates the upload lifecycle across storage, repositories, and the access rules.
#[derive(Clone)]
pub struct UploadService {
    repository: Arc<dyn UploadRepository>,
    storage: StorageRouter,
    captcha: Arc<dyn CaptchaVerifier>,
    bcrypt_cost: u32,
    app_url: String,
}

impl UploadService {
    pub fn new(
        repository: Arc<dyn UploadRepository>,
        storage: StorageRouter,
        captcha: Arc<dyn CaptchaVerifier>,
        bcrypt_cost: u32,
        app_url: String,
    ) -> Self {
        Self {
            repository,
            storage,
            captcha,
            bcrypt_cost,
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Validate, store every file, and persist the record in one transaction.
    ///
    /// Files that no backend accepts are reported in `failed_files` and left out of
    /// the record. If nothing at all could be kept the upload fails.
    #[tracing::instrument(
        skip(self, form),
        fields(
            device_id = %form.metadata.device_id,
            file_count = form.files.len(),
            is_private = form.metadata.is_private
        )
    )]
    pub async fn create(&self, form: UploadForm) -> Result<CreateUploadResponse, AppError> {
        let UploadForm { metadata, files } = form;
        metadata.validate()?;

        let password = metadata
            .password
            .as_deref()
            .filter(|p| !p.trim().is_empty());
        if metadata.is_private && password.is_none() {
            return Err(AppError::BadRequest(
                "Password is required for private uploads".to_string(),
            ));
        }
        if let Some(password) = password.filter(|_| metadata.is_private) {
            access::check_password_length(password)?;
        }

        let text_blocks = collect_text_blocks(&metadata.text_boxes);
        if files.is_empty() && text_blocks.is_empty() {
            return Err(AppError::BadRequest(
                "No files or text content provided".to_string(),
            ));
        }

        self.captcha
            .verify(metadata.captcha_token.as_deref())
            .await?;

        let password_hash = match (metadata.is_private, password) {
            (true, Some(password)) => Some(self.hash_password(password.to_string()).await?),
            _ => None,
        };

        let started = Instant::now();
        let (stored, failed_files) = self.store_files(files).await;
        tracing::debug!(
            stored = stored.len(),
            failed = failed_files.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Files stored"
        );

        if stored.is_empty() && text_blocks.is_empty() {
            return Err(AppError::Storage(
                "None of the submitted files could be stored".to_string(),
            ));
        }

        let created_at = Utc::now();
        let new_upload = NewUpload {
            upload_id: generate_upload_id(),
            device_id: metadata.device_id.clone(),
            is_private: metadata.is_private,
            password_hash,
            created_at,
            expires_at: compute_expiry(created_at),
            files: stored.clone(),
            text_blocks,
            create_pending_payment: metadata.is_private,
        };
        let file_count = stored.len();
        let text_count = new_upload.text_blocks.len();

        let record = match self.repository.create(new_upload).await {
            Ok(record) => record,
            Err(e) => {
                self.cleanup_stored(stored);
                return Err(e);
            }
        };

        tracing::info!(
            upload_id = %record.upload_id,
            files = file_count,
            "Upload created"
        );

        Ok(CreateUploadResponse {
            upload_id: record.upload_id,
            expires_at: record.expires_at,
            requires_payment: record.is_private,
            file_count,
            text_count,
            failed_files,
        })
    }

    /// Record with access state, files, text blocks, and payment summary.
    #[tracing::instrument(skip(self))]
    pub async fn details(&self, upload_id: &str) -> Result<UploadDetailsResponse, AppError> {
        let UploadDetails {
            record,
            files,
            text_blocks,
            payment,
        } = self.load(upload_id).await?;
        let decision = access::evaluate(&record);
        let (files, text_content) = content_of(files, text_blocks);

        Ok(UploadDetailsResponse {
            upload: view_of(&record, decision),
            files,
            text_content,
            payment: payment.map(PaymentSummary::from),
        })
    }

    /// Check the password of a private upload and release its content.
    ///
    /// A correct password on an expired, unpaid upload succeeds without content.
    #[tracing::instrument(skip(self, password))]
    pub async fn verify_password(
        &self,
        upload_id: &str,
        password: String,
    ) -> Result<VerifyPasswordResponse, AppError> {
        let details = self.load(upload_id).await?;
        self.check_password(&details.record, password).await?;

        let decision = access::evaluate(&details.record);
        let (files, text_content) = if decision.can_access {
            content_of(details.files, details.text_blocks)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(VerifyPasswordResponse {
            success: true,
            can_access: decision.can_access,
            files,
            text_content,
        })
    }

    /// Delete an upload owned by `device_id`, then its stored objects (best effort).
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, upload_id: &str, device_id: &str) -> Result<(), AppError> {
        let details = self.load(upload_id).await?;
        if details.record.device_id != device_id {
            return Err(AppError::Forbidden(
                "Only the uploading device can delete this upload".to_string(),
            ));
        }

        if !self.repository.delete(details.record.id).await? {
            return Err(AppError::NotFound("Upload not found".to_string()));
        }

        let deletions = details.files.iter().map(|file| async move {
            if let Err(e) = self.storage.delete(file.backend, &file.storage_key).await {
                tracing::warn!(
                    error = %e,
                    backend = %file.backend,
                    storage_key = %file.storage_key,
                    "Failed to delete stored object"
                );
            }
        });
        join_all(deletions).await;

        Ok(())
    }

    /// Uploads created by a device, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, device_id: &str) -> Result<HistoryResponse, AppError> {
        if device_id.trim().is_empty() {
            return Err(AppError::BadRequest("deviceId is required".to_string()));
        }

        let history = self
            .repository
            .list_by_device(device_id)
            .await?
            .into_iter()
            .map(|summary| HistoryItem {
                share_url: self.share_url(&summary.upload_id),
                upload_id: summary.upload_id,
                file_count: summary.file_count,
                text_box_count: summary.text_count,
                is_private: summary.is_private,
                is_paid: summary.is_paid,
                expires_at: summary.expires_at,
                created_at: summary.created_at,
            })
            .collect();

        Ok(HistoryResponse { history })
    }

    /// Build the ZIP archive of an accessible upload.
    ///
    /// Private uploads also need their password.
    #[tracing::instrument(skip(self, password))]
    pub async fn bundle(
        &self,
        upload_id: &str,
        password: Option<String>,
    ) -> Result<Bundle, AppError> {
        let details = self.load(upload_id).await?;
        access::ensure_accessible(&details.record)?;

        if details.record.is_private {
            let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
                AppError::Unauthorized("Password required for private uploads".to_string())
            })?;
            self.check_password(&details.record, password).await?;
        }

        let data = build_bundle(&self.storage, &details.files, &details.text_blocks).await?;

        Ok(Bundle {
            file_name: format!("upload-{}.zip", details.record.upload_id),
            data,
        })
    }

    pub fn share_url(&self, upload_id: &str) -> String {
        format!("{}/view/{}", self.app_url, upload_id)
    }

    async fn load(&self, upload_id: &str) -> Result<UploadDetails, AppError> {
        self.repository
            .get_details(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || access::hash_password(&password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn check_password(
        &self,
        record: &UploadRecord,
        candidate: String,
    ) -> Result<(), AppError> {
        let record = record.clone();
        tokio::task::spawn_blocking(move || access::verify_password(&record, &candidate))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
    }

    /// Store all files concurrently; one failure never cancels the others.
    async fn store_files(&self, files: Vec<IncomingFile>) -> (Vec<NewStoredFile>, Vec<String>) {
        let results = join_all(files.into_iter().map(|file| async move {
            let name = file.original_name.clone();
            let result = self
                .storage
                .store(file.data, &file.original_name, &file.mime_type)
                .await;
            (name, result)
        }))
        .await;

        let mut stored = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(file) => stored.push(file),
                Err(e) => {
                    let e = storage_error_to_app(e);
                    tracing::error!(error = %e, file_name = %name, "File could not be stored");
                    failed.push(name);
                }
            }
        }
        (stored, failed)
    }

    fn cleanup_stored(&self, stored: Vec<NewStoredFile>) {
        let storage = self.storage.clone();
        tokio::spawn(async move {
            for file in stored {
                if let Err(e) = storage.delete(file.backend, &file.storage_key).await {
                    tracing::debug!(
                        error = %e,
                        storage_key = %file.storage_key,
                        "Failed to cleanup stored file after DB error"
                    );
                }
            }
        });
    }
}

/// Drop blank boxes and default missing titles to `Text {n}`.
fn collect_text_blocks(boxes: &[TextBoxInput]) -> Vec<NewTextBlock> {
    boxes
        .iter()
        .filter(|b| !b.content.trim().is_empty())
        .enumerate()
        .map(|(i, b)| NewTextBlock {
            title: b
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("Text {}", i + 1)),
            content: b.content.clone(),
        })
        .collect()
}

fn view_of(record: &UploadRecord, decision: AccessDecision) -> UploadView {
    UploadView {
        upload_id: record.upload_id.clone(),
        is_private: record.is_private,
        is_paid: record.is_paid,
        expires_at: record.expires_at,
        expired: decision.expired,
        can_access: decision.can_access,
        created_at: record.created_at,
    }
}

fn content_of(
    files: Vec<sharedrop_core::models::StoredFile>,
    text_blocks: Vec<sharedrop_core::models::TextBlock>,
) -> (Vec<StoredFileResponse>, Vec<TextBlockResponse>) {
    (
        files.into_iter().map(StoredFileResponse::from).collect(),
        text_blocks
            .into_iter()
            .map(TextBlockResponse::from)
            .collect(),
    )
}
