use async_trait::async_trait;
use sharedrop_core::models::{
    NewUpload, PaymentAttempt, PaymentStatus, StoredFile, TextBlock, UploadDetails,
    UploadRecord, UploadSummary, LIFETIME_ACCESS_AMOUNT, LIFETIME_ACCESS_CURRENCY,
};
use sharedrop_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Maximum uploads returned by a history listing
pub const HISTORY_LIMIT: i64 = 200;

/// Upload persistence
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Insert the record with its files, text blocks, and optional pending payment
    /// in one transaction.
    async fn create(&self, upload: NewUpload) -> Result<UploadRecord, AppError>;

    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<UploadRecord>, AppError>;

    /// Record plus files, text blocks (by position), and payment attempt.
    async fn get_details(&self, upload_id: &str) -> Result<Option<UploadDetails>, AppError>;

    /// Newest first.
    async fn list_by_device(&self, device_id: &str) -> Result<Vec<UploadSummary>, AppError>;

    /// Delete by primary key; owned rows cascade. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgUploadRepository {
    pool: PgPool,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    #[tracing::instrument(
        skip(self, upload),
        fields(db.table = "uploads", db.operation = "insert", upload_id = %upload.upload_id)
    )]
    async fn create(&self, upload: NewUpload) -> Result<UploadRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();

        let record = sqlx::query_as::<Postgres, UploadRecord>(
            r#"
            INSERT INTO uploads (id, upload_id, device_id, is_private, password_hash, is_paid, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
            RETURNING id, upload_id, device_id, is_private, password_hash, is_paid, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(&upload.upload_id)
        .bind(&upload.device_id)
        .bind(upload.is_private)
        .bind(&upload.password_hash)
        .bind(upload.expires_at)
        .bind(upload.created_at)
        .fetch_one(&mut *tx)
        .await?;

        for file in &upload.files {
            sqlx::query(
                r#"
                INSERT INTO stored_files
                    (id, upload_id, original_name, mime_type, size_bytes, category, backend, storage_key, url, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&file.original_name)
            .bind(&file.mime_type)
            .bind(file.size_bytes)
            .bind(file.category)
            .bind(file.backend)
            .bind(&file.storage_key)
            .bind(&file.url)
            .bind(upload.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for (position, block) in upload.text_blocks.iter().enumerate() {
            sqlx::query(
                "INSERT INTO text_blocks (id, upload_id, title, content, position) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&block.title)
            .bind(&block.content)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        if upload.create_pending_payment {
            sqlx::query(
                r#"
                INSERT INTO payments (id, upload_id, order_id, amount, currency, status, created_at, updated_at)
                VALUES ($1, $2, '', $3, $4, $5, $6, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(LIFETIME_ACCESS_AMOUNT)
            .bind(LIFETIME_ACCESS_CURRENCY)
            .bind(PaymentStatus::Pending)
            .bind(upload.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            files = upload.files.len(),
            text_blocks = upload.text_blocks.len(),
            "Upload record created"
        );

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<UploadRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, UploadRecord>(
            r#"
            SELECT id, upload_id, device_id, is_private, password_hash, is_paid, expires_at, created_at
            FROM uploads
            WHERE upload_id = $1
            "#,
        )
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn get_details(&self, upload_id: &str) -> Result<Option<UploadDetails>, AppError> {
        let Some(record) = self.find_by_upload_id(upload_id).await? else {
            return Ok(None);
        };

        let files = sqlx::query_as::<Postgres, StoredFile>(
            r#"
            SELECT id, upload_id, original_name, mime_type, size_bytes, category, backend, storage_key, url, created_at
            FROM stored_files
            WHERE upload_id = $1
            ORDER BY created_at, original_name
            "#,
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await?;

        let text_blocks = sqlx::query_as::<Postgres, TextBlock>(
            "SELECT id, upload_id, title, content, position FROM text_blocks WHERE upload_id = $1 ORDER BY position",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await?;

        let payment = sqlx::query_as::<Postgres, PaymentAttempt>(
            r#"
            SELECT id, upload_id, order_id, payment_id, amount, currency, status, created_at, updated_at
            FROM payments
            WHERE upload_id = $1
            "#,
        )
        .bind(record.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(UploadDetails {
            record,
            files,
            text_blocks,
            payment,
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn list_by_device(&self, device_id: &str) -> Result<Vec<UploadSummary>, AppError> {
        let rows = sqlx::query_as::<Postgres, UploadSummary>(
            r#"
            SELECT
                u.upload_id,
                u.is_private,
                u.is_paid,
                u.expires_at,
                u.created_at,
                (SELECT COUNT(*) FROM stored_files f WHERE f.upload_id = u.id) AS file_count,
                (SELECT COUNT(*) FROM text_blocks t WHERE t.upload_id = u.id) AS text_count
            FROM uploads u
            WHERE u.device_id = $1
            ORDER BY u.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(device_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM uploads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("Upload deleted");
        }
        Ok(deleted)
    }
}
