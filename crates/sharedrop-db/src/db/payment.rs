use async_trait::async_trait;
use sharedrop_core::expiration::lifetime_sentinel;
use sharedrop_core::models::{
    CompletionOutcome, PaymentAttempt, PaymentStatus, LIFETIME_ACCESS_AMOUNT,
    LIFETIME_ACCESS_CURRENCY,
};
use sharedrop_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const PAYMENT_COLUMNS: &str =
    "id, upload_id, order_id, payment_id, amount, currency, status, created_at, updated_at";

/// Payment attempt persistence
///
/// Transitions are conditional updates so the client callback and the provider
/// webhook can race without locks: a completed attempt is never rewritten.
///
/// Every order bound to an attempt is kept in `payment_orders`, so an order that
/// was superseded by a retry still resolves to its attempt.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_upload(&self, upload_pk: Uuid) -> Result<Option<PaymentAttempt>, AppError>;

    /// Attempt that was issued `order_id`, current or superseded.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentAttempt>, AppError>;

    /// Return the upload's attempt, creating a pending one if none exists.
    async fn ensure_attempt(&self, upload_pk: Uuid) -> Result<PaymentAttempt, AppError>;

    /// Bind a fresh provider order to the attempt and reset it to pending.
    /// The order is also recorded in the attempt's order history.
    /// Returns `None` if the attempt is already completed.
    async fn set_order(
        &self,
        attempt_id: Uuid,
        order_id: &str,
    ) -> Result<Option<PaymentAttempt>, AppError>;

    /// Mark the attempt that was issued `order_id` completed and grant the upload
    /// lifetime access. Returns `None` when no attempt was issued this order id.
    async fn complete(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Option<CompletionOutcome>, AppError>;

    /// Mark the attempt failed unless it is already completed or `order_id` has
    /// been superseded. Returns the resulting status, or `None` for an unknown order.
    async fn fail(
        &self,
        order_id: &str,
        payment_id: Option<&str>,
    ) -> Result<Option<PaymentStatus>, AppError>;
}

#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    #[tracing::instrument(skip(self), fields(db.table = "payments", db.operation = "select"))]
    async fn find_by_upload(&self, upload_pk: Uuid) -> Result<Option<PaymentAttempt>, AppError> {
        let attempt = sqlx::query_as::<Postgres, PaymentAttempt>(&format!(
            "SELECT {} FROM payments WHERE upload_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(upload_pk)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payments", db.operation = "select"))]
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentAttempt>, AppError> {
        if order_id.is_empty() {
            return Ok(None);
        }
        let attempt = sqlx::query_as::<Postgres, PaymentAttempt>(&format!(
            "SELECT {} FROM payments WHERE id = (SELECT payment_id FROM payment_orders WHERE order_id = $1)",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payments", db.operation = "upsert"))]
    async fn ensure_attempt(&self, upload_pk: Uuid) -> Result<PaymentAttempt, AppError> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, upload_id, order_id, amount, currency, status)
            VALUES ($1, $2, '', $3, $4, 'pending')
            ON CONFLICT (upload_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(upload_pk)
        .bind(LIFETIME_ACCESS_AMOUNT)
        .bind(LIFETIME_ACCESS_CURRENCY)
        .execute(&self.pool)
        .await?;

        self.find_by_upload(upload_pk).await?.ok_or_else(|| {
            AppError::Internal(format!("Payment attempt missing for upload {}", upload_pk))
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "payments", db.operation = "update"))]
    async fn set_order(
        &self,
        attempt_id: Uuid,
        order_id: &str,
    ) -> Result<Option<PaymentAttempt>, AppError> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<Postgres, PaymentAttempt>(&format!(
            r#"
            UPDATE payments
            SET order_id = $2, payment_id = NULL, status = 'pending', updated_at = NOW()
            WHERE id = $1 AND status <> 'completed'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(attempt_id)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        if attempt.is_some() {
            sqlx::query("INSERT INTO payment_orders (order_id, payment_id) VALUES ($1, $2)")
                .bind(order_id)
                .bind(attempt_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(attempt)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payments", db.operation = "update"))]
    async fn complete(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Option<CompletionOutcome>, AppError> {
        if order_id.is_empty() {
            return Ok(None);
        }

        let mut tx = self.pool.begin().await?;

        let transitioned: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE payments
            SET status = 'completed', order_id = $1, payment_id = $2, updated_at = NOW()
            WHERE id = (SELECT payment_id FROM payment_orders WHERE order_id = $1)
              AND status <> 'completed'
            RETURNING upload_id
            "#,
        )
        .bind(order_id)
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (upload_pk, outcome) = match transitioned {
            Some(upload_pk) => (upload_pk, CompletionOutcome::Applied),
            None => {
                let existing: Option<Uuid> = sqlx::query_scalar(
                    "SELECT upload_id FROM payments WHERE id = (SELECT payment_id FROM payment_orders WHERE order_id = $1)",
                )
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
                match existing {
                    Some(upload_pk) => (upload_pk, CompletionOutcome::AlreadyCompleted),
                    None => return Ok(None),
                }
            }
        };

        // Idempotent: re-applying leaves the same values.
        sqlx::query("UPDATE uploads SET is_paid = TRUE, expires_at = $2 WHERE id = $1")
            .bind(upload_pk)
            .bind(lifetime_sentinel())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(outcome))
    }

    #[tracing::instrument(skip(self), fields(db.table = "payments", db.operation = "update"))]
    async fn fail(
        &self,
        order_id: &str,
        payment_id: Option<&str>,
    ) -> Result<Option<PaymentStatus>, AppError> {
        if order_id.is_empty() {
            return Ok(None);
        }

        let updated: Option<PaymentStatus> = sqlx::query_scalar(
            r#"
            UPDATE payments
            SET status = 'failed', payment_id = COALESCE($2, payment_id), updated_at = NOW()
            WHERE order_id = $1 AND status <> 'completed'
            RETURNING status
            "#,
        )
        .bind(order_id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(updated);
        }

        let current: Option<PaymentStatus> = sqlx::query_scalar(
            "SELECT status FROM payments WHERE id = (SELECT payment_id FROM payment_orders WHERE order_id = $1)",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(current)
    }
}
