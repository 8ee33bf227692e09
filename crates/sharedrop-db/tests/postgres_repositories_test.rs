//! Repository tests against a real Postgres started with testcontainers.
//!
//! Each test gets its own container with the workspace migrations applied.
//! When no container runtime is reachable the tests log and return early.
//!
//! Run with: `cargo test -p sharedrop-db --test postgres_repositories_test`

use chrono::{Duration, Utc};
use sharedrop_core::expiration::{compute_expiry, lifetime_sentinel};
use sharedrop_core::models::{
    CompletionOutcome, FileCategory, NewStoredFile, NewTextBlock, NewUpload, PaymentStatus,
};
use sharedrop_core::{AppError, StorageBackend};
use sharedrop_db::{PaymentRepository, PgPaymentRepository, PgUploadRepository, UploadRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::ContainerAsync;

struct TestDb {
    pool: PgPool,
    uploads: PgUploadRepository,
    payments: PgPaymentRepository,
    _container: ContainerAsync<Postgres>,
}

async fn setup_db() -> Option<TestDb> {
    let container = match Postgres::default().start().await {
        Ok(container) => container,
        Err(e) => {
            eprintln!("Skipping Postgres test, container unavailable: {}", e);
            return None;
        }
    };
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            host, port
        ))
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(TestDb {
        uploads: PgUploadRepository::new(pool.clone()),
        payments: PgPaymentRepository::new(pool.clone()),
        pool,
        _container: container,
    })
}

fn new_upload(upload_id: &str, is_private: bool) -> NewUpload {
    let now = Utc::now();
    NewUpload {
        upload_id: upload_id.to_string(),
        device_id: "device-1".to_string(),
        is_private,
        password_hash: is_private.then(|| "$2b$04$hash".to_string()),
        created_at: now,
        expires_at: compute_expiry(now),
        files: vec![NewStoredFile {
            original_name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 3,
            category: FileCategory::Image,
            backend: StorageBackend::Cloudinary,
            storage_key: "image/sharedrop/a".to_string(),
            url: "https://res.cloudinary.com/demo/a.png".to_string(),
        }],
        text_blocks: vec![
            NewTextBlock {
                title: "first".to_string(),
                content: "<p>one</p>".to_string(),
            },
            NewTextBlock {
                title: "second".to_string(),
                content: "<p>two</p>".to_string(),
            },
        ],
        create_pending_payment: is_private,
    }
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count query")
}

#[tokio::test]
async fn create_reads_back_details_in_order() {
    let Some(db) = setup_db().await else { return };
    db.uploads
        .create(new_upload("abc123def456", true))
        .await
        .unwrap();

    let details = db.uploads.get_details("abc123def456").await.unwrap().unwrap();
    assert!(details.record.is_private);
    assert!(!details.record.is_paid);
    assert_eq!(details.files.len(), 1);
    assert_eq!(details.files[0].backend, StorageBackend::Cloudinary);
    assert_eq!(details.text_blocks[0].position, 0);
    assert_eq!(details.text_blocks[1].title, "second");

    let payment = details.payment.expect("eager pending attempt");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.order_id, "");
    assert_eq!(payment.amount, 200);
}

#[tokio::test]
async fn private_upload_without_hash_violates_constraint() {
    let Some(db) = setup_db().await else { return };
    let mut upload = new_upload("abc123def456", true);
    upload.password_hash = None;

    let result = db.uploads.create(upload).await;

    assert!(matches!(result, Err(AppError::Database(_))));
    assert_eq!(count(&db.pool, "uploads").await, 0);
    assert_eq!(count(&db.pool, "stored_files").await, 0);
}

#[tokio::test]
async fn complete_twice_reports_already_completed() {
    let Some(db) = setup_db().await else { return };
    let record = db
        .uploads
        .create(new_upload("abc123def456", false))
        .await
        .unwrap();
    let attempt = db.payments.ensure_attempt(record.id).await.unwrap();
    db.payments
        .set_order(attempt.id, "order_1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        db.payments.complete("order_1", "pay_1").await.unwrap(),
        Some(CompletionOutcome::Applied)
    );
    assert_eq!(
        db.payments.complete("order_1", "pay_2").await.unwrap(),
        Some(CompletionOutcome::AlreadyCompleted)
    );
    assert_eq!(db.payments.complete("order_unknown", "pay_3").await.unwrap(), None);

    let upload = db
        .uploads
        .find_by_upload_id("abc123def456")
        .await
        .unwrap()
        .unwrap();
    assert!(upload.is_paid);
    assert_eq!(upload.expires_at, lifetime_sentinel());

    let attempt = db.payments.find_by_upload(record.id).await.unwrap().unwrap();
    assert_eq!(attempt.payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn concurrent_completion_applies_once() {
    let Some(db) = setup_db().await else { return };
    let record = db
        .uploads
        .create(new_upload("abc123def456", true))
        .await
        .unwrap();
    let attempt = db.payments.ensure_attempt(record.id).await.unwrap();
    db.payments.set_order(attempt.id, "order_1").await.unwrap();

    let checkout = db.payments.clone();
    let webhook = db.payments.clone();
    let (a, b) = tokio::join!(
        checkout.complete("order_1", "pay_checkout"),
        webhook.complete("order_1", "pay_webhook"),
    );

    let mut outcomes = vec![a.unwrap().unwrap(), b.unwrap().unwrap()];
    outcomes.sort_by_key(|o| matches!(o, CompletionOutcome::AlreadyCompleted));
    assert_eq!(
        outcomes,
        vec![CompletionOutcome::Applied, CompletionOutcome::AlreadyCompleted]
    );

    let upload = db
        .uploads
        .find_by_upload_id("abc123def456")
        .await
        .unwrap()
        .unwrap();
    assert!(upload.is_paid);
    assert_eq!(upload.expires_at, lifetime_sentinel());
    let attempt = db.payments.find_by_upload(record.id).await.unwrap().unwrap();
    assert_eq!(attempt.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn failure_after_completion_does_not_downgrade() {
    let Some(db) = setup_db().await else { return };
    let record = db
        .uploads
        .create(new_upload("abc123def456", true))
        .await
        .unwrap();
    let attempt = db.payments.ensure_attempt(record.id).await.unwrap();
    db.payments.set_order(attempt.id, "order_1").await.unwrap();
    db.payments.complete("order_1", "pay_1").await.unwrap();

    assert_eq!(
        db.payments.fail("order_1", Some("pay_2")).await.unwrap(),
        Some(PaymentStatus::Completed)
    );
    assert!(db
        .payments
        .set_order(attempt.id, "order_2")
        .await
        .unwrap()
        .is_none());

    let attempt = db.payments.find_by_upload(record.id).await.unwrap().unwrap();
    assert_eq!(attempt.status, PaymentStatus::Completed);
    assert_eq!(attempt.payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn failed_attempt_takes_a_fresh_order_and_keeps_history() {
    let Some(db) = setup_db().await else { return };
    let record = db
        .uploads
        .create(new_upload("abc123def456", true))
        .await
        .unwrap();
    let attempt = db.payments.ensure_attempt(record.id).await.unwrap();
    db.payments.set_order(attempt.id, "order_1").await.unwrap();

    assert_eq!(
        db.payments.fail("order_1", Some("pay_x")).await.unwrap(),
        Some(PaymentStatus::Failed)
    );

    let retried = db
        .payments
        .set_order(attempt.id, "order_2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(retried.status, PaymentStatus::Pending);
    assert_eq!(retried.payment_id, None);

    // The superseded order still resolves, and failing it leaves the retry pending.
    let found = db.payments.find_by_order_id("order_1").await.unwrap().unwrap();
    assert_eq!(found.id, attempt.id);
    assert_eq!(
        db.payments.fail("order_1", None).await.unwrap(),
        Some(PaymentStatus::Pending)
    );

    // A late capture of the first order still completes the attempt.
    assert_eq!(
        db.payments.complete("order_1", "pay_late").await.unwrap(),
        Some(CompletionOutcome::Applied)
    );
    let attempt = db.payments.find_by_upload(record.id).await.unwrap().unwrap();
    assert_eq!(attempt.order_id, "order_1");
    assert_eq!(attempt.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn delete_cascades_to_owned_rows() {
    let Some(db) = setup_db().await else { return };
    let record = db
        .uploads
        .create(new_upload("abc123def456", true))
        .await
        .unwrap();
    let attempt = db.payments.ensure_attempt(record.id).await.unwrap();
    db.payments.set_order(attempt.id, "order_1").await.unwrap();

    assert!(db.uploads.delete(record.id).await.unwrap());
    assert!(!db.uploads.delete(record.id).await.unwrap());

    for table in ["uploads", "stored_files", "text_blocks", "payments", "payment_orders"] {
        assert_eq!(count(&db.pool, table).await, 0, "{} not emptied", table);
    }
    assert!(db.payments.find_by_order_id("order_1").await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_newest_first_with_counts() {
    let Some(db) = setup_db().await else { return };
    let mut older = new_upload("older0000000", false);
    older.created_at = older.created_at - Duration::hours(1);
    older.text_blocks.pop();
    db.uploads.create(older).await.unwrap();
    let mut newer = new_upload("newer0000000", false);
    newer.files.clear();
    db.uploads.create(newer).await.unwrap();

    let rows = db.uploads.list_by_device("device-1").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].upload_id, "newer0000000");
    assert_eq!(rows[0].file_count, 0);
    assert_eq!(rows[0].text_count, 2);
    assert_eq!(rows[1].upload_id, "older0000000");
    assert_eq!(rows[1].file_count, 1);
    assert_eq!(rows[1].text_count, 1);
    assert!(db.uploads.list_by_device("other").await.unwrap().is_empty());
}
