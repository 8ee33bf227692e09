//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs in process: repositories are the in-memory store from
//! `sharedrop-db`'s `test-helpers` feature, storage backends and the payment
//! provider are fakes defined here.

#![allow(dead_code)]

pub mod fakes;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use fakes::{FakeProvider, MemoryStorage};
use serde_json::{json, Value};
use sharedrop_api::constants;
use sharedrop_api::services::UploadService;
use sharedrop_api::setup::routes;
use sharedrop_api::state::{AppState, DbState, UploadLimits};
use sharedrop_core::{AppConfig, Config, StorageBackend};
use sharedrop_db::test_helpers::InMemoryStore;
use sharedrop_services::payment::signature;
use sharedrop_services::{DisabledCaptcha, PaymentService};
use sharedrop_storage::{Storage, StorageRouter};
use std::sync::Arc;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";
pub const APP_URL: &str = "https://sharedrop.test";
pub const DEVICE_ID: &str = "device-1";
pub const PASSWORD: &str = "correct horse";

/// Minimum bcrypt cost keeps the suite fast.
const TEST_BCRYPT_COST: u32 = 4;

/// API path prefix for tests (e.g. `/api`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub struct TestOptions {
    pub primary_fails: bool,
    pub max_file_size: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            primary_fails: false,
            max_file_size: 100 * 1024 * 1024,
        }
    }
}

/// Test application: server plus handles on the fakes behind it.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub primary: Arc<MemoryStorage>,
    pub secondary: Arc<MemoryStorage>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn test_config(max_file_size: usize) -> Config {
    Config(Box::new(AppConfig {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        database_url: "postgres://localhost/unused".to_string(),
        db_max_connections: 1,
        db_timeout_seconds: 1,
        app_url: APP_URL.to_string(),
        max_file_size_bytes: max_file_size,
        max_request_body_bytes: 1024 * 1024 * 1024,
        http_concurrency_limit: 10_000,
        bcrypt_cost: TEST_BCRYPT_COST,
        cloudinary_cloud_name: None,
        cloudinary_api_key: None,
        cloudinary_api_secret: None,
        cloudinary_folder: "sharedrop".to_string(),
        cloudinary_api_url: "http://127.0.0.1:9".to_string(),
        secondary_storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: "auto".to_string(),
        s3_endpoint: None,
        s3_public_url: None,
        local_storage_path: None,
        local_storage_base_url: None,
        razorpay_key_id: KEY_ID.to_string(),
        razorpay_key_secret: KEY_SECRET.to_string(),
        razorpay_webhook_secret: WEBHOOK_SECRET.to_string(),
        razorpay_api_url: "http://127.0.0.1:9".to_string(),
        recaptcha_secret_key: None,
        recaptcha_min_score: 0.5,
        recaptcha_verify_url: "http://127.0.0.1:9".to_string(),
    }))
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default()).await
}

pub async fn setup_test_app_with(options: TestOptions) -> TestApp {
    let config = test_config(options.max_file_size);
    let store = InMemoryStore::new();
    let primary = Arc::new(MemoryStorage::new(
        StorageBackend::Cloudinary,
        options.primary_fails,
    ));
    let secondary = Arc::new(MemoryStorage::new(StorageBackend::Local, false));

    let router = StorageRouter::new(
        Some(primary.clone() as Arc<dyn Storage>),
        secondary.clone() as Arc<dyn Storage>,
    );

    let uploads = UploadService::new(
        Arc::new(store.clone()),
        router,
        Arc::new(DisabledCaptcha),
        TEST_BCRYPT_COST,
        APP_URL.to_string(),
    );
    let payments = PaymentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(FakeProvider::new(KEY_ID)),
        KEY_SECRET.to_string(),
        WEBHOOK_SECRET.to_string(),
    );

    let state = Arc::new(AppState {
        db: DbState { pool: None },
        uploads,
        payments,
        limits: UploadLimits {
            max_file_size: options.max_file_size,
        },
    });

    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        store,
        primary,
        secondary,
    }
}

pub fn metadata(is_private: bool, password: Option<&str>, text: &[(&str, &str)]) -> String {
    let text_boxes: Vec<Value> = text
        .iter()
        .map(|(title, content)| json!({ "title": title, "content": content }))
        .collect();
    json!({
        "deviceId": DEVICE_ID,
        "isPrivate": is_private,
        "password": password,
        "textBoxes": text_boxes,
    })
    .to_string()
}

pub fn file_part(name: &str, mime: &str, data: Vec<u8>) -> Part {
    Part::bytes(data).file_name(name).mime_type(mime)
}

/// POST a multipart upload and return the parsed response body.
pub async fn post_upload(server: &TestServer, form: MultipartForm) -> (u16, Value) {
    let response = server.post(&api_path("/uploads")).multipart(form).await;
    let status = response.status_code().as_u16();
    (status, response.json::<Value>())
}

/// Create a public text-only upload and return its id.
pub async fn create_text_upload(server: &TestServer) -> String {
    let form = MultipartForm::new().add_text(
        "metadata",
        metadata(false, None, &[("Notes", "<p>hello</p>")]),
    );
    let (status, body) = post_upload(server, form).await;
    assert_eq!(status, 201, "unexpected body: {}", body);
    body["uploadId"].as_str().expect("uploadId").to_string()
}

/// Create a private upload with one file and one text block; returns its id.
pub async fn create_private_upload(server: &TestServer) -> String {
    let form = MultipartForm::new()
        .add_text(
            "metadata",
            metadata(true, Some(PASSWORD), &[("Secret", "<p>hidden</p>")]),
        )
        .add_part("file", file_part("notes.txt", "text/plain", b"top secret".to_vec()));
    let (status, body) = post_upload(server, form).await;
    assert_eq!(status, 201, "unexpected body: {}", body);
    body["uploadId"].as_str().expect("uploadId").to_string()
}

/// Checkout callback body signed with the test key secret.
pub fn signed_checkout(order_id: &str, payment_id: &str, upload_id: &str) -> Value {
    let message = signature::checkout_message(order_id, payment_id);
    json!({
        "razorpay_order_id": order_id,
        "razorpay_payment_id": payment_id,
        "razorpay_signature": signature::sign(KEY_SECRET, message.as_bytes()).expect("sign"),
        "uploadId": upload_id,
    })
}

/// Webhook body and its signature.
pub fn signed_webhook(event: &str, order_id: &str) -> (String, String) {
    let body = json!({
        "event": event,
        "payload": { "payment": { "entity": { "id": "pay_webhook", "order_id": order_id } } }
    })
    .to_string();
    let signature = signature::sign(WEBHOOK_SECRET, body.as_bytes()).expect("sign");
    (body, signature)
}

/// Create an order for `upload_id` and return its id.
pub async fn create_order(server: &TestServer, upload_id: &str) -> String {
    let response = server
        .post(&api_path("/payments/create"))
        .json(&json!({ "uploadId": upload_id }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["orderId"].as_str().expect("orderId").to_string()
}
