//! Cloudinary upload API backend
//!
//! Signed uploads go to `{api_url}/v1_1/{cloud}/{resource_type}/upload`. Keys have
//! the form `{resource_type}/{public_id}` so deletion can target the right
//! resource class.

use crate::keys::sanitize_key_component;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sharedrop_core::models::FileCategory;
use sharedrop_core::StorageBackend;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_DELIVERY_URL: &str = "https://res.cloudinary.com";
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
pub struct CloudinaryStorage {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
    api_url: String,
    delivery_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStorage {
    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: String,
        folder: String,
        api_url: String,
    ) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            cloud_name,
            api_key,
            api_secret,
            folder,
            api_url: api_url.trim_end_matches('/').to_string(),
            delivery_url: DEFAULT_DELIVERY_URL.to_string(),
        })
    }

    /// Override the CDN base used for downloads.
    pub fn with_delivery_url(mut self, delivery_url: impl Into<String>) -> Self {
        self.delivery_url = delivery_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.api_url, self.cloud_name, resource_type, action
        )
    }

    fn split_key(storage_key: &str) -> StorageResult<(&str, &str)> {
        match storage_key.split_once('/') {
            Some((rt @ ("image" | "video" | "raw"), public_id)) if !public_id.is_empty() => {
                Ok((rt, public_id))
            }
            _ => Err(StorageError::InvalidKey(storage_key.to_string())),
        }
    }
}

/// Cloudinary resource class for a file category.
pub fn resource_type(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Image => "image",
        FileCategory::Video => "video",
        _ => "raw",
    }
}

/// SHA-256 request signature: params sorted by name, joined as `k=v&k=v`, secret appended.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn public_id_for(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", sanitize_key_component(stem), &suffix[..8])
}

#[async_trait]
impl Storage for CloudinaryStorage {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        category: FileCategory,
        data: Bytes,
    ) -> StorageResult<StoredObject> {
        let resource_type = resource_type(category);
        let public_id = public_id_for(filename);
        let timestamp = Utc::now().timestamp().to_string();
        let size = data.len();

        let signature = sign_params(
            &[
                ("folder", self.folder.as_str()),
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.api_secret,
        );

        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| StorageError::UploadFailed(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.folder.clone())
            .text("public_id", public_id)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint(resource_type, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Cloudinary request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                size_bytes = size,
                resource_type = resource_type,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Cloudinary upload rejected"
            );
            return Err(StorageError::UploadFailed(format!(
                "Cloudinary returned {}: {}",
                status, body
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid Cloudinary response: {}", e)))?;

        let key = format!("{}/{}", resource_type, body.public_id);

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloudinary upload successful"
        );

        Ok(StoredObject {
            key,
            url: body.secure_url,
            backend: StorageBackend::Cloudinary,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let (resource_type, public_id) = Self::split_key(storage_key)?;
        let url = format!(
            "{}/{}/{}/upload/{}",
            self.delivery_url, self.cloud_name, resource_type, public_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        if !response.status().is_success() {
            return Err(StorageError::DownloadFailed(format!(
                "Cloudinary returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let (resource_type, public_id) = Self::split_key(storage_key)?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let form = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self
            .client
            .post(self.endpoint(resource_type, "destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::DeleteFailed(format!(
                "Cloudinary returned {}",
                response.status()
            )));
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        match body.result.as_str() {
            "ok" | "not found" => {
                tracing::info!(key = %storage_key, result = %body.result, "Cloudinary delete");
                Ok(())
            }
            other => Err(StorageError::DeleteFailed(format!(
                "Cloudinary destroy result: {}",
                other
            ))),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Cloudinary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(url: &str) -> CloudinaryStorage {
        CloudinaryStorage::new(
            "demo".to_string(),
            "key123".to_string(),
            "secret".to_string(),
            "sharedrop".to_string(),
            url.to_string(),
        )
        .unwrap()
        .with_delivery_url(url)
    }

    #[test]
    fn signature_is_order_independent_and_skips_empty_values() {
        let a = sign_params(&[("timestamp", "1"), ("folder", "f")], "s");
        let b = sign_params(&[("folder", "f"), ("timestamp", "1"), ("eager", "")], "s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_params(&[("folder", "f"), ("timestamp", "1")], "other"));
    }

    #[test]
    fn resource_type_by_category() {
        assert_eq!(resource_type(FileCategory::Image), "image");
        assert_eq!(resource_type(FileCategory::Video), "video");
        assert_eq!(resource_type(FileCategory::Document), "raw");
    }

    #[tokio::test]
    async fn upload_returns_resource_scoped_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/upload")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "public_id": "sharedrop/cat-1234abcd",
                    "secure_url": "https://res.cloudinary.com/demo/image/upload/sharedrop/cat-1234abcd.jpg",
                    "resource_type": "image"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let stored = storage(&server.url())
            .upload(
                "cat.jpg",
                "image/jpeg",
                FileCategory::Image,
                Bytes::from_static(b"jpeg"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(stored.key, "image/sharedrop/cat-1234abcd");
        assert_eq!(stored.backend, StorageBackend::Cloudinary);
        assert!(stored.url.ends_with("cat-1234abcd.jpg"));
    }

    #[tokio::test]
    async fn upload_rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1_1/demo/video/upload")
            .with_status(420)
            .with_body(r#"{"error":{"message":"Rate Limited"}}"#)
            .create_async()
            .await;

        let result = storage(&server.url())
            .upload(
                "clip.mp4",
                "video/mp4",
                FileCategory::Video,
                Bytes::from_static(b"mp4"),
            )
            .await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn delete_treats_not_found_as_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/destroy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"not found"}"#)
            .create_async()
            .await;

        storage(&server.url())
            .delete("image/sharedrop/cat-1234abcd")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_key_is_rejected() {
        let result = storage("http://127.0.0.1:9").delete("sharedrop/cat").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
