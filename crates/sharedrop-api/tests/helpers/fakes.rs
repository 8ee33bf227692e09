//! In-process stand-ins for the storage backends and the payment provider.

use async_trait::async_trait;
use bytes::Bytes;
use sharedrop_core::models::FileCategory;
use sharedrop_core::{AppError, StorageBackend};
use sharedrop_services::{OrderRequest, PaymentProvider, ProviderOrder};
use sharedrop_storage::{Storage, StorageError, StorageResult, StoredObject};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps objects in a map; optionally rejects every upload.
pub struct MemoryStorage {
    backend: StorageBackend,
    fail_uploads: bool,
    counter: AtomicUsize,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(backend: StorageBackend, fail_uploads: bool) -> Self {
        Self {
            backend,
            fail_uploads,
            counter: AtomicUsize::new(0),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains_data(&self, data: &[u8]) -> bool {
        self.objects.lock().unwrap().values().any(|v| v == data)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        _category: FileCategory,
        data: Bytes,
    ) -> StorageResult<StoredObject> {
        if self.fail_uploads {
            return Err(StorageError::UploadFailed(format!(
                "{} rejected {}",
                self.backend, filename
            )));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let key = format!("uploads/{}-{}", n, filename);
        self.objects
            .lock()
            .unwrap()
            .insert(key.clone(), data.to_vec());
        Ok(StoredObject {
            url: format!("https://{}.test/{}", self.backend, key),
            key,
            backend: self.backend,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}

/// Issues `order_test_1`, `order_test_2`, ...
pub struct FakeProvider {
    key_id: String,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder, AppError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderOrder {
            id: format!("order_test_{}", n),
            amount: request.amount,
            currency: request.currency.clone(),
        })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
