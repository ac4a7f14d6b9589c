use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};

use super::{ObjectStore, WriteReceipt, content_etag};
use crate::errors::StoreError;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    generation: u64,
}

/// Object store kept in memory, one object per (bucket, key)
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
    failing_buckets: RwLock<HashSet<String>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through the write path
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let etag = content_etag(&data);
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject { data, etag, generation: 1 },
        );
    }

    /// Content of an object, if present
    pub fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    /// Content of an object as UTF-8 text, if present
    pub fn get_text(&self, bucket: &str, key: &str) -> Option<String> {
        self.get(bucket, key)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    pub fn generation(&self, bucket: &str, key: &str) -> Option<u64> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.generation)
    }

    /// Keys stored in a bucket, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Make writes to `bucket` fail until restored
    pub fn fail_writes_to(&self, bucket: &str) {
        self.failing_buckets.write().insert(bucket.to_string());
    }

    pub fn restore_writes_to(&self, bucket: &str) {
        self.failing_buckets.write().remove(bucket);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.get(bucket, key).ok_or_else(|| StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn write(&self, bucket: &str, key: &str, data: Bytes) -> Result<WriteReceipt, StoreError> {
        if self.failing_buckets.read().contains(bucket) {
            return Err(StoreError::Backend(format!("writes to bucket '{}' are failing", bucket)));
        }
        if key.is_empty() {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: "key is empty".to_string(),
            });
        }

        let etag = content_etag(&data);
        let size = data.len() as u64;

        let mut objects = self.objects.write();
        let generation = objects
            .get(&(bucket.to_string(), key.to_string()))
            .map_or(1, |previous| previous.generation + 1);
        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject { data, etag: etag.clone(), generation },
        );

        Ok(WriteReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            etag,
            generation,
        })
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self.objects.read().contains_key(&(bucket.to_string(), key.to_string())))
    }
}
