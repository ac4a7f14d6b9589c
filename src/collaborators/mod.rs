/*!
 * External collaborators the pipeline depends on.
 *
 * The pipeline never implements text recognition, language detection,
 * translation or durable storage itself. Each is an async trait here so that
 * real service clients, local backends and test doubles can be handed to the
 * stages interchangeably:
 * - `TextRecognizer`: image bytes to raw text
 * - `LanguageDetector`: text to a language code
 * - `Translator`: text from one language into another
 * - `ObjectStore`: write-once-per-key blob storage (overwrites allowed)
 */

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt::Debug;

use crate::errors::{ProviderError, StoreError};
use crate::messages::ImageRef;

pub mod fs_store;
pub mod memory_store;
pub mod mock;

pub use fs_store::FsObjectStore;
pub use memory_store::InMemoryObjectStore;

/// Optical text extraction service
#[async_trait]
pub trait TextRecognizer: Send + Sync + Debug {
    /// Extract the text contained in one image
    ///
    /// # Arguments
    /// * `image` - Where the image lives, for logging and service-side lookups
    /// * `bytes` - The image content
    async fn recognize(&self, image: &ImageRef, bytes: Bytes) -> Result<String, ProviderError>;
}

/// Result of a language identification call
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Language code as reported by the service
    pub language: String,
    /// Confidence in [0, 1], when the service reports one
    pub confidence: Option<f32>,
}

impl Detection {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            confidence: None,
        }
    }
}

/// Language identification service
#[async_trait]
pub trait LanguageDetector: Send + Sync + Debug {
    async fn detect(&self, text: &str) -> Result<Detection, ProviderError>;
}

/// Translation service
///
/// Translation must be a pure function of its inputs so that redelivered
/// requests can call it again safely.
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate `text` into `to`; `from` lets the service skip its own detection
    async fn translate(&self, text: &str, from: Option<&str>, to: &str) -> Result<String, ProviderError>;
}

/// Details of a completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    /// SHA-256 of the content, lowercase hex
    pub etag: String,
    /// Number of times this key has been written
    pub generation: u64,
}

/// Durable blob storage addressed by bucket and key
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    async fn read(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Write `data` at `key`, replacing any previous object with that key
    async fn write(&self, bucket: &str, key: &str, data: Bytes) -> Result<WriteReceipt, StoreError>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError>;
}

/// Content hash used as the object etag
pub fn content_etag(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
