/*!
 * Result persister.
 *
 * Terminal stage: writes each translated (or passed-through) text to the
 * result bucket under a key derived from the original image name and the
 * target language. The key derivation is pure, so a redelivered result
 * overwrites the same object instead of creating a second one.
 */

use bytes::Bytes;
use log::{error, info};
use std::sync::Arc;

use crate::collaborators::ObjectStore;
use crate::errors::PersistError;
use crate::messages::TranslationResult;

/// Derive the output key for `object_key` translated into `lang`
///
/// Everything from the last `.` of the file name onward is replaced by
/// `_to_<lang>.txt`; a file name without a `.` gets the suffix appended. Dots
/// in directory segments are kept, so `batch.2024/a` and `batch.2024/b` map
/// to distinct keys.
///
/// ```
/// use ocrpipe::pipeline::persister::derive_output_key;
///
/// assert_eq!(derive_output_key("photo.jpg", "de"), "photo_to_de.txt");
/// assert_eq!(derive_output_key("noext", "fr"), "noext_to_fr.txt");
/// assert_eq!(derive_output_key("batch.2024/a", "en"), "batch.2024/a_to_en.txt");
/// ```
pub fn derive_output_key(object_key: &str, lang: &str) -> String {
    let name_start = object_key.rfind('/').map_or(0, |slash| slash + 1);
    let stem = match object_key[name_start..].rfind('.') {
        Some(dot) => &object_key[..name_start + dot],
        None => object_key,
    };
    format!("{}_to_{}.txt", stem, lang)
}

/// Where a result ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReceipt {
    pub bucket: String,
    pub key: String,
    pub etag: String,
}

pub struct ResultPersister {
    store: Arc<dyn ObjectStore>,
    result_bucket: String,
}

impl ResultPersister {
    pub fn new(store: Arc<dyn ObjectStore>, result_bucket: impl Into<String>) -> Self {
        Self {
            store,
            result_bucket: result_bucket.into(),
        }
    }

    pub fn result_bucket(&self) -> &str {
        &self.result_bucket
    }

    /// Write `result` to the result bucket at its derived key
    pub async fn persist(&self, result: &TranslationResult) -> Result<PersistReceipt, PersistError> {
        let key = derive_output_key(&result.object_key, &result.lang);

        info!("Saving result to {} in bucket {}", key, self.result_bucket);

        let receipt = self
            .store
            .write(&self.result_bucket, &key, Bytes::from(result.text.clone()))
            .await
            .map_err(|source| {
                error!("Failed to write {}/{}: {}", self.result_bucket, key, source);
                PersistError::Write {
                    bucket: self.result_bucket.clone(),
                    key: key.clone(),
                    source,
                }
            })?;

        info!("Text written to {}", key);

        Ok(PersistReceipt {
            bucket: receipt.bucket,
            key: receipt.key,
            etag: receipt.etag,
        })
    }
}
