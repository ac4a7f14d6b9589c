use log::{error, info};
use std::sync::Arc;

use crate::collaborators::{ObjectStore, TextRecognizer};
use crate::errors::ExtractionError;
use crate::messages::{ExtractionResult, ImageRef};

/// Text extractor stage
///
/// Reads one image from the object store and runs it through the text
/// recognizer exactly once. There is no local retry: a failure aborts the
/// image and redelivery of the storage trigger decides whether it is tried again.
pub struct TextExtractor {
    store: Arc<dyn ObjectStore>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl TextExtractor {
    pub fn new(store: Arc<dyn ObjectStore>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { store, recognizer }
    }

    pub async fn extract(&self, image: &ImageRef) -> Result<ExtractionResult, ExtractionError> {
        info!("Looking for text in file {}", image.key);

        let bytes = self.store.read(&image.bucket, &image.key).await.map_err(|e| {
            error!("Failed to read {}: {}", image, e);
            ExtractionError::Read(e)
        })?;

        if bytes.is_empty() {
            error!("Image {} is empty, nothing to extract", image);
            return Err(ExtractionError::EmptyObject {
                bucket: image.bucket.clone(),
                key: image.key.clone(),
            });
        }

        let text = self.recognizer.recognize(image, bytes).await.map_err(|e| {
            error!("Text recognition failed for {}: {}", image, e);
            ExtractionError::Recognition(e)
        })?;

        info!("Extracted text from image ({} chars)", text.chars().count());

        Ok(ExtractionResult {
            object_key: image.key.clone(),
            text,
        })
    }
}
