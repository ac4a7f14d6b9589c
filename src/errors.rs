/*!
 * Error types for the ocrpipe pipeline.
 *
 * Each stage reports its own typed error; `PipelineError` wraps them all so the
 * trigger layer can decide between acknowledging a message and leaving it for
 * redelivery. Errors are built with the thiserror crate.
 */

use thiserror::Error;

/// Errors that can occur when calling an external collaborator
/// (text recognition, language detection, translation)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The request could not be sent or did not complete
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the service itself
    #[error("Service responded with error: {status_code} - {message}")]
    ApiError {
        /// Status code reported by the service
        status_code: u16,
        /// Error message from the service
        message: String,
    },

    /// The service rejected the input (corrupted image, unsupported language, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the object store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Errors reported by the message bus
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("Invalid topic name '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    #[error("Failed to create topic '{topic}': {message}")]
    TopicCreation { topic: String, message: String },

    #[error("Failed to publish to topic '{topic}': {message}")]
    PublishFailed { topic: String, message: String },

    #[error("Failed to serialize message: {0}")]
    Serialization(String),

    #[error("Bus is closed")]
    Closed,
}

impl From<serde_json::Error> for BusError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// A trigger payload that cannot be processed. Fatal for the message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("Payload must be a JSON object")]
    NotAnObject,

    #[error("{0} not provided. Make sure you have a \"{0}\" property in your request")]
    MissingField(&'static str),

    #[error("Invalid \"{field}\" property: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors from the text extraction stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Failed to read image: {0}")]
    Read(#[from] StoreError),

    #[error("Image {bucket}/{key} is empty")]
    EmptyObject { bucket: String, key: String },

    #[error("Text recognition failed: {0}")]
    Recognition(ProviderError),
}

/// Errors from the language routing stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// Detection failed, nothing was published
    #[error("Language detection failed: {0}")]
    Detection(ProviderError),

    /// At least one per-language publish failed; the others were attempted
    #[error("Failed to publish routing decisions for: {}", failed.join(", "))]
    Publish {
        failed: Vec<String>,
        #[source]
        first: BusError,
    },
}

/// Errors from the translator stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("Translation to '{lang}' failed: {source}")]
    Provider {
        lang: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to publish translation result: {0}")]
    Publish(#[from] BusError),
}

/// Errors from the result persister
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    #[error("Failed to write {bucket}/{key}: {source}")]
    Write {
        bucket: String,
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Top level error surfaced to the trigger mechanism
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Whether redelivering the triggering message can succeed.
    ///
    /// Validation failures are fatal for the message; everything else is a
    /// collaborator or bus failure whose side effects were not applied.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
