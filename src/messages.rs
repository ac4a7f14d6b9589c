/*!
 * Messages exchanged between pipeline stages.
 *
 * Two families live here:
 * - the stage data model (`IngestionEvent`, `ExtractionResult`,
 *   `RoutingDecision`, `TranslationResult`), immutable value records;
 * - the wire payloads carried by triggers and bus topics
 *   (`StorageEvent`, `TranslateRequest`, `SaveRequest`).
 *
 * Trigger payloads are validated field by field before any collaborator is
 * called: identifiers must be present and non-empty, `text` must be present
 * but may be empty.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;

/// A storage-change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionEvent {
    pub bucket: String,
    pub object_key: String,
    pub is_deletion: bool,
}

impl IngestionEvent {
    /// An object-created event
    pub fn created(bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object_key: object_key.into(),
            is_deletion: false,
        }
    }

    pub fn image(&self) -> ImageRef {
        ImageRef {
            bucket: self.bucket.clone(),
            key: self.object_key.clone(),
        }
    }
}

/// Location of an uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Text pulled out of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub object_key: String,
    /// May be empty, never absent
    pub text: String,
}

/// Where one target language of one image goes next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub text: String,
    pub object_key: String,
    pub target_lang: String,
    pub source_lang: String,
    pub needs_translation: bool,
}

impl RoutingDecision {
    /// Wire payload for the translate topic
    pub fn to_translate_request(&self) -> TranslateRequest {
        TranslateRequest {
            text: self.text.clone(),
            filename: self.object_key.clone(),
            lang: self.target_lang.clone(),
            from: Some(self.source_lang.clone()),
        }
    }

    /// Terminal result for a decision that skips translation
    pub fn to_pass_through(&self) -> TranslationResult {
        TranslationResult {
            text: self.text.clone(),
            object_key: self.object_key.clone(),
            lang: self.target_lang.clone(),
        }
    }
}

/// Text ready to be persisted in one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub text: String,
    pub object_key: String,
    pub lang: String,
}

impl TranslationResult {
    pub fn to_save_request(&self) -> SaveRequest {
        SaveRequest {
            text: self.text.clone(),
            filename: self.object_key.clone(),
            lang: self.lang.clone(),
        }
    }
}

/// Storage trigger payload: `{bucket, name, timeDeleted?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEvent {
    pub bucket: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_deleted: Option<String>,
}

/// Payload on the translate topic: `{text, filename, lang, from}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub filename: String,
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl TranslateRequest {
    pub fn into_decision(self) -> RoutingDecision {
        let needs_translation = match &self.from {
            Some(from) => !crate::language_utils::same_language(from, &self.lang),
            None => true,
        };
        RoutingDecision {
            text: self.text,
            object_key: self.filename,
            target_lang: self.lang,
            source_lang: self.from.unwrap_or_default(),
            needs_translation,
        }
    }
}

/// Payload on the result topic: `{text, filename, lang}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub text: String,
    pub filename: String,
    pub lang: String,
}

impl SaveRequest {
    pub fn into_result(self) -> TranslationResult {
        TranslationResult {
            text: self.text,
            object_key: self.filename,
            lang: self.lang,
        }
    }
}

/// Parse raw trigger bytes into a JSON value
pub fn parse_payload(raw: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(raw).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, ValidationError> {
    payload.as_object().ok_or(ValidationError::NotAnObject)
}

/// A string field that must be present and non-empty
fn required_identifier(map: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

/// A string field that must be present but may be empty
fn required_text(map: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

fn optional_identifier(map: &Map<String, Value>, field: &'static str) -> Result<Option<String>, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ValidationError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate a storage-change payload
///
/// The presence of a `timeDeleted` key marks a deletion, whatever its value;
/// deletions are returned before `bucket`/`name` are checked.
pub fn validate_storage_event(payload: &Value) -> Result<IngestionEvent, ValidationError> {
    let map = as_object(payload)?;

    if map.contains_key("timeDeleted") {
        return Ok(IngestionEvent {
            bucket: optional_identifier(map, "bucket").ok().flatten().unwrap_or_default(),
            object_key: optional_identifier(map, "name").ok().flatten().unwrap_or_default(),
            is_deletion: true,
        });
    }

    let bucket = required_identifier(map, "bucket")?;
    let object_key = required_identifier(map, "name")?;

    Ok(IngestionEvent {
        bucket,
        object_key,
        is_deletion: false,
    })
}

/// Validate a translate-topic payload
pub fn validate_translate_request(payload: &Value) -> Result<TranslateRequest, ValidationError> {
    let map = as_object(payload)?;

    Ok(TranslateRequest {
        text: required_text(map, "text")?,
        filename: required_identifier(map, "filename")?,
        lang: required_identifier(map, "lang")?,
        from: optional_identifier(map, "from")?,
    })
}

/// Validate a result-topic payload
pub fn validate_save_request(payload: &Value) -> Result<SaveRequest, ValidationError> {
    let map = as_object(payload)?;

    Ok(SaveRequest {
        text: required_text(map, "text")?,
        filename: required_identifier(map, "filename")?,
        lang: required_identifier(map, "lang")?,
    })
}
