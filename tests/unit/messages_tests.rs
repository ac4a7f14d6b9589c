/*!
 * Tests for trigger payload validation and stage messages
 */

use serde_json::json;
use ocrpipe::errors::ValidationError;
use ocrpipe::messages::{
    parse_payload, validate_save_request, validate_storage_event, validate_translate_request, RoutingDecision,
    StorageEvent, TranslateRequest,
};

#[test]
fn test_parsePayload_withGarbage_shouldBeMalformed() {
    assert!(matches!(parse_payload(b"{\"text\":"), Err(ValidationError::Malformed(_))));
    assert!(parse_payload(b"{}").is_ok());
}

#[test]
fn test_validateStorageEvent_withArray_shouldBeNotAnObject() {
    assert_eq!(validate_storage_event(&json!(["a"])), Err(ValidationError::NotAnObject));
}

#[test]
fn test_validateStorageEvent_withCreation_shouldReturnImage() {
    let event = validate_storage_event(&json!({"bucket": "uploads", "name": "scans/receipt.jpeg"})).unwrap();

    assert!(!event.is_deletion);
    let image = event.image();
    assert_eq!(image.bucket, "uploads");
    assert_eq!(image.key, "scans/receipt.jpeg");
    assert_eq!(image.to_string(), "uploads/scans/receipt.jpeg");
}

#[test]
fn test_validateStorageEvent_withEmptyName_shouldFail() {
    let result = validate_storage_event(&json!({"bucket": "uploads", "name": ""}));
    assert_eq!(result, Err(ValidationError::MissingField("name")));
}

#[test]
fn test_validateTranslateRequest_withEachFieldMissing_shouldNameTheField() {
    let full = json!({"text": "Hi", "filename": "a.png", "lang": "fr", "from": "en"});

    for field in ["text", "filename", "lang"] {
        let mut payload = full.clone();
        payload.as_object_mut().unwrap().remove(field);

        assert_eq!(
            validate_translate_request(&payload),
            Err(ValidationError::MissingField(field)),
            "missing {}",
            field
        );
    }
}

#[test]
fn test_validateTranslateRequest_withEmptyText_shouldAccept() {
    let request = validate_translate_request(&json!({"text": "", "filename": "a.png", "lang": "fr"})).unwrap();

    assert_eq!(request.text, "");
    assert_eq!(request.from, None);
}

#[test]
fn test_validateTranslateRequest_withNumericLang_shouldBeInvalidField() {
    let result = validate_translate_request(&json!({"text": "Hi", "filename": "a.png", "lang": 7}));
    assert!(matches!(result, Err(ValidationError::InvalidField { field: "lang", .. })));
}

#[test]
fn test_validateSaveRequest_shouldIgnoreExtraFields() {
    let request = validate_save_request(&json!({
        "text": "Bonjour",
        "filename": "a.png",
        "lang": "fr",
        "from": "en",
        "extra": true
    }))
    .unwrap();

    assert_eq!(request.text, "Bonjour");
    assert_eq!(request.lang, "fr");
}

#[test]
fn test_translateRequest_intoDecision_shouldCompareLanguages() {
    let request = TranslateRequest {
        text: "Hi".into(),
        filename: "a.png".into(),
        lang: "fr".into(),
        from: Some("fre".into()),
    };
    let decision: RoutingDecision = request.into_decision();

    assert!(!decision.needs_translation);
    assert_eq!(decision.object_key, "a.png");
    assert_eq!(decision.source_lang, "fre");
}

#[test]
fn test_storageEvent_serialization_shouldUseCamelCase() {
    let event = StorageEvent {
        bucket: "b".into(),
        name: "n.png".into(),
        time_deleted: Some("2024-01-01T00:00:00Z".into()),
    };

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["timeDeleted"], "2024-01-01T00:00:00Z");
    assert!(validate_storage_event(&value).unwrap().is_deletion);
}
