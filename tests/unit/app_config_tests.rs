/*!
 * Tests for configuration loading and validation
 */

use ocrpipe::app_config::{Config, LogLevel};
use ocrpipe::logging;
use log::LevelFilter;
use crate::common;

/// Test loading a camelCase configuration file
#[test]
fn test_load_withCamelCaseFile_shouldParseAllFields() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "translateTopic": "ocr-translate",
            "resultTopic": "ocr-result",
            "resultBucket": "ocr-output",
            "toLang": ["es", "ja"],
            "logLevel": "debug",
            "maxDeliveries": 2
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.translate_topic, "ocr-translate");
    assert_eq!(config.result_topic, "ocr-result");
    assert_eq!(config.result_bucket, "ocr-output");
    assert_eq!(config.to_lang, vec!["es".to_string(), "ja".to_string()]);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.max_deliveries, 2);
    assert_eq!(logging::level_filter(&config.log_level), LevelFilter::Debug);
}

/// Test the deployment-style upper-case keys
#[test]
fn test_fromJsonStr_withEnvironmentStyleKeys_shouldParse() {
    let config = Config::from_json_str(
        r#"{
            "TRANSLATE_TOPIC": "translate",
            "RESULT_TOPIC": "result",
            "RESULT_BUCKET": "bucket-out",
            "TO_LANG": ["en", "fr", "es", "ja", "ru"],
            "TRANSLATE_API_KEY": "secret"
        }"#,
    )
    .unwrap();

    assert_eq!(config.to_lang.len(), 5);
    assert_eq!(config.translate_api_key, "secret");
    assert_eq!(config.max_deliveries, 5);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_load_withMissingFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    assert!(Config::load(dir.path().join("missing.json")).is_err());
}

#[test]
fn test_load_withoutBucket_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"translateTopic": "translate", "resultTopic": "result", "toLang": ["en"]}"#,
    )
    .unwrap();

    assert!(Config::load(&path).is_err());
}

/// Test configuration validation
#[test]
fn test_validate_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    // Same topic twice
    config.result_topic = config.translate_topic.clone();
    assert!(config.validate().is_err());
    config.result_topic = "result".to_string();

    // Reserved topic prefix
    config.translate_topic = "google-translate".to_string();
    assert!(config.validate().is_err());
    config.translate_topic = "translate".to_string();

    // No target language
    config.to_lang.clear();
    assert!(config.validate().is_err());

    // Duplicate target language
    config.to_lang = vec!["en".to_string(), "EN".to_string()];
    assert!(config.validate().is_err());

    // Region tags are accepted
    config.to_lang = vec!["zh-CN".to_string(), "pt_BR".to_string()];
    assert!(config.validate().is_ok());

    // Zero deliveries
    config.max_deliveries = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_routing_shouldCarryTopicsAndLanguages() {
    let config = common::config_with_langs(&["de", "it"]);
    let routing = config.routing();

    assert_eq!(routing.translate_topic, config.translate_topic);
    assert_eq!(routing.result_topic, config.result_topic);
    assert_eq!(routing.to_lang, vec!["de".to_string(), "it".to_string()]);
}
