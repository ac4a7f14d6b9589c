/*!
 * End-to-end tests of the pipeline running on the local runtime.
 *
 * Each test uploads an image (or fires a raw trigger), waits for the runtime to
 * go idle and then inspects the result bucket and the bus.
 */

use std::sync::Arc;
use serde_json::json;

use ocrpipe::bus::publish_json;
use ocrpipe::collaborators::mock::{MockDetector, MockRecognizer, MockTranslator};
use ocrpipe::collaborators::{FsObjectStore, ObjectStore};
use ocrpipe::messages::{SaveRequest, TranslateRequest};
use ocrpipe::pipeline::LocalRuntime;
use crate::common::{self, TestPipeline};

/// Test one image fanned out to three targets, one of which is the source language
#[tokio::test]
async fn test_upload_withSourceAmongTargets_shouldPersistEveryTarget() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en", "de", "fr"]), "Wet paint", "en");

    pipeline.upload_and_settle("photo.jpg").await;

    assert_eq!(
        pipeline.result_keys(),
        vec!["photo_to_de.txt", "photo_to_en.txt", "photo_to_fr.txt"]
    );
    assert_eq!(pipeline.result_text("photo_to_en.txt").unwrap(), "Wet paint");
    assert_eq!(
        pipeline.result_text("photo_to_de.txt").unwrap(),
        MockTranslator::expected("Wet paint", "de")
    );

    // Source equals one target: one pass-through, two translations
    let bus = pipeline.runtime.bus();
    assert_eq!(bus.published("translate").len(), 2);
    assert_eq!(bus.published("result").len(), 3);
    assert_eq!(pipeline.translator.calls(), 2);
    assert_eq!(pipeline.recognizer.calls(), 1);
    assert_eq!(pipeline.detector.calls(), 1);
    assert!(pipeline.runtime.dead_letters().is_empty());
}

#[tokio::test]
async fn test_upload_withSourceOutsideTargets_shouldTranslateEverything() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en", "fr"]), "出口", "ja");

    pipeline.upload_and_settle("exit.png").await;

    assert_eq!(pipeline.result_keys(), vec!["exit_to_en.txt", "exit_to_fr.txt"]);

    let mut requests = pipeline.translator.requests();
    requests.sort();
    assert_eq!(
        requests,
        vec![
            (Some("ja".to_string()), "en".to_string()),
            (Some("ja".to_string()), "fr".to_string()),
        ]
    );

    let translate: Vec<TranslateRequest> = pipeline
        .runtime
        .bus()
        .published("translate")
        .iter()
        .map(|e| e.decode().unwrap())
        .collect();
    assert!(translate.iter().all(|r| r.filename == "exit.png" && r.text == "出口"));
}

/// Output keys depend only on the image name and the target language
#[tokio::test]
async fn test_upload_withNestedDottedKey_shouldDeriveKeyFromLastDot() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["es"]), "Total", "en");

    pipeline.upload_and_settle("scans/receipt.v2.jpeg").await;

    assert_eq!(pipeline.result_keys(), vec!["scans/receipt.v2_to_es.txt"]);
}

#[tokio::test]
async fn test_upload_withDottedDirectory_shouldKeepImagesApart() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en"]), "Page", "en");

    pipeline.upload_and_settle("batch.2024/a").await;
    pipeline.upload_and_settle("batch.2024/b").await;

    assert_eq!(pipeline.result_keys(), vec!["batch.2024/a_to_en.txt", "batch.2024/b_to_en.txt"]);
}

#[tokio::test]
async fn test_upload_withRegionTarget_shouldTranslateBetweenRegions() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["zh-CN", "zh-TW"]), "出口", "zh-CN");

    pipeline.upload_and_settle("sign.png").await;

    assert_eq!(pipeline.result_keys(), vec!["sign_to_zh-CN.txt", "sign_to_zh-TW.txt"]);
    assert_eq!(pipeline.result_text("sign_to_zh-CN.txt").unwrap(), "出口");
    assert_eq!(pipeline.translator.calls(), 1);
}

/// Deletion events produce no work at all
#[tokio::test]
async fn test_notify_withDeletionEvent_shouldPublishNothing() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en", "de"]), "unused", "en");

    pipeline.runtime.notify(json!({
        "bucket": common::UPLOAD_BUCKET,
        "name": "photo.jpg",
        "timeDeleted": "2024-05-01T12:00:00Z"
    }));
    pipeline.runtime.settle().await;

    assert_eq!(pipeline.recognizer.calls(), 0);
    assert!(pipeline.runtime.bus().published("translate").is_empty());
    assert!(pipeline.runtime.bus().published("result").is_empty());
    assert!(pipeline.store.is_empty());
    assert!(pipeline.runtime.dead_letters().is_empty());
    assert_eq!(pipeline.runtime.handled(), 1);
}

/// A translate request without a target language is rejected before translation
#[tokio::test]
async fn test_translateTopic_withoutLang_shouldRejectWithoutTranslating() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en"]), "unused", "en");

    publish_json(
        &**pipeline.runtime.bus(),
        "translate",
        &json!({"text": "Hello", "filename": "a.png", "from": "en"}),
    )
    .await
    .unwrap();
    pipeline.runtime.settle().await;

    assert_eq!(pipeline.translator.calls(), 0);
    assert!(pipeline.runtime.bus().published("result").is_empty());

    let dead = pipeline.runtime.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].source, "translate");
    assert_eq!(dead[0].attempts, 1);
    assert!(dead[0].error.contains("lang not provided"));
}

#[tokio::test]
async fn test_storageTrigger_withoutName_shouldDeadLetterOnce() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en"]), "unused", "en");

    pipeline.runtime.notify(json!({"bucket": common::UPLOAD_BUCKET}));
    pipeline.runtime.settle().await;

    let dead = pipeline.runtime.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 1);
    assert_eq!(pipeline.recognizer.calls(), 0);
}

/// A save request on the result topic goes straight to the persister
#[tokio::test]
async fn test_resultTopic_withSaveRequest_shouldWriteObject() {
    let pipeline = TestPipeline::start(common::config_with_langs(&["en"]), "unused", "en");
    let request = SaveRequest {
        text: "Hola".into(),
        filename: "greeting.png".into(),
        lang: "es".into(),
    };

    publish_json(&**pipeline.runtime.bus(), "result", &request).await.unwrap();
    pipeline.runtime.settle().await;

    assert_eq!(pipeline.result_text("greeting_to_es.txt").unwrap(), "Hola");
}

#[tokio::test]
async fn test_runtime_withFilesystemStore_shouldWriteResultFiles() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let store = Arc::new(FsObjectStore::new(dir.path()));

    let runtime = LocalRuntime::builder(common::config_with_langs(&["en", "it"]))
        .store(store.clone())
        .recognizer(Arc::new(MockRecognizer::with_text("Closed")))
        .detector(Arc::new(MockDetector::with_language("en")))
        .translator(Arc::new(MockTranslator::working()))
        .start()
        .unwrap();

    runtime.upload(common::UPLOAD_BUCKET, "shop.png", &b"png"[..]).await.unwrap();
    runtime.settle().await;

    let italian = store.read("translated-text", "shop_to_it.txt").await.unwrap();
    assert_eq!(&italian[..], MockTranslator::expected("Closed", "it").as_bytes());
    assert!(dir.path().join("translated-text").join("shop_to_en.txt").is_file());

    runtime.shutdown().await;
}
