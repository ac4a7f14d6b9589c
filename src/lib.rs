/*!
 * # ocrpipe - Image text translation pipeline
 *
 * An event-driven pipeline that reads text out of uploaded images and stores
 * a translation of it for every configured target language.
 *
 * ## Features
 *
 * - Text recognition on images read from an object store
 * - Source language detection and fan-out to every target language
 * - Translation through a pluggable translation service
 * - Idempotent result keys (`photo.jpg` -> `photo_to_fr.txt`)
 * - At-least-once processing with redelivery of retryable failures
 * - In-process runtime for running the whole pipeline locally
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `bus`: Message bus abstraction and the in-memory bus
 * - `collaborators`: Traits for recognition, detection, translation and storage:
 *   - `collaborators::memory_store`: In-memory object store
 *   - `collaborators::fs_store`: Filesystem object store
 *   - `collaborators::mock`: Mock services for tests
 * - `messages`: Stage messages and payload validation
 * - `pipeline`: The pipeline stages, coordinator and local runtime
 * - `language_utils`: ISO language code utilities
 * - `logging`: Logger for the `log` facade
 * - `errors`: Custom error types for the pipeline
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod bus;
pub mod collaborators;
pub mod errors;
pub mod language_utils;
pub mod logging;
pub mod messages;
pub mod pipeline;

// Re-export main types for easier usage
pub use app_config::Config;
pub use bus::{Envelope, InMemoryBus, MessageBus};
pub use collaborators::{FsObjectStore, InMemoryObjectStore, LanguageDetector, ObjectStore, TextRecognizer, Translator};
pub use errors::{PipelineError, ProviderError, ValidationError};
pub use language_utils::{language_codes_match, normalize_to_part2t, same_language};
pub use pipeline::{LocalRuntime, PipelineCoordinator};
