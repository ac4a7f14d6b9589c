/*!
 * Image text translation pipeline.
 *
 * Four stages connected by topics on a message bus:
 *
 * - `extractor`: reads an uploaded image and recognizes its text
 * - `router`: detects the source language and fans out one message per target language
 * - `translator`: translates one request and forwards the result
 * - `persister`: writes each result under a key derived from the image name
 *
 * `coordinator` validates trigger payloads and drives the stages, and `local`
 * runs the whole pipeline in-process on an `InMemoryBus`.
 */

// Re-export main types for easier usage
pub use self::coordinator::{Collaborators, Completion, Disposition, PipelineCoordinator, Trigger};
pub use self::extractor::TextExtractor;
pub use self::local::{DeadLetter, LocalRuntime, LocalRuntimeBuilder};
pub use self::persister::{PersistReceipt, ResultPersister, derive_output_key};
pub use self::router::{LanguageRouter, RoutedDecision, RoutingReport, plan_routes};
pub use self::translator::TranslatorStage;

// Submodules
pub mod coordinator;
pub mod extractor;
pub mod local;
pub mod persister;
pub mod router;
pub mod translator;
