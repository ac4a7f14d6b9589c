/*!
 * Pipeline coordinator.
 *
 * Entry point for the three triggers of the pipeline:
 * - `process_image`: storage-change event, runs extraction and routing
 * - `translate_text`: message on the translate topic
 * - `save_result`: message on the result topic
 *
 * Every payload is validated before any collaborator is called. A validation
 * failure is fatal for that message; any other failure is surfaced so the
 * trigger infrastructure can redeliver.
 */

use anyhow::Result;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

use super::extractor::TextExtractor;
use super::persister::{PersistReceipt, ResultPersister};
use super::router::{LanguageRouter, RoutingReport};
use super::translator::TranslatorStage;
use crate::app_config::Config;
use crate::bus::{Ack, Envelope, MessageBus};
use crate::collaborators::{LanguageDetector, ObjectStore, TextRecognizer, Translator};
use crate::errors::{PipelineError, ValidationError};
use crate::messages::{self, parse_payload};

/// Collaborator handles injected into the pipeline
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ObjectStore>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub detector: Arc<dyn LanguageDetector>,
    pub translator: Arc<dyn Translator>,
    pub bus: Arc<dyn MessageBus>,
}

/// What a successfully handled trigger did
#[derive(Debug, Clone)]
pub enum Completion {
    /// Nothing to do (deletion event)
    Skipped { reason: String },
    /// Image extracted and routed to every target language
    Routed(RoutingReport),
    /// Translation published to the result topic
    Translated(Ack),
    /// Result written to the result bucket
    Saved(PersistReceipt),
}

/// How the trigger should settle the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Nack { retryable: bool },
}

impl Disposition {
    pub fn from_result<T>(result: &Result<T, PipelineError>) -> Self {
        match result {
            Ok(_) => Self::Ack,
            Err(e) => Self::Nack {
                retryable: e.is_retryable(),
            },
        }
    }
}

/// Kinds of trigger the coordinator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    StorageChange,
    TranslateRequest,
    SaveRequest,
}

pub struct PipelineCoordinator {
    config: Config,
    extractor: TextExtractor,
    router: LanguageRouter,
    translator: TranslatorStage,
    persister: ResultPersister,
}

impl PipelineCoordinator {
    /// Wire the stages together. Fails if the configuration is invalid.
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let Collaborators {
            store,
            recognizer,
            detector,
            translator,
            bus,
        } = collaborators;

        Ok(Self {
            extractor: TextExtractor::new(store.clone(), recognizer),
            router: LanguageRouter::new(detector, bus.clone(), config.routing()),
            translator: TranslatorStage::new(translator, bus, config.result_topic.clone()),
            persister: ResultPersister::new(store, config.result_bucket.clone()),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle a storage-change event: extract text and route it
    pub async fn process_image(&self, payload: &Value) -> Result<Completion, PipelineError> {
        let event = messages::validate_storage_event(payload).inspect_err(reject)?;

        if event.is_deletion {
            info!("Ignoring deletion event for {}", event.object_key);
            return Ok(Completion::Skipped {
                reason: "deletion event".to_string(),
            });
        }

        let extraction = self.extractor.extract(&event.image()).await?;
        let report = self.router.route(&extraction).await?;

        info!("Processed {}", event.object_key);
        Ok(Completion::Routed(report))
    }

    /// Handle a translate request
    pub async fn translate_text(&self, payload: &Value) -> Result<Completion, PipelineError> {
        let request = messages::validate_translate_request(payload).inspect_err(reject)?;
        let ack = self.translator.handle(&request.into_decision()).await?;
        Ok(Completion::Translated(ack))
    }

    /// Handle a save request
    pub async fn save_result(&self, payload: &Value) -> Result<Completion, PipelineError> {
        let request = messages::validate_save_request(payload).inspect_err(reject)?;

        info!("Received request to save file {}", request.filename);

        let receipt = self.persister.persist(&request.into_result()).await?;
        Ok(Completion::Saved(receipt))
    }

    /// Handle raw trigger bytes
    pub async fn handle_raw(&self, trigger: Trigger, raw: &[u8]) -> Result<Completion, PipelineError> {
        let payload = parse_payload(raw).inspect_err(reject)?;
        match trigger {
            Trigger::StorageChange => self.process_image(&payload).await,
            Trigger::TranslateRequest => self.translate_text(&payload).await,
            Trigger::SaveRequest => self.save_result(&payload).await,
        }
    }

    /// The trigger a topic feeds, if any
    pub fn trigger_for_topic(&self, topic: &str) -> Option<Trigger> {
        if topic == self.config.translate_topic {
            Some(Trigger::TranslateRequest)
        } else if topic == self.config.result_topic {
            Some(Trigger::SaveRequest)
        } else {
            None
        }
    }

    /// Handle a bus delivery according to its topic
    pub async fn dispatch(&self, envelope: &Envelope) -> Result<Completion, PipelineError> {
        let trigger = self.trigger_for_topic(&envelope.topic).ok_or_else(|| {
            let error = ValidationError::InvalidField {
                field: "topic",
                reason: format!("no stage subscribes to '{}'", envelope.topic),
            };
            reject(&error);
            error
        })?;

        if envelope.delivery_attempt > 1 {
            info!(
                "Redelivery {} of message {} on '{}'",
                envelope.delivery_attempt, envelope.id, envelope.topic
            );
        }

        self.handle_raw(trigger, &envelope.data).await
    }
}

fn reject(error: &ValidationError) {
    warn!("Rejecting message: {}", error);
}
