use log::{debug, error, info};
use std::sync::Arc;

use crate::bus::{Ack, MessageBus, publish_json};
use crate::collaborators::Translator;
use crate::errors::TranslationError;
use crate::messages::{RoutingDecision, TranslationResult};

/// Translator stage
///
/// Consumes one translate-bound decision, calls the translation service and
/// publishes the result to the result topic. Translation is a pure function of
/// (text, source, target) and nothing is written before the persister runs, so
/// a redelivered request can simply be translated again.
pub struct TranslatorStage {
    translator: Arc<dyn Translator>,
    bus: Arc<dyn MessageBus>,
    result_topic: String,
}

impl TranslatorStage {
    pub fn new(translator: Arc<dyn Translator>, bus: Arc<dyn MessageBus>, result_topic: impl Into<String>) -> Self {
        Self {
            translator,
            bus,
            result_topic: result_topic.into(),
        }
    }

    /// Produce the result for one decision without publishing it
    ///
    /// A decision whose source already matches its target is passed through
    /// without calling the translation service.
    pub async fn translate(&self, decision: &RoutingDecision) -> Result<TranslationResult, TranslationError> {
        if !decision.needs_translation {
            debug!(
                "{} is already in {}, skipping translation",
                decision.object_key, decision.target_lang
            );
            return Ok(decision.to_pass_through());
        }

        info!("Translating text into {}", decision.target_lang);

        let from = (!decision.source_lang.is_empty()).then_some(decision.source_lang.as_str());
        let text = self
            .translator
            .translate(&decision.text, from, &decision.target_lang)
            .await
            .map_err(|source| {
                error!(
                    "Translation of {} into {} failed: {}",
                    decision.object_key, decision.target_lang, source
                );
                TranslationError::Provider {
                    lang: decision.target_lang.clone(),
                    source,
                }
            })?;

        Ok(TranslationResult {
            text,
            object_key: decision.object_key.clone(),
            lang: decision.target_lang.clone(),
        })
    }

    /// Translate and publish the result to the result topic
    pub async fn handle(&self, decision: &RoutingDecision) -> Result<Ack, TranslationError> {
        let result = self.translate(decision).await?;

        let ack = publish_json(self.bus.as_ref(), &self.result_topic, &result.to_save_request())
            .await
            .map_err(|e| {
                error!("Failed to publish translation of {}: {}", result.object_key, e);
                TranslationError::Publish(e)
            })?;

        info!("Text translated to {}", result.lang);
        Ok(ack)
    }
}
