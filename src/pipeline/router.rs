/*!
 * Language router.
 *
 * Detects the language of the extracted text once, then emits one routing
 * decision per configured target language:
 * - target equals the detected language: pass-through to the result topic
 * - otherwise: a translate request on the translate topic
 *
 * All decisions are published concurrently. A failed detection publishes
 * nothing.
 */

use futures::future::join_all;
use log::{debug, error, info};
use std::sync::Arc;

use crate::app_config::RoutingConfig;
use crate::bus::{Ack, MessageBus, publish_json};
use crate::collaborators::LanguageDetector;
use crate::errors::{BusError, RoutingError};
use crate::language_utils::{describe_language, same_language};
use crate::messages::{ExtractionResult, RoutingDecision};

/// Build one decision per target language. Pure; no collaborator is called.
pub fn plan_routes(extraction: &ExtractionResult, source_lang: &str, to_lang: &[String]) -> Vec<RoutingDecision> {
    to_lang
        .iter()
        .map(|target| RoutingDecision {
            text: extraction.text.clone(),
            object_key: extraction.object_key.clone(),
            target_lang: target.clone(),
            source_lang: source_lang.to_string(),
            needs_translation: !same_language(source_lang, target),
        })
        .collect()
}

/// One published decision
#[derive(Debug, Clone)]
pub struct RoutedDecision {
    pub decision: RoutingDecision,
    pub topic: String,
    pub outcome: Result<Ack, BusError>,
}

/// Outcome of routing one image
#[derive(Debug, Clone)]
pub struct RoutingReport {
    pub object_key: String,
    pub source_lang: String,
    pub routes: Vec<RoutedDecision>,
}

impl RoutingReport {
    pub fn pass_through(&self) -> impl Iterator<Item = &RoutingDecision> {
        self.routes
            .iter()
            .map(|r| &r.decision)
            .filter(|d| !d.needs_translation)
    }

    pub fn translate_bound(&self) -> impl Iterator<Item = &RoutingDecision> {
        self.routes
            .iter()
            .map(|r| &r.decision)
            .filter(|d| d.needs_translation)
    }

    /// Target languages whose publish failed
    pub fn failed_langs(&self) -> Vec<String> {
        self.routes
            .iter()
            .filter(|r| r.outcome.is_err())
            .map(|r| r.decision.target_lang.clone())
            .collect()
    }
}

pub struct LanguageRouter {
    detector: Arc<dyn LanguageDetector>,
    bus: Arc<dyn MessageBus>,
    routing: RoutingConfig,
}

impl LanguageRouter {
    pub fn new(detector: Arc<dyn LanguageDetector>, bus: Arc<dyn MessageBus>, routing: RoutingConfig) -> Self {
        Self { detector, bus, routing }
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Topic a decision is published to
    pub fn topic_for(&self, decision: &RoutingDecision) -> &str {
        if decision.needs_translation {
            &self.routing.translate_topic
        } else {
            &self.routing.result_topic
        }
    }

    /// Detect the source language and fan out one message per target language
    ///
    /// Every publish is attempted even if some fail; the step fails if any did,
    /// so the trigger redelivers and downstream stages absorb the duplicates.
    pub async fn route(&self, extraction: &ExtractionResult) -> Result<RoutingReport, RoutingError> {
        let detection = self.detector.detect(&extraction.text).await.map_err(|e| {
            error!("Language detection failed for {}: {}", extraction.object_key, e);
            RoutingError::Detection(e)
        })?;

        info!(
            "Detected language {} for {}",
            describe_language(&detection.language),
            extraction.object_key
        );

        let decisions = plan_routes(extraction, &detection.language, &self.routing.to_lang);

        let outcomes = join_all(decisions.iter().map(|decision| self.publish(decision))).await;

        let routes: Vec<RoutedDecision> = decisions
            .into_iter()
            .zip(outcomes)
            .map(|(decision, outcome)| RoutedDecision {
                topic: self.topic_for(&decision).to_string(),
                decision,
                outcome,
            })
            .collect();

        let report = RoutingReport {
            object_key: extraction.object_key.clone(),
            source_lang: detection.language,
            routes,
        };

        let failed = report.failed_langs();
        if let Some(first) = report.routes.iter().find_map(|r| r.outcome.clone().err()) {
            error!(
                "Failed to route {} to: {}",
                report.object_key,
                failed.join(", ")
            );
            return Err(RoutingError::Publish { failed, first });
        }

        Ok(report)
    }

    async fn publish(&self, decision: &RoutingDecision) -> Result<Ack, BusError> {
        let topic = self.topic_for(decision);
        let outcome = if decision.needs_translation {
            publish_json(self.bus.as_ref(), topic, &decision.to_translate_request()).await
        } else {
            publish_json(self.bus.as_ref(), topic, &decision.to_pass_through().to_save_request()).await
        };

        match &outcome {
            Ok(ack) => debug!(
                "Routed {} ({} -> {}) to '{}' as {}",
                decision.object_key, decision.source_lang, decision.target_lang, topic, ack.message_id
            ),
            Err(e) => error!(
                "Could not route {} to '{}' for {}: {}",
                decision.object_key, topic, decision.target_lang, e
            ),
        }

        outcome
    }
}
