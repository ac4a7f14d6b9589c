/*!
 * In-process runtime for the pipeline.
 *
 * Plays the part of the trigger infrastructure: subscribes the coordinator to
 * the translate and result topics of an `InMemoryBus`, handles every delivery
 * on its own task, and applies the redelivery policy (retryable failures are
 * delivered again up to `max_deliveries` times, everything else is
 * dead-lettered). A handler that panics counts as a retryable failure.
 * Storage-change triggers are fed in with `upload` or `notify`. Must be
 * started from within a tokio runtime.
 *
 * The bus keeps a copy of every published message so tests can inspect the
 * traffic. Long-running processes should start with
 * `retain_published(false)`.
 */

use anyhow::{Result, anyhow};
use bytes::Bytes;
use futures::FutureExt;
use log::{error, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::coordinator::{Collaborators, Completion, Disposition, PipelineCoordinator};
use crate::app_config::Config;
use crate::bus::{Envelope, InMemoryBus, Subscription};
use crate::collaborators::{LanguageDetector, ObjectStore, TextRecognizer, Translator};
use crate::errors::PipelineError;
use crate::messages::StorageEvent;

/// Source name used for storage-change triggers in dead letters
pub const STORAGE_TRIGGER: &str = "storage";

/// A message given up on
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// Topic name, or `STORAGE_TRIGGER`
    pub source: String,
    pub payload: Bytes,
    pub error: String,
    pub attempts: u32,
}

#[derive(Default)]
struct RuntimeState {
    in_flight: AtomicUsize,
    handled: AtomicUsize,
    dead_letters: Mutex<Vec<DeadLetter>>,
    // Signalled whenever a trigger or delivery finishes
    progress: Notify,
}

impl RuntimeState {
    fn finish_trigger(&self) {
        self.handled.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.progress.notify_waiters();
    }

    fn finish_delivery(&self, bus: &InMemoryBus) {
        self.handled.fetch_add(1, Ordering::SeqCst);
        bus.complete_delivery();
        self.progress.notify_waiters();
    }

    fn dead_letter(&self, source: &str, payload: Bytes, error: &PipelineError, attempts: u32) {
        error!("Giving up on message from '{}' after {} attempt(s): {}", source, attempts, error);
        self.dead_letters.lock().push(DeadLetter {
            source: source.to_string(),
            payload,
            error: error.to_string(),
            attempts,
        });
    }
}

/// Builder for `LocalRuntime`
pub struct LocalRuntimeBuilder {
    config: Config,
    store: Option<Arc<dyn ObjectStore>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    translator: Option<Arc<dyn Translator>>,
    retain_published: bool,
}

impl LocalRuntimeBuilder {
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Whether the bus keeps published messages for inspection (default: yes)
    pub fn retain_published(mut self, retain: bool) -> Self {
        self.retain_published = retain;
        self
    }

    /// Wire the pipeline and start consuming the translate and result topics
    pub fn start(self) -> Result<LocalRuntime> {
        let store = self.store.ok_or_else(|| anyhow!("an object store is required"))?;
        let bus = Arc::new(InMemoryBus::new());
        bus.retain_published(self.retain_published);

        let collaborators = Collaborators {
            store: store.clone(),
            recognizer: self.recognizer.ok_or_else(|| anyhow!("a text recognizer is required"))?,
            detector: self.detector.ok_or_else(|| anyhow!("a language detector is required"))?,
            translator: self.translator.ok_or_else(|| anyhow!("a translator is required"))?,
            bus: bus.clone(),
        };

        let coordinator = Arc::new(PipelineCoordinator::new(self.config, collaborators)?);
        let state = Arc::new(RuntimeState::default());

        let config = coordinator.config();
        let workers = [config.translate_topic.as_str(), config.result_topic.as_str()]
            .into_iter()
            .map(|topic| {
                tokio::spawn(consume(
                    bus.subscribe(topic),
                    coordinator.clone(),
                    bus.clone(),
                    state.clone(),
                ))
            })
            .collect();

        Ok(LocalRuntime {
            coordinator,
            bus,
            store,
            state,
            workers,
        })
    }
}

pub struct LocalRuntime {
    coordinator: Arc<PipelineCoordinator>,
    bus: Arc<InMemoryBus>,
    store: Arc<dyn ObjectStore>,
    state: Arc<RuntimeState>,
    workers: Vec<JoinHandle<()>>,
}

impl LocalRuntime {
    pub fn builder(config: Config) -> LocalRuntimeBuilder {
        LocalRuntimeBuilder {
            config,
            store: None,
            recognizer: None,
            detector: None,
            translator: None,
            retain_published: true,
        }
    }

    pub fn bus(&self) -> &Arc<InMemoryBus> {
        &self.bus
    }

    pub fn coordinator(&self) -> &Arc<PipelineCoordinator> {
        &self.coordinator
    }

    /// Store an image and fire the storage-change trigger for it
    pub async fn upload(&self, bucket: &str, key: &str, data: impl Into<Bytes>) -> Result<()> {
        self.store.write(bucket, key, data.into()).await?;

        let event = StorageEvent {
            bucket: bucket.to_string(),
            name: key.to_string(),
            time_deleted: None,
        };
        self.notify(serde_json::to_value(event)?);
        Ok(())
    }

    /// Fire the storage-change trigger with an arbitrary payload
    pub fn notify(&self, payload: Value) {
        self.state.in_flight.fetch_add(1, Ordering::SeqCst);

        let coordinator = self.coordinator.clone();
        let state = self.state.clone();
        let max_deliveries = coordinator.config().max_deliveries;

        tokio::spawn(async move {
            let mut attempt = 1;
            loop {
                let result = run_guarded(coordinator.process_image(&payload)).await;
                match Disposition::from_result(&result) {
                    Disposition::Ack => break,
                    Disposition::Nack { retryable: true } if attempt < max_deliveries => {
                        warn!("Storage trigger failed (attempt {}), redelivering", attempt);
                        attempt += 1;
                    }
                    Disposition::Nack { .. } => {
                        if let Err(e) = &result {
                            let raw = Bytes::from(payload.to_string());
                            state.dead_letter(STORAGE_TRIGGER, raw, e, attempt);
                        }
                        break;
                    }
                }
            }
            state.finish_trigger();
        });
    }

    fn is_idle(&self) -> bool {
        self.state.in_flight.load(Ordering::SeqCst) == 0 && self.bus.outstanding() == 0
    }

    /// Wait until no trigger or bus delivery is being processed
    pub async fn settle(&self) {
        loop {
            // Register before checking so a wake-up between the two is not missed
            let progress = self.state.progress.notified();
            tokio::pin!(progress);
            progress.as_mut().enable();

            if self.is_idle() {
                return;
            }
            progress.await;
        }
    }

    /// Triggers and deliveries handled so far, including failed ones
    pub fn handled(&self) -> usize {
        self.state.handled.load(Ordering::SeqCst)
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.dead_letters.lock().clone()
    }

    /// Close the bus and wait for the topic consumers to finish
    pub async fn shutdown(self) {
        self.settle().await;
        self.bus.close();
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Topic consumer ended abnormally: {}", e);
            }
        }
    }
}

/// Deliver every envelope of one subscription to the coordinator
async fn consume(
    mut subscription: Subscription,
    coordinator: Arc<PipelineCoordinator>,
    bus: Arc<InMemoryBus>,
    state: Arc<RuntimeState>,
) {
    while let Some(envelope) = subscription.next().await {
        let coordinator = coordinator.clone();
        let bus = bus.clone();
        let state = state.clone();

        tokio::spawn(async move {
            let result = run_guarded(coordinator.dispatch(&envelope)).await;
            settle_delivery(&coordinator, &bus, &state, &envelope, &result);
            state.finish_delivery(&bus);
        });
    }
}

/// Run one handler, reporting a panic as a retryable failure
async fn run_guarded<F>(handler: F) -> Result<Completion, PipelineError>
where
    F: Future<Output = Result<Completion, PipelineError>>,
{
    AssertUnwindSafe(handler).catch_unwind().await.unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());
        error!("Handler panicked: {}", message);
        Err(PipelineError::Unknown(format!("handler panicked: {}", message)))
    })
}

fn settle_delivery(
    coordinator: &PipelineCoordinator,
    bus: &InMemoryBus,
    state: &RuntimeState,
    envelope: &Envelope,
    result: &Result<Completion, PipelineError>,
) {
    let Err(error) = result else {
        return;
    };

    let retryable = error.is_retryable();
    if retryable && envelope.delivery_attempt < coordinator.config().max_deliveries {
        warn!(
            "Message {} on '{}' failed (attempt {}), redelivering",
            envelope.id, envelope.topic, envelope.delivery_attempt
        );
        if let Err(e) = bus.redeliver(envelope) {
            let error = PipelineError::Bus(e);
            state.dead_letter(&envelope.topic, envelope.data.clone(), &error, envelope.delivery_attempt);
        }
        return;
    }

    state.dead_letter(&envelope.topic, envelope.data.clone(), error, envelope.delivery_attempt);
}
