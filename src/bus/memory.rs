/*!
 * In-process message bus.
 *
 * Keeps every published envelope per topic for inspection (unless retention
 * is switched off) and fans each one out to the topic's subscribers over
 * unbounded tokio channels. The bus counts
 * deliveries that subscribers have not completed yet, which lets a runtime
 * tell when the whole pipeline is idle.
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use super::{Ack, Envelope, MessageBus};
use crate::errors::BusError;

#[derive(Default)]
struct TopicState {
    published: Vec<Envelope>,
    subscribers: Vec<mpsc::UnboundedSender<Envelope>>,
}

/// In-memory bus shared between stages and tests
#[derive(Default)]
pub struct InMemoryBus {
    topics: RwLock<HashMap<String, TopicState>>,
    failing_topics: RwLock<HashSet<String>>,
    discard_published: AtomicBool,
    outstanding: AtomicUsize,
    closed: AtomicBool,
}

/// Receiving end of a topic subscription
pub struct Subscription {
    topic: String,
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next delivery; `None` once the bus is closed
    pub async fn next(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Take a delivery if one is already queued
    pub fn try_next(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating it if needed
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .subscribers
            .push(sender);

        Subscription {
            topic: topic.to_string(),
            receiver,
        }
    }

    /// Keep a copy of every published envelope for `published` (the default).
    /// Without retention the bus only delivers, and memory stays flat on long runs.
    pub fn retain_published(&self, retain: bool) {
        self.discard_published.store(!retain, Ordering::SeqCst);
        if !retain {
            for state in self.topics.write().values_mut() {
                state.published = Vec::new();
            }
        }
    }

    /// Every envelope published to `topic`, oldest first
    pub fn published(&self, topic: &str) -> Vec<Envelope> {
        self.topics
            .read()
            .get(topic)
            .map(|t| t.published.clone())
            .unwrap_or_default()
    }

    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Deliver an envelope again to the subscribers of its topic
    pub fn redeliver(&self, envelope: &Envelope) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        let mut topics = self.topics.write();
        let state = topics.get_mut(&envelope.topic).ok_or_else(|| BusError::PublishFailed {
            topic: envelope.topic.clone(),
            message: "topic does not exist".to_string(),
        })?;
        self.deliver(state, envelope.redelivered());
        Ok(())
    }

    /// Mark one delivery as handled by its subscriber
    pub fn complete_delivery(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Deliveries sent to subscribers and not yet completed
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Make every publish to `topic` fail until restored
    pub fn fail_publishes_to(&self, topic: &str) {
        self.failing_topics.write().insert(topic.to_string());
    }

    pub fn restore_publishes_to(&self, topic: &str) {
        self.failing_topics.write().remove(topic);
    }

    /// Stop accepting publishes and end every subscription
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for state in self.topics.write().values_mut() {
            state.subscribers.clear();
        }
    }

    fn deliver(&self, state: &mut TopicState, envelope: Envelope) {
        state.subscribers.retain(|subscriber| {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
            if subscriber.send(envelope.clone()).is_ok() {
                true
            } else {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                false
            }
        });
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn ensure_topic(&self, topic: &str) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::TopicCreation {
                topic: topic.to_string(),
                message: "bus is closed".to_string(),
            });
        }
        self.topics.write().entry(topic.to_string()).or_default();
        Ok(())
    }

    async fn topic_exists(&self, topic: &str) -> Result<bool, BusError> {
        Ok(self.topics.read().contains_key(topic))
    }

    async fn publish(&self, topic: &str, data: Bytes) -> Result<Ack, BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        if self.failing_topics.read().contains(topic) {
            return Err(BusError::PublishFailed {
                topic: topic.to_string(),
                message: "publishing is disabled for this topic".to_string(),
            });
        }

        let mut topics = self.topics.write();
        let state = topics.get_mut(topic).ok_or_else(|| BusError::PublishFailed {
            topic: topic.to_string(),
            message: "topic does not exist".to_string(),
        })?;

        let envelope = Envelope::new(topic, data);
        let ack = Ack {
            message_id: envelope.id,
            topic: topic.to_string(),
            published_at: envelope.published_at,
        };

        if !self.discard_published.load(Ordering::SeqCst) {
            state.published.push(envelope.clone());
        }
        self.deliver(state, envelope);

        Ok(ack)
    }
}
