/*!
 * Message bus adapter.
 *
 * Stages talk to each other only through topics. This module defines the
 * `MessageBus` trait the stages publish through, the `Envelope` a subscriber
 * receives, and `publish_json`, which makes sure a topic exists before the
 * first message is sent to it.
 *
 * Delivery is at-least-once: a subscriber may see the same envelope more than
 * once and must tolerate it.
 */

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::errors::{BusError, ValidationError};

pub mod memory;

pub use memory::{InMemoryBus, Subscription};

/// Pub/Sub topic naming rule
static TOPIC_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9\-_.~+%]{2,254}$").expect("topic name pattern is valid")
});

/// Check a topic name against the bus naming rules
pub fn validate_topic_name(topic: &str) -> Result<(), BusError> {
    if !TOPIC_NAME.is_match(topic) {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "must start with a letter and contain 3 to 255 letters, digits or -_.~+%".to_string(),
        });
    }
    if topic.to_lowercase().starts_with("goog") {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "must not start with \"goog\"".to_string(),
        });
    }
    Ok(())
}

/// A message as delivered to a subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: Uuid,
    pub topic: String,
    /// JSON body
    pub data: Bytes,
    pub published_at: DateTime<Utc>,
    /// 1 on first delivery, incremented on every redelivery
    pub delivery_attempt: u32,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, data: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            data,
            published_at: Utc::now(),
            delivery_attempt: 1,
        }
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value, ValidationError> {
        crate::messages::parse_payload(&self.data)
    }

    /// Parse the body into a typed message
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_slice(&self.data).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// The same message, one delivery later
    pub fn redelivered(&self) -> Self {
        Self {
            delivery_attempt: self.delivery_attempt + 1,
            ..self.clone()
        }
    }
}

/// Acknowledgement for an accepted publish
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub message_id: Uuid,
    pub topic: String,
    pub published_at: DateTime<Utc>,
}

/// Topic based publish/subscribe transport
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Create the topic if it does not exist. Creating an existing topic is not an error.
    async fn ensure_topic(&self, topic: &str) -> Result<(), BusError>;

    /// Whether the topic exists
    async fn topic_exists(&self, topic: &str) -> Result<bool, BusError>;

    /// Publish a JSON body to an existing topic
    async fn publish(&self, topic: &str, data: Bytes) -> Result<Ack, BusError>;
}

/// Serialize `message` and publish it, creating the topic first if needed
pub async fn publish_json<T>(bus: &dyn MessageBus, topic: &str, message: &T) -> Result<Ack, BusError>
where
    T: Serialize + ?Sized + Sync,
{
    validate_topic_name(topic)?;

    let data = Bytes::from(serde_json::to_vec(message)?);

    if let Err(e) = bus.ensure_topic(topic).await {
        error!("Could not get or create topic '{}': {}", topic, e);
        return Err(e);
    }

    let ack = bus.publish(topic, data).await?;
    debug!("Published message {} to topic '{}'", ack.message_id, topic);
    Ok(ack)
}
