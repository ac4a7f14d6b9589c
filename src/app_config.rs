use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::bus::validate_topic_name;
use crate::language_utils::validate_language_tag;

/// Application configuration module
/// This module handles loading and validating the static pipeline settings:
/// the two bus topics, the result bucket and the target languages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Topic carrying translate requests
    #[serde(alias = "TRANSLATE_TOPIC")]
    pub translate_topic: String,

    /// Topic carrying save requests (translated or pass-through text)
    #[serde(alias = "RESULT_TOPIC")]
    pub result_topic: String,

    /// Bucket receiving the `<name>_to_<lang>.txt` objects
    #[serde(alias = "RESULT_BUCKET")]
    pub result_bucket: String,

    /// Languages every image is translated into
    #[serde(alias = "TO_LANG")]
    pub to_lang: Vec<String>,

    /// Credential handed to the translation collaborator
    #[serde(alias = "TRANSLATE_API_KEY", default)]
    pub translate_api_key: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// How many times the local runtime delivers a message before dead-lettering it
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// The subset of the configuration the language router needs
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub translate_topic: String,
    pub result_topic: String,
    pub to_lang: Vec<String>,
}

fn default_max_deliveries() -> u32 {
    5
}

fn default_translate_topic() -> String {
    "translate".to_string()
}

fn default_result_topic() -> String {
    "result".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translate_topic: default_translate_topic(),
            result_topic: default_result_topic(),
            result_bucket: "translated-text".to_string(),
            to_lang: vec!["en".to_string(), "fr".to_string(), "es".to_string()],
            translate_api_key: String::new(),
            log_level: LogLevel::default(),
            max_deliveries: default_max_deliveries(),
        }
    }
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.validate()
            .with_context(|| format!("Configuration validation failed: {:?}", path))?;

        Ok(config)
    }

    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        validate_topic_name(&self.translate_topic)
            .map_err(|e| anyhow!("translateTopic: {}", e))?;
        validate_topic_name(&self.result_topic)
            .map_err(|e| anyhow!("resultTopic: {}", e))?;

        if self.translate_topic == self.result_topic {
            return Err(anyhow!(
                "translateTopic and resultTopic must differ (both are '{}')",
                self.translate_topic
            ));
        }

        if self.result_bucket.trim().is_empty() {
            return Err(anyhow!("resultBucket must not be empty"));
        }

        if self.to_lang.is_empty() {
            return Err(anyhow!("toLang must list at least one target language"));
        }

        let mut seen = HashSet::new();
        for lang in &self.to_lang {
            validate_language_tag(lang)
                .with_context(|| format!("toLang contains an invalid language: '{}'", lang))?;
            if !seen.insert(lang.to_lowercase()) {
                return Err(anyhow!("toLang lists '{}' more than once", lang));
            }
        }

        if self.max_deliveries == 0 {
            return Err(anyhow!("maxDeliveries must be at least 1"));
        }

        Ok(())
    }

    /// Routing settings for the language router
    pub fn routing(&self) -> RoutingConfig {
        RoutingConfig {
            translate_topic: self.translate_topic.clone(),
            result_topic: self.result_topic.clone(),
            to_lang: self.to_lang.clone(),
        }
    }
}
