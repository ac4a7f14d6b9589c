/*!
 * Mock collaborators for testing.
 *
 * Each mock counts its calls and follows a `MockBehavior`:
 * - `MockBehavior::Working` - Always succeeds
 * - `MockBehavior::Failing` - Always fails with an error
 * - `MockBehavior::Intermittent` - Fails every Nth call
 * - `MockBehavior::Slow` - Succeeds after a delay
 *
 * `MockTranslator::failing_for` additionally fails only selected target
 * languages, which is how partial fan-out failures are simulated.
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Detection, LanguageDetector, TextRecognizer, Translator};
use crate::errors::ProviderError;
use crate::messages::ImageRef;

/// Behavior mode shared by the mocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Simulates slow responses
    Slow { delay_ms: u64 },
}

/// Call counter and behavior shared by clones of a mock
#[derive(Debug, Clone)]
struct MockState {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
}

impl MockState {
    fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Count the call and apply the behavior
    async fn check(&self, service: &str) -> Result<(), ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("Mock {} failure", service),
            }),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::Unavailable(format!(
                        "Mock {} intermittent failure (request {})",
                        service,
                        count + 1
                    )))
                } else {
                    Ok(())
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(())
            }
        }
    }
}

/// Mock text recognizer returning a fixed text
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    state: MockState,
    text: String,
}

impl MockRecognizer {
    pub fn new(behavior: MockBehavior, text: impl Into<String>) -> Self {
        Self {
            state: MockState::new(behavior),
            text: text.into(),
        }
    }

    /// A recognizer that always returns `text`
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Working, text)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, "")
    }

    pub fn calls(&self) -> usize {
        self.state.calls()
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, image: &ImageRef, bytes: Bytes) -> Result<String, ProviderError> {
        self.state.check("vision").await?;
        if bytes.is_empty() {
            return Err(ProviderError::InvalidInput(format!("{} has no content", image)));
        }
        Ok(self.text.clone())
    }
}

/// Mock language detector returning a fixed language
#[derive(Debug, Clone)]
pub struct MockDetector {
    state: MockState,
    language: String,
}

impl MockDetector {
    pub fn new(behavior: MockBehavior, language: impl Into<String>) -> Self {
        Self {
            state: MockState::new(behavior),
            language: language.into(),
        }
    }

    /// A detector that always reports `language`
    pub fn with_language(language: impl Into<String>) -> Self {
        Self::new(MockBehavior::Working, language)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, "")
    }

    pub fn calls(&self) -> usize {
        self.state.calls()
    }
}

#[async_trait]
impl LanguageDetector for MockDetector {
    async fn detect(&self, _text: &str) -> Result<Detection, ProviderError> {
        self.state.check("detect").await?;
        Ok(Detection {
            language: self.language.clone(),
            confidence: Some(0.98),
        })
    }
}

/// Mock translator producing `[<to>] <text>`
#[derive(Debug, Clone)]
pub struct MockTranslator {
    state: MockState,
    failing_langs: Arc<HashSet<String>>,
    requests: Arc<Mutex<Vec<(Option<String>, String)>>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            state: MockState::new(behavior),
            failing_langs: Arc::new(HashSet::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock translator that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock translator that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a translator that fails only for the given target languages
    pub fn failing_for(langs: &[&str]) -> Self {
        Self {
            failing_langs: Arc::new(langs.iter().map(|l| l.to_string()).collect()),
            ..Self::working()
        }
    }

    /// The text this mock returns for a successful translation
    pub fn expected(text: &str, to: &str) -> String {
        format!("[{}] {}", to, text)
    }

    pub fn calls(&self) -> usize {
        self.state.calls()
    }

    /// (from, to) pairs seen so far
    pub fn requests(&self) -> Vec<(Option<String>, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, from: Option<&str>, to: &str) -> Result<String, ProviderError> {
        self.requests
            .lock()
            .push((from.map(str::to_string), to.to_string()));
        self.state.check("translate").await?;

        if self.failing_langs.contains(to) {
            return Err(ProviderError::ApiError {
                status_code: 400,
                message: format!("Mock translation into '{}' rejected", to),
            });
        }

        Ok(Self::expected(text, to))
    }
}
