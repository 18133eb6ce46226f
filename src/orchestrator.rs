//! Fallback orchestration: walk a provider chain until one reply normalizes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::capabilities::fallbacks::terminal_fallback;
use crate::capabilities::{CapabilityRequest, prompts};
use crate::clients::{TextProvider, truncate};
use crate::config::ProvidersConfig;
use crate::error::Result;
use crate::normalize::{NormalizedResult, normalize};

const RAW_LOG_CAP: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    Empty,
    Failed(String),
    TimedOut,
    Unparseable,
}

/// Record of one adapter invocation; logged, then dropped
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    pub model: String,
    pub ordinal: usize,
    pub outcome: AttemptOutcome,
    pub raw_text: Option<String>,
    pub elapsed: Duration,
}

impl ProviderAttempt {
    fn log(&self, capability: &str) {
        let elapsed_ms = self.elapsed.as_millis() as u64;
        match &self.outcome {
            AttemptOutcome::Success => info!(
                capability,
                provider = %self.provider,
                model = %self.model,
                ordinal = self.ordinal,
                elapsed_ms,
                "provider attempt succeeded"
            ),
            other => warn!(
                capability,
                provider = %self.provider,
                model = %self.model,
                ordinal = self.ordinal,
                elapsed_ms,
                outcome = ?other,
                raw = self.raw_text.as_deref().unwrap_or(""),
                "provider attempt failed"
            ),
        }
    }
}

/// Runs capability requests against provider chains
#[derive(Debug, Clone)]
pub struct Orchestrator {
    text_timeout: Duration,
    vision_timeout: Duration,
}

impl Orchestrator {
    pub fn new(providers: &ProvidersConfig) -> Self {
        Self {
            text_timeout: Duration::from_millis(providers.text_timeout_ms),
            vision_timeout: Duration::from_millis(providers.vision_timeout_ms),
        }
    }

    pub fn with_timeouts(text_timeout: Duration, vision_timeout: Duration) -> Self {
        Self {
            text_timeout,
            vision_timeout,
        }
    }

    /// Try each adapter in order. The first reply that normalizes against the
    /// capability schema is returned and the rest of the chain is skipped.
    /// An exhausted chain yields the capability's terminal fallback; only
    /// structurally invalid requests produce an error.
    pub async fn execute(
        &self,
        request: &CapabilityRequest,
        chain: &[Arc<dyn TextProvider>],
    ) -> Result<NormalizedResult> {
        request.validate()?;

        let kind = request.kind();
        let schema = kind.schema();
        let timeout = if kind.is_vision() {
            self.vision_timeout
        } else {
            self.text_timeout
        };

        for (ordinal, provider) in chain.iter().enumerate() {
            let generation = prompts::build(request, provider.accepts_images());
            debug!(
                capability = %kind,
                provider = provider.id(),
                ordinal,
                images = generation.images.len(),
                "calling provider"
            );

            let started = Instant::now();
            let outcome = tokio::time::timeout(timeout, provider.generate(&generation)).await;
            let mut attempt = ProviderAttempt {
                provider: provider.id().to_string(),
                model: provider.model().to_string(),
                ordinal,
                outcome: AttemptOutcome::Success,
                raw_text: None,
                elapsed: started.elapsed(),
            };

            let raw = match outcome {
                Err(_) => {
                    attempt.outcome = AttemptOutcome::TimedOut;
                    attempt.log(kind.as_str());
                    continue;
                }
                Ok(Err(e)) => {
                    attempt.outcome = AttemptOutcome::Failed(e.to_string());
                    attempt.log(kind.as_str());
                    continue;
                }
                Ok(Ok(raw)) if raw.trim().is_empty() => {
                    attempt.outcome = AttemptOutcome::Empty;
                    attempt.log(kind.as_str());
                    continue;
                }
                Ok(Ok(raw)) => raw,
            };

            attempt.raw_text = Some(truncate(&raw, RAW_LOG_CAP));
            match normalize(&raw, schema) {
                Some(result) => {
                    attempt.log(kind.as_str());
                    return Ok(result.with_source(provider.id()));
                }
                None => {
                    attempt.outcome = AttemptOutcome::Unparseable;
                    attempt.log(kind.as_str());
                }
            }
        }

        warn!(
            capability = %kind,
            attempts = chain.len(),
            "provider chain exhausted, using terminal fallback"
        );
        Ok(terminal_fallback(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilityPayload;
    use crate::clients::{GenerationRequest, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: std::result::Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(reason: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextProvider for Scripted {
        fn id(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn generate(&self, _request: &GenerationRequest) -> std::result::Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(reason) => Err(ProviderError::Transport(reason.to_string())),
            }
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_timeouts(Duration::from_secs(30), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn unparseable_reply_advances_the_chain() {
        let first = Scripted::ok("I cannot help with that.");
        let second = Scripted::ok(r#"{"persona_name": "Night Owls"}"#);
        let chain: Vec<Arc<dyn TextProvider>> = vec![first.clone(), second.clone()];
        let request = CapabilityRequest::new(CapabilityPayload::Persona {
            context: serde_json::Value::Null,
        });

        let result = orchestrator().execute(&request, &chain).await.unwrap();
        assert_eq!(result.str_field("persona_name"), "Night Owls");
        assert_eq!(result.str_field("age_range"), "18-34");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_chain_goes_straight_to_fallback() {
        let request = CapabilityRequest::new(CapabilityPayload::Insight {
            context: serde_json::Value::Null,
        });
        let result = orchestrator().execute(&request, &[]).await.unwrap();
        assert_eq!(result.source, "fallback");
        assert!(!result.str_field("summary").is_empty());
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_a_provider() {
        let provider = Scripted::err("boom");
        let chain: Vec<Arc<dyn TextProvider>> = vec![provider.clone()];
        let request = CapabilityRequest::new(CapabilityPayload::Query {
            question: " ".into(),
            context: serde_json::Value::Null,
        });
        assert!(orchestrator().execute(&request, &chain).await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
