pub mod elevenlabs;
pub mod gemini;
pub mod huggingface;
pub mod openai;
pub mod traits;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;

pub use elevenlabs::ElevenLabsClient;
pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceClient;
pub use openai::OpenAiCompatClient;
pub use traits::{GenerationParams, GenerationRequest, ImageInput, ProviderError, TextProvider};

const ERROR_BODY_CAP: usize = 500;

/// Backoff applied only when a provider answers 429
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, 3),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// base * 2^attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(8))
    }
}

/// Connection settings shared by every adapter constructor.
/// The API key is owned by the adapter; nothing is read from process state.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn build_client(&self) -> Result<Client, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "missing API key for {}",
                self.base_url
            )));
        }
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))
    }
}

/// Send a request, retrying with exponential backoff while the provider returns 429.
/// Any other non-success status fails immediately.
pub(crate) async fn send_with_backoff<F>(
    provider: &str,
    retry: &RetryPolicy,
    timeout: Duration,
    mut build: F,
) -> Result<Response, ProviderError>
where
    F: FnMut() -> RequestBuilder,
{
    for attempt in 0..retry.max_attempts {
        let response = build().send().await.map_err(|e| match ProviderError::from(e) {
            ProviderError::Timeout { .. } => ProviderError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            },
            other => other,
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            if attempt + 1 < retry.max_attempts {
                let delay = retry.delay_for(attempt);
                warn!(
                    provider,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_CAP),
            });
        }

        return Ok(response);
    }

    Err(ProviderError::RateLimited {
        attempts: retry.max_attempts,
    })
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryPolicy::new(3, 100);
        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn attempts_are_capped_at_three() {
        assert_eq!(RetryPolicy::new(10, 1).max_attempts, 3);
        assert_eq!(RetryPolicy::new(0, 1).max_attempts, 1);
    }

    #[test]
    fn empty_key_is_not_configured() {
        let settings = ProviderSettings::new("http://localhost", "  ", "m");
        assert!(matches!(
            settings.build_client(),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let settings = ProviderSettings::new("http://x.test/v1/", "k", "m");
        assert_eq!(settings.endpoint("/chat/completions"), "http://x.test/v1/chat/completions");
    }
}
