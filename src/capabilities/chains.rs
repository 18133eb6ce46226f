//! Canonical provider orderings. Adapters whose key is not configured are
//! left out, so a deployment with fewer keys just gets a shorter chain.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::CapabilityKind;
use crate::clients::{
    GeminiClient, HuggingFaceClient, OpenAiCompatClient, ProviderError, ProviderSettings,
    RetryPolicy, TextProvider,
};
use crate::config::Config;

pub type ProviderChain = Vec<Arc<dyn TextProvider>>;

/// Builds per-request adapter chains with explicit credentials
pub struct ChainBuilder<'a> {
    config: &'a Config,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn chain_for(&self, kind: CapabilityKind) -> ProviderChain {
        let runtime = &self.config.runtime;
        let models = &self.config.models;
        let primary = runtime.gemini_api_key.as_deref();
        let timeout = kind.timeout(&self.config.providers);

        let candidates: Vec<Option<Arc<dyn TextProvider>>> = match kind {
            CapabilityKind::CaptionGeneration => vec![
                self.gemini(primary, &models.gemini_vision, timeout),
                self.openrouter(&models.openrouter_vision, true, timeout),
                self.huggingface(timeout),
            ],
            CapabilityKind::HookDetection => vec![
                self.gemini(self.config.hook_gemini_key(), &models.gemini_vision, timeout),
                self.huggingface(timeout),
                self.openrouter(&models.openrouter_vision, true, timeout),
            ],
            CapabilityKind::ScriptAnalysis => {
                let mut chain: Vec<_> = models
                    .gemini_script
                    .iter()
                    .map(|model| self.gemini(primary, model, timeout))
                    .collect();
                chain.push(self.openrouter(&models.openrouter_text, false, timeout));
                chain
            }
            CapabilityKind::PersonaGeneration
            | CapabilityKind::NarrativeReport
            | CapabilityKind::AnalyticsQuery
            | CapabilityKind::InsightSummary => vec![
                self.openai(timeout),
                self.gemini(primary, &models.gemini_text, timeout),
                self.openrouter(&models.openrouter_text, false, timeout),
            ],
        };

        let chain: ProviderChain = candidates.into_iter().flatten().collect();
        let labels: Vec<String> = chain
            .iter()
            .map(|p| format!("{}:{}", p.id(), p.model()))
            .collect();
        debug!(capability = %kind, providers = ?labels, "provider chain built");
        chain
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.config.providers.rate_limit_attempts,
            self.config.providers.rate_limit_base_delay_ms,
        )
    }

    fn settings(&self, base_url: &str, key: &str, model: &str, timeout: Duration) -> ProviderSettings {
        ProviderSettings::new(base_url, key, model)
            .with_timeout(timeout)
            .with_retry(self.retry())
    }

    fn gemini(&self, key: Option<&str>, model: &str, timeout: Duration) -> Option<Arc<dyn TextProvider>> {
        let settings = self.settings(&self.config.providers.gemini_base_url, key?, model, timeout);
        adapter(GeminiClient::new(settings))
    }

    fn openrouter(&self, model: &str, vision: bool, timeout: Duration) -> Option<Arc<dyn TextProvider>> {
        let key = self.config.runtime.openrouter_api_key.as_deref()?;
        let settings = self.settings(&self.config.providers.openrouter_base_url, key, model, timeout);
        adapter(OpenAiCompatClient::openrouter(settings, vision))
    }

    fn openai(&self, timeout: Duration) -> Option<Arc<dyn TextProvider>> {
        let key = self.config.runtime.openai_api_key.as_deref()?;
        let settings = self.settings(
            &self.config.providers.openai_base_url,
            key,
            &self.config.models.openai_chat,
            timeout,
        );
        adapter(OpenAiCompatClient::openai(settings))
    }

    fn huggingface(&self, timeout: Duration) -> Option<Arc<dyn TextProvider>> {
        let key = self.config.runtime.huggingface_api_key.as_deref()?;
        let settings = self.settings(
            &self.config.providers.huggingface_base_url,
            key,
            &self.config.models.huggingface_text,
            timeout,
        );
        adapter(HuggingFaceClient::new(settings))
    }
}

fn adapter<P>(built: Result<P, ProviderError>) -> Option<Arc<dyn TextProvider>>
where
    P: TextProvider + 'static,
{
    match built {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            debug!("skipping provider: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(chain: &ProviderChain) -> Vec<String> {
        chain
            .iter()
            .map(|p| format!("{}:{}", p.id(), p.model()))
            .collect()
    }

    fn full_config() -> Config {
        let mut config = Config::default();
        config.runtime.gemini_api_key = Some("g".into());
        config.runtime.openai_api_key = Some("o".into());
        config.runtime.openrouter_api_key = Some("r".into());
        config.runtime.huggingface_api_key = Some("h".into());
        config
    }

    #[test]
    fn canonical_orderings() {
        let config = full_config();
        let builder = ChainBuilder::new(&config);

        let caption = labels(&builder.chain_for(CapabilityKind::CaptionGeneration));
        assert_eq!(caption[0], "gemini:gemini-1.5-flash");
        assert!(caption[1].starts_with("openrouter:"));
        assert!(caption[2].starts_with("huggingface:"));

        let hook = labels(&builder.chain_for(CapabilityKind::HookDetection));
        let ids: Vec<&str> = hook.iter().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(ids, vec!["gemini", "huggingface", "openrouter"]);

        let script = labels(&builder.chain_for(CapabilityKind::ScriptAnalysis));
        assert_eq!(
            &script[..3],
            &[
                "gemini:gemini-1.5-flash".to_string(),
                "gemini:gemini-1.5-pro".to_string(),
                "gemini:gemini-pro".to_string()
            ]
        );
        assert!(script[3].starts_with("openrouter:"));

        let query = labels(&builder.chain_for(CapabilityKind::AnalyticsQuery));
        assert_eq!(query[0], "openai:gpt-3.5-turbo");
        assert!(query[1].starts_with("gemini:"));
    }

    #[test]
    fn missing_keys_shrink_the_chain() {
        let mut config = Config::default();
        config.runtime.huggingface_api_key = Some("h".into());
        let builder = ChainBuilder::new(&config);
        assert_eq!(builder.chain_for(CapabilityKind::HookDetection).len(), 1);
        assert!(builder.chain_for(CapabilityKind::PersonaGeneration).is_empty());
    }

    #[test]
    fn hook_chain_uses_secondary_key_when_only_secondary_is_set() {
        let mut config = Config::default();
        config.runtime.gemini_api_key_secondary = Some("s".into());
        let builder = ChainBuilder::new(&config);
        assert_eq!(builder.chain_for(CapabilityKind::HookDetection).len(), 1);
        assert!(builder.chain_for(CapabilityKind::ScriptAnalysis).is_empty());
    }
}
