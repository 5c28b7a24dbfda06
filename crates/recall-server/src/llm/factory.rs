// crates/recall-server/src/llm/factory.rs
// Provider factory for managing the configured LLM clients

use crate::config::{ApiKeys, LlmSettings};
use crate::llm::claude::ClaudeClient;
use crate::llm::openai_compat::OpenAiCompatClient;
use crate::llm::provider::{LlmClient, Provider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed fallback chain; the local provider closes it because it needs no
/// credentials.
const FALLBACK_ORDER: [Provider; 5] = [
    Provider::DeepSeek,
    Provider::OpenAi,
    Provider::Claude,
    Provider::Qianwen,
    Provider::OllamaLocal,
];

/// Factory for creating and selecting LLM provider clients
pub struct ProviderFactory {
    clients: HashMap<Provider, Arc<dyn LlmClient>>,
    preferred: Option<Provider>,
}

impl ProviderFactory {
    /// Build from pre-loaded keys and settings (no duplicate env reads)
    pub fn new(api_keys: &ApiKeys, settings: &LlmSettings) -> Self {
        let mut clients: HashMap<Provider, Arc<dyn LlmClient>> = HashMap::new();
        let model_override = settings.model.clone();

        let make_compat = |provider: Provider, key: &str| -> Arc<dyn LlmClient> {
            let model = model_override
                .clone()
                .filter(|_| Some(provider) == preferred_of(settings))
                .unwrap_or_else(|| provider.default_model().to_string());
            Arc::new(OpenAiCompatClient::with_model(
                provider,
                Some(key.to_string()),
                model,
            ))
        };

        if let Some(ref key) = api_keys.deepseek {
            clients.insert(Provider::DeepSeek, make_compat(Provider::DeepSeek, key));
        }
        if let Some(ref key) = api_keys.openai {
            clients.insert(Provider::OpenAi, make_compat(Provider::OpenAi, key));
        }
        if let Some(ref key) = api_keys.qianwen {
            clients.insert(Provider::Qianwen, make_compat(Provider::Qianwen, key));
        }
        if let Some(ref key) = api_keys.claude {
            let model = model_override
                .clone()
                .filter(|_| preferred_of(settings) == Some(Provider::Claude))
                .unwrap_or_else(|| Provider::Claude.default_model().to_string());
            clients.insert(
                Provider::Claude,
                Arc::new(ClaudeClient::with_model(key.clone(), model)),
            );
        }

        // Always registered: local inference has no key to check
        let ollama_model = model_override
            .filter(|_| preferred_of(settings) == Some(Provider::OllamaLocal))
            .unwrap_or_else(|| Provider::OllamaLocal.default_model().to_string());
        clients.insert(
            Provider::OllamaLocal,
            Arc::new(OpenAiCompatClient::with_model(
                Provider::OllamaLocal,
                None,
                ollama_model,
            )),
        );

        let preferred = preferred_of(settings);
        if let Some(p) = preferred {
            if clients.contains_key(&p) {
                info!(provider = %p, "LLM provider configured");
            } else {
                warn!(provider = %p, "LLM_PROVIDER set but its API key is missing; falling back");
            }
        }

        let available: Vec<_> = clients.keys().map(|p| p.to_string()).collect();
        info!(providers = ?available, "LLM providers available");

        Self { clients, preferred }
    }

    /// Client used by the pipeline: preferred provider first, then the
    /// fallback chain.
    pub fn primary(&self) -> Option<Arc<dyn LlmClient>> {
        if let Some(ref p) = self.preferred
            && let Some(client) = self.clients.get(p)
        {
            return Some(client.clone());
        }
        for provider in FALLBACK_ORDER {
            if let Some(client) = self.clients.get(&provider) {
                return Some(client.clone());
            }
        }
        None
    }

    /// Get a specific provider client (if available)
    pub fn get_provider(&self, provider: Provider) -> Option<Arc<dyn LlmClient>> {
        self.clients.get(&provider).cloned()
    }

    /// List all available providers
    pub fn available_providers(&self) -> Vec<Provider> {
        self.clients.keys().copied().collect()
    }

    pub fn is_available(&self, provider: Provider) -> bool {
        self.clients.contains_key(&provider)
    }
}

fn preferred_of(settings: &LlmSettings) -> Option<Provider> {
    settings.provider.as_deref().and_then(Provider::from_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(deepseek: bool, claude: bool) -> ApiKeys {
        ApiKeys {
            deepseek: deepseek.then(|| "ds-key".to_string()),
            openai: None,
            claude: claude.then(|| "cl-key".to_string()),
            qianwen: None,
        }
    }

    #[test]
    fn test_ollama_always_registered() {
        let factory = ProviderFactory::new(&ApiKeys::default(), &LlmSettings::default());
        assert!(factory.is_available(Provider::OllamaLocal));
        assert!(!factory.is_available(Provider::DeepSeek));
    }

    #[test]
    fn test_primary_prefers_configured_provider() {
        let settings = LlmSettings {
            provider: Some("claude".into()),
            ..Default::default()
        };
        let factory = ProviderFactory::new(&keys(true, true), &settings);
        let primary = factory.primary().unwrap();
        assert_eq!(primary.provider_type(), Provider::Claude);
    }

    #[test]
    fn test_primary_falls_back_in_order() {
        let factory = ProviderFactory::new(&keys(true, true), &LlmSettings::default());
        // No preference: deepseek leads the chain
        assert_eq!(
            factory.primary().unwrap().provider_type(),
            Provider::DeepSeek
        );
    }

    #[test]
    fn test_primary_without_keys_is_ollama() {
        let factory = ProviderFactory::new(&ApiKeys::default(), &LlmSettings::default());
        assert_eq!(
            factory.primary().unwrap().provider_type(),
            Provider::OllamaLocal
        );
    }

    #[test]
    fn test_preferred_provider_missing_key_falls_back() {
        let settings = LlmSettings {
            provider: Some("openai".into()),
            ..Default::default()
        };
        let factory = ProviderFactory::new(&keys(true, false), &settings);
        assert_eq!(
            factory.primary().unwrap().provider_type(),
            Provider::DeepSeek
        );
    }

    #[test]
    fn test_model_override_applies_to_preferred_only() {
        let settings = LlmSettings {
            provider: Some("deepseek".into()),
            model: Some("deepseek-reasoner".into()),
            ..Default::default()
        };
        let factory = ProviderFactory::new(&keys(true, true), &settings);
        assert_eq!(
            factory.primary().unwrap().model_name(),
            "deepseek-reasoner"
        );
        assert_eq!(
            factory
                .get_provider(Provider::Claude)
                .unwrap()
                .model_name(),
            Provider::Claude.default_model()
        );
    }
}
