// crates/recall-server/src/config/mod.rs
// Engine configuration: env-derived settings plus pipeline tunables

mod env;

pub use env::{ApiKeys, ConfigValidation, DrivenFlags, EnvConfig, LlmSettings, RepositoryKind};

use std::time::Duration;

/// Tunables for the retrieval pipeline. Constructed once at startup and
/// passed explicitly; there are no hidden singletons.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-call budget for both model calls
    pub llm_timeout: Duration,
    /// Per-dimension budget for backend fan-out
    pub backend_timeout: Duration,
    /// Update confidence at or above which persistence is scheduled
    pub persistence_threshold: f64,
    /// Idle lifetime of a session context before eviction
    pub cache_expiry: Duration,
    /// How often the eviction scan runs
    pub eviction_interval: Duration,
    /// Token cap for the intent-analysis call
    pub intent_max_tokens: u32,
    /// Token cap for the synthesis call
    pub synthesis_max_tokens: u32,
    /// Sampling temperature for both model calls
    pub temperature: f64,
    /// Event cap on the time-recall fast path
    pub time_recall_limit: usize,
    /// Apply the CJK query-enrichment prefixes; disable for corpora where
    /// the prefixes would hurt backend recall
    pub cjk_enrichment: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(40),
            backend_timeout: Duration::from_secs(5),
            persistence_threshold: 0.7,
            cache_expiry: Duration::from_secs(30 * 60),
            eviction_interval: Duration::from_secs(5 * 60),
            intent_max_tokens: 4000,
            synthesis_max_tokens: 8000,
            temperature: 0.1,
            time_recall_limit: 20,
            cjk_enrichment: true,
        }
    }
}

impl PipelineConfig {
    /// Apply per-call env overrides (LLM_MAX_TOKENS, LLM_TEMPERATURE)
    pub fn with_llm_settings(mut self, settings: &LlmSettings) -> Self {
        if let Some(max_tokens) = settings.max_tokens {
            self.intent_max_tokens = self.intent_max_tokens.min(max_tokens);
            self.synthesis_max_tokens = self.synthesis_max_tokens.min(max_tokens);
        }
        if let Some(temperature) = settings.temperature {
            self.temperature = temperature;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_budgets() {
        let config = PipelineConfig::default();
        assert_eq!(config.llm_timeout, Duration::from_secs(40));
        assert_eq!(config.backend_timeout, Duration::from_secs(5));
        assert_eq!(config.persistence_threshold, 0.7);
        assert_eq!(config.cache_expiry, Duration::from_secs(1800));
        assert_eq!(config.time_recall_limit, 20);
    }

    #[test]
    fn test_llm_settings_override() {
        let settings = LlmSettings {
            provider: None,
            model: None,
            max_tokens: Some(2000),
            temperature: Some(0.3),
        };
        let config = PipelineConfig::default().with_llm_settings(&settings);
        assert_eq!(config.intent_max_tokens, 2000);
        assert_eq!(config.synthesis_max_tokens, 2000);
        assert_eq!(config.temperature, 0.3);
    }
}
