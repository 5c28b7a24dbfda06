// crates/recall-server/src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use tracing::{debug, warn};

/// API keys loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// DeepSeek API key (DEEPSEEK_API_KEY)
    pub deepseek: Option<String>,
    /// OpenAI API key (OPENAI_API_KEY)
    pub openai: Option<String>,
    /// Claude API key (CLAUDE_API_KEY)
    pub claude: Option<String>,
    /// Qianwen API key (QIANWEN_API_KEY)
    pub qianwen: Option<String>,
}

impl ApiKeys {
    /// Load API keys from environment variables
    pub fn from_env() -> Self {
        let keys = Self {
            deepseek: read_env("DEEPSEEK_API_KEY"),
            openai: read_env("OPENAI_API_KEY"),
            claude: read_env("CLAUDE_API_KEY"),
            qianwen: read_env("QIANWEN_API_KEY"),
        };
        keys.log_status();
        keys
    }

    /// Check if any keyed provider is configured. The local Ollama provider
    /// needs no key, so this is advisory only.
    pub fn has_any(&self) -> bool {
        self.deepseek.is_some()
            || self.openai.is_some()
            || self.claude.is_some()
            || self.qianwen.is_some()
    }

    /// Log which API keys are available (without exposing values)
    fn log_status(&self) {
        let mut available = Vec::new();
        if self.deepseek.is_some() {
            available.push("DeepSeek");
        }
        if self.openai.is_some() {
            available.push("OpenAI");
        }
        if self.claude.is_some() {
            available.push("Claude");
        }
        if self.qianwen.is_some() {
            available.push("Qianwen");
        }

        if available.is_empty() {
            warn!("No LLM API keys configured - only ollama_local will be usable");
        } else {
            debug!(keys = ?available, "API keys loaded");
        }
    }
}

/// Feature flags for the LLM-driven pipeline (LLM_DRIVEN_*)
#[derive(Debug, Clone)]
pub struct DrivenFlags {
    /// Master switch; off means the basic context service answers everything
    pub enabled: bool,
    pub semantic_analysis: bool,
    pub multi_dimensional: bool,
    pub content_synthesis: bool,
    pub short_term_memory: bool,
    /// Fall back to the basic context service instead of surfacing errors
    pub auto_fallback: bool,
    pub fallback_threshold: u32,
}

impl Default for DrivenFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            semantic_analysis: true,
            multi_dimensional: true,
            content_synthesis: true,
            short_term_memory: false,
            auto_fallback: true,
            fallback_threshold: 3,
        }
    }
}

impl DrivenFlags {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: parse_bool_env("LLM_DRIVEN_ENABLED").unwrap_or(defaults.enabled),
            semantic_analysis: parse_bool_env("LLM_DRIVEN_SEMANTIC_ANALYSIS")
                .unwrap_or(defaults.semantic_analysis),
            multi_dimensional: parse_bool_env("LLM_DRIVEN_MULTI_DIMENSIONAL")
                .unwrap_or(defaults.multi_dimensional),
            content_synthesis: parse_bool_env("LLM_DRIVEN_CONTENT_SYNTHESIS")
                .unwrap_or(defaults.content_synthesis),
            short_term_memory: parse_bool_env("LLM_DRIVEN_SHORT_TERM_MEMORY")
                .unwrap_or(defaults.short_term_memory),
            auto_fallback: parse_bool_env("LLM_DRIVEN_AUTO_FALLBACK")
                .unwrap_or(defaults.auto_fallback),
            fallback_threshold: std::env::var("LLM_DRIVEN_FALLBACK_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fallback_threshold),
        }
    }
}

/// Provider and sampling overrides (LLM_PROVIDER, LLM_MODEL, ...)
#[derive(Debug, Clone, Default)]
pub struct LlmSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self {
            provider: read_env("LLM_PROVIDER"),
            model: read_env("LLM_MODEL"),
            max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()),
            temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()),
        }
    }
}

/// User/session repository backend selector (USER_REPOSITORY_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepositoryKind {
    Aliyun,
    Vearch,
    #[default]
    Memory,
    Mysql,
    Tencent,
}

impl RepositoryKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aliyun" => Some(Self::Aliyun),
            "vearch" => Some(Self::Vearch),
            "memory" => Some(Self::Memory),
            "mysql" => Some(Self::Mysql),
            "tencent" => Some(Self::Tencent),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        match read_env("USER_REPOSITORY_TYPE") {
            Some(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown USER_REPOSITORY_TYPE, using memory");
                Self::Memory
            }),
            None => Self::Memory,
        }
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }
        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for w in &self.warnings {
                lines.push(format!("  - {}", w));
            }
        }
        if lines.is_empty() {
            "Configuration OK".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Environment configuration - all recognized env vars in one place
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_keys: ApiKeys,
    pub driven: DrivenFlags,
    pub llm: LlmSettings,
    pub repository: RepositoryKind,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        Self {
            api_keys: ApiKeys::from_env(),
            driven: DrivenFlags::from_env(),
            llm: LlmSettings::from_env(),
            repository: RepositoryKind::from_env(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();

        if self.driven.enabled && !self.api_keys.has_any() {
            validation.add_warning(
                "LLM-driven retrieval enabled but no API keys configured; \
                 only ollama_local will serve model calls",
            );
        }

        if let Some(ref provider) = self.llm.provider {
            let known = ["deepseek", "openai", "claude", "qianwen", "ollama_local"];
            if !known.contains(&provider.to_lowercase().as_str()) {
                validation.add_error(format!(
                    "Unknown LLM_PROVIDER '{}'. Valid options: {}",
                    provider,
                    known.join(", ")
                ));
            }
        }

        if let Some(t) = self.llm.temperature
            && !(0.0..=2.0).contains(&t)
        {
            validation.add_warning(format!("LLM_TEMPERATURE {} outside [0,2]", t));
        }

        validation
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool_env(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?.to_lowercase();
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
