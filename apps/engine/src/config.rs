use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::provider::anthropic::AnthropicClient;
use crate::provider::openai::OpenAiClient;
use crate::provider::{ProviderChain, ProviderClient, RetryPolicy};

/// Engine configuration. Always passed explicitly into constructors, never
/// read from ambient state, so test suites can substitute stub providers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fallback order: fastest/cheapest first.
    pub providers: Vec<ProviderSettings>,
    /// Attempts per provider before falling over. Default 2.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds; doubles per retry. Default 500.
    pub backoff_base_ms: u64,
    /// Per-attempt timeout. Default 30s.
    pub attempt_timeout_secs: u64,
    /// Conversation turns retained per session. Default 5.
    pub history_budget: usize,
    /// Default learning-plan duration. Default 4 weeks.
    pub default_plan_weeks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    /// Falls back to the backend's default model when unset.
    pub model: Option<String>,
    /// OpenAI-compatible endpoints only.
    pub base_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            max_attempts: 2,
            backoff_base_ms: 500,
            attempt_timeout_secs: 30,
            history_budget: 5,
            default_plan_weeks: 4,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables (`.env` honored if
    /// present). `PROVIDER_PRIORITY` orders the chain ("anthropic,openai");
    /// providers whose API key is not set are skipped rather than failing,
    /// so a single-provider deployment needs a single key.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let priority = std::env::var("PROVIDER_PRIORITY")
            .unwrap_or_else(|_| "anthropic,openai".to_string());

        let mut providers = Vec::new();
        for name in priority.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match name {
                "anthropic" => {
                    if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
                        providers.push(ProviderSettings {
                            kind: ProviderKind::Anthropic,
                            api_key,
                            model: std::env::var("ANTHROPIC_MODEL").ok(),
                            base_url: None,
                        });
                    }
                }
                "openai" => {
                    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
                        providers.push(ProviderSettings {
                            kind: ProviderKind::OpenAi,
                            api_key,
                            model: std::env::var("OPENAI_MODEL").ok(),
                            base_url: std::env::var("OPENAI_BASE_URL").ok(),
                        });
                    }
                }
                other => anyhow::bail!("unknown provider '{other}' in PROVIDER_PRIORITY"),
            }
        }

        Ok(Self {
            providers,
            max_attempts: env_parse("PROVIDER_MAX_ATTEMPTS", 2)?,
            backoff_base_ms: env_parse("PROVIDER_BACKOFF_BASE_MS", 500)?,
            attempt_timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS", 30)?,
            history_budget: env_parse("CONVERSATION_HISTORY_BUDGET", 5)?,
            default_plan_weeks: env_parse("DEFAULT_PLAN_WEEKS", 4)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    /// Builds the provider chain in configured priority order.
    pub fn build_chain(&self) -> ProviderChain {
        let timeout = Duration::from_secs(self.attempt_timeout_secs);
        let providers: Vec<Arc<dyn ProviderClient>> = self
            .providers
            .iter()
            .map(|settings| match settings.kind {
                ProviderKind::Anthropic => Arc::new(
                    AnthropicClient::new(settings.api_key.clone(), settings.model.clone())
                        .with_timeout(timeout),
                ) as Arc<dyn ProviderClient>,
                ProviderKind::OpenAi => Arc::new(
                    OpenAiClient::new(
                        settings.api_key.clone(),
                        settings.model.clone(),
                        settings.base_url.clone(),
                    )
                    .with_timeout(timeout),
                ),
            })
            .collect();
        ProviderChain::new(providers, self.retry_policy())
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("environment variable '{key}' is invalid: {e}")),
        Err(_) => Ok(default),
    }
}
