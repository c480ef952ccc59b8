//! Provider layer: the single point of entry for all LLM calls in the engine.
//!
//! ARCHITECTURAL RULE: no other module may talk to a text-generation API
//! directly. All LLM interactions go through a `ProviderClient` behind a
//! `ProviderChain`, and every external failure is classified here. Callers
//! receive either a usable completion or one well-typed terminal failure,
//! never a raw transport error.

mod cancel;

pub mod anthropic;
pub mod chain;
pub mod openai;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancelToken;
pub use chain::{ChainError, ChainOutcome, ProviderChain, RetryPolicy};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Uniform request shape sent to every provider regardless of its wire API.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: system.into(),
            max_tokens: 4096,
            temperature: 0.2,
        }
    }
}

/// Classified failure of a single provider attempt.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited")]
    RateLimited,

    #[error("server error: {0}")]
    ServerError(String),

    #[error("attempt timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("authentication rejected")]
    AuthError,

    #[error("unusable response: {0}")]
    InvalidResponse(String),

    /// The caller's cancel token fired mid-stream. Carries exactly the text
    /// delivered before the signal.
    #[error("cancelled by caller")]
    Cancelled { partial: String },
}

impl ProviderError {
    /// Transient failures are retried on the same provider with backoff;
    /// permanent ones fail fast to the next provider in the chain.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError(_) | Self::Timeout { .. }
        )
    }

    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::RateLimited => AttemptOutcome::RateLimited,
            Self::ServerError(_) => AttemptOutcome::ServerError,
            Self::Timeout { .. } => AttemptOutcome::Timeout,
            Self::AuthError => AttemptOutcome::AuthError,
            Self::InvalidResponse(_) => AttemptOutcome::InvalidResponse,
            Self::Cancelled { .. } => AttemptOutcome::Cancelled,
        }
    }
}

/// Outcome of one provider attempt, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    ServerError,
    Timeout,
    AuthError,
    InvalidResponse,
    Cancelled,
}

/// One entry in the append-only audit trail of a chain invocation. Never
/// mutated after append; used for fallback decisions and observability.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAttempt {
    pub provider_id: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64,
}

/// A single remote text-generation backend.
///
/// Implementations must classify every failure into `ProviderError` and
/// must poll `cancel` between streamed chunks, returning
/// `ProviderError::Cancelled` with the partial text once it is set.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable identifier used in audit records and config ("anthropic", "openai", ...).
    fn id(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancelToken,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::ServerError("503".into()).is_transient());
        assert!(ProviderError::Timeout { secs: 30 }.is_transient());
        assert!(!ProviderError::AuthError.is_transient());
        assert!(!ProviderError::InvalidResponse("garbage".into()).is_transient());
        assert!(!ProviderError::Cancelled { partial: String::new() }.is_transient());
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(ProviderError::RateLimited.outcome(), AttemptOutcome::RateLimited);
        assert_eq!(ProviderError::AuthError.outcome(), AttemptOutcome::AuthError);
        assert_eq!(
            ProviderError::Cancelled { partial: "x".into() }.outcome(),
            AttemptOutcome::Cancelled
        );
    }
}
