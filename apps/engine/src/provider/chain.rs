//! Provider Chain: ordered fallback over interchangeable LLM backends.
//!
//! Providers are tried in priority order. Each gets up to `max_attempts`
//! tries with exponential backoff on transient failures (rate limit,
//! server error, timeout); permanent failures (auth, unusable response)
//! move to the next provider immediately. Failure state is per-call only:
//! a provider skipped in one run is tried fresh on the next, since provider
//! health changes between requests.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::{
    AttemptOutcome, CancelToken, CompletionRequest, ProviderAttempt, ProviderClient, ProviderError,
};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per provider before falling over. Default 2.
    pub max_attempts: u32,
    /// First backoff delay; doubles per retry. Default 500ms.
    pub backoff_base: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_base: std::time::Duration::from_millis(500),
        }
    }
}

/// Successful chain invocation: the completion plus which backend produced
/// it and the full attempt trail.
#[derive(Debug)]
pub struct ChainOutcome {
    pub text: String,
    pub provider_id: String,
    pub model: String,
    pub attempts: Vec<ProviderAttempt>,
}

#[derive(Debug, Error)]
pub enum ChainError {
    /// Terminal: every provider exhausted its attempts. Carries the full
    /// audit trail for diagnostics.
    #[error("all providers failed ({} attempts)", attempts.len())]
    AllProvidersFailed { attempts: Vec<ProviderAttempt> },

    /// The caller cancelled mid-run. Carries whatever partial text the
    /// in-flight provider had already delivered.
    #[error("cancelled by caller")]
    Cancelled {
        partial: String,
        attempts: Vec<ProviderAttempt>,
    },
}

pub struct ProviderChain {
    providers: Vec<Arc<dyn ProviderClient>>,
    retry: RetryPolicy,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn ProviderClient>>, retry: RetryPolicy) -> Self {
        Self { providers, retry }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Runs the request down the chain. Every outcome is either a usable
    /// completion or a typed `ChainError`; no transport error escapes raw.
    pub async fn run(
        &self,
        request: &CompletionRequest,
        cancel: &CancelToken,
    ) -> Result<ChainOutcome, ChainError> {
        let mut attempts: Vec<ProviderAttempt> = Vec::new();

        'providers: for provider in &self.providers {
            for attempt_no in 0..self.retry.max_attempts {
                if attempt_no > 0 {
                    let delay = self.retry.backoff_base * (1u32 << (attempt_no - 1));
                    debug!(
                        provider = provider.id(),
                        "retrying after {}ms backoff",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                if cancel.is_cancelled() {
                    return Err(ChainError::Cancelled {
                        partial: String::new(),
                        attempts,
                    });
                }

                let started_at = Utc::now();
                let timer = Instant::now();
                let result = provider.complete(request, cancel).await;
                let latency_ms = timer.elapsed().as_millis() as u64;

                match result {
                    Ok(text) => {
                        attempts.push(ProviderAttempt {
                            provider_id: provider.id().to_string(),
                            model: provider.model().to_string(),
                            started_at,
                            outcome: AttemptOutcome::Success,
                            latency_ms,
                        });
                        debug!(
                            provider = provider.id(),
                            latency_ms, "chain run succeeded"
                        );
                        return Ok(ChainOutcome {
                            text,
                            provider_id: provider.id().to_string(),
                            model: provider.model().to_string(),
                            attempts,
                        });
                    }
                    Err(err) => {
                        attempts.push(ProviderAttempt {
                            provider_id: provider.id().to_string(),
                            model: provider.model().to_string(),
                            started_at,
                            outcome: err.outcome(),
                            latency_ms,
                        });
                        match err {
                            ProviderError::Cancelled { partial } => {
                                return Err(ChainError::Cancelled { partial, attempts });
                            }
                            err if err.is_transient() => {
                                warn!(
                                    provider = provider.id(),
                                    attempt = attempt_no + 1,
                                    "transient provider failure: {err}"
                                );
                            }
                            err => {
                                warn!(
                                    provider = provider.id(),
                                    "permanent provider failure, falling over: {err}"
                                );
                                continue 'providers;
                            }
                        }
                    }
                }
            }
            warn!(
                provider = provider.id(),
                "provider exhausted {} attempts, falling over", self.retry.max_attempts
            );
        }

        Err(ChainError::AllProvidersFailed { attempts })
    }
}
