//! Deterministic stub providers for tests. Compiled only under `cfg(test)`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{CancelToken, CompletionRequest, ProviderClient, ProviderError};

/// Replays a fixed script of results, one per call. When the script runs
/// dry, further calls return a server error.
pub(crate) struct ScriptedProvider {
    id: String,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(id: &str, script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "stub-model"
    }

    async fn complete(
        &self,
        _request: &CompletionRequest,
        _cancel: &CancelToken,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::ServerError("script exhausted".to_string())))
    }
}

/// Streams fixed chunks with a delay between each, honoring the cancel
/// token the way a real streaming client does.
pub(crate) struct SlowStreamingProvider {
    id: String,
    chunks: Vec<String>,
    delay: Duration,
}

impl SlowStreamingProvider {
    pub(crate) fn new(id: &str, chunks: Vec<&str>, delay: Duration) -> Self {
        Self {
            id: id.to_string(),
            chunks: chunks.into_iter().map(String::from).collect(),
            delay,
        }
    }
}

#[async_trait]
impl ProviderClient for SlowStreamingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "stub-model"
    }

    async fn complete(
        &self,
        _request: &CompletionRequest,
        cancel: &CancelToken,
    ) -> Result<String, ProviderError> {
        let mut text = String::new();
        for chunk in &self.chunks {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled { partial: text });
            }
            tokio::time::sleep(self.delay).await;
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled { partial: text });
            }
            text.push_str(chunk);
        }
        Ok(text)
    }
}
