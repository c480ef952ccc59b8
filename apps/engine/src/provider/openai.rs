//! OpenAI-compatible chat-completions backend.
//!
//! The base URL is configurable so any endpoint speaking this wire format
//! (OpenAI, Azure-hosted deployments, local gateways) plugs into the chain
//! without code changes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::{CancelToken, CompletionRequest, ProviderClient, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct OpenAiClient {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            id: "openai".to_string(),
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        cancel: &CancelToken,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let mut response = response;
        let mut text = String::new();
        let mut line_buf: Vec<u8> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                debug!("openai stream cancelled after {} chars", text.len());
                return Err(ProviderError::Cancelled { partial: text });
            }
            let chunk = match response.chunk().await.map_err(classify_transport)? {
                Some(chunk) => chunk,
                None => break,
            };
            line_buf.extend_from_slice(&chunk);
            while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = line_buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse_sse_line(line.trim_end()) {
                    SseEvent::Delta(delta) => text.push_str(&delta),
                    SseEvent::Done => return finish(text),
                    SseEvent::Ignore => {}
                }
            }
        }

        finish(text)
    }
}

fn finish(text: String) -> Result<String, ProviderError> {
    if text.is_empty() {
        Err(ProviderError::InvalidResponse("empty content".to_string()))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancelToken,
    ) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.timeout, self.stream_completion(request, cancel)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Classification and SSE parsing
// ────────────────────────────────────────────────────────────────────────────

enum SseEvent {
    Delta(String),
    Done,
    Ignore,
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Ignore;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) else {
        return SseEvent::Ignore;
    };
    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(content) if !content.is_empty() => SseEvent::Delta(content),
        _ => SseEvent::Ignore,
    }
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthError,
        429 => ProviderError::RateLimited,
        s if status.is_server_error() => ProviderError::ServerError(format!("status {s}: {body}")),
        s => ProviderError::InvalidResponse(format!("status {s}: {body}")),
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { secs: 0 }
    } else {
        ProviderError::ServerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta_line() {
        let line = r#"data: {"id":"x","choices":[{"index":0,"delta":{"content":"Hello"}}]}"#;
        match parse_sse_line(line) {
            SseEvent::Delta(text) => assert_eq!(text, "Hello"),
            _ => panic!("expected delta"),
        }
    }

    #[test]
    fn test_parse_done_sentinel() {
        assert!(matches!(parse_sse_line("data: [DONE]"), SseEvent::Done));
    }

    #[test]
    fn test_role_only_delta_ignored() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert!(matches!(parse_sse_line(line), SseEvent::Ignore));
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let client = OpenAiClient::new(
            "key".to_string(),
            None,
            Some("https://gateway.local/v1/".to_string()),
        );
        assert_eq!(
            format!("{}/chat/completions", client.base_url.trim_end_matches('/')),
            "https://gateway.local/v1/chat/completions"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            ProviderError::AuthError
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            ProviderError::ServerError(_)
        ));
    }
}
