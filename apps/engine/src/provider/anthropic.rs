//! Anthropic Messages API backend.
//!
//! Requests are always streamed (SSE) so the cancel token can take effect
//! between chunks; batch callers simply never cancel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::{CancelToken, CompletionRequest, ProviderClient, ProviderError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct AnthropicClient {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            id: "anthropic".to_string(),
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
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
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            stream: true,
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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
                debug!("anthropic stream cancelled after {} chars", text.len());
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
                    SseEvent::Error(message) => {
                        return Err(ProviderError::InvalidResponse(message))
                    }
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
impl ProviderClient for AnthropicClient {
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
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<Delta>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(rename = "type")]
    delta_type: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Classification and SSE parsing
// ────────────────────────────────────────────────────────────────────────────

enum SseEvent {
    Delta(String),
    Error(String),
    Done,
    Ignore,
}

/// Parses one SSE line. Only `data:` payloads matter; `event:` lines and
/// blanks are framing. Malformed data lines are skipped rather than failing
/// the whole stream.
fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Ignore;
    };
    let Ok(event) = serde_json::from_str::<StreamEvent>(data.trim()) else {
        return SseEvent::Ignore;
    };
    match event.event_type.as_str() {
        "content_block_delta" => {
            let delta = event
                .delta
                .filter(|d| d.delta_type.as_deref() == Some("text_delta"))
                .and_then(|d| d.text);
            match delta {
                Some(text) => SseEvent::Delta(text),
                None => SseEvent::Ignore,
            }
        }
        "message_stop" => SseEvent::Done,
        "error" => SseEvent::Error(
            event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "provider reported an error".to_string()),
        ),
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
