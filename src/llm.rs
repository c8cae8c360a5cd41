use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One chat-completion request as the resolver sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system_instruction: String,
    pub user_message: String,
    pub want_structured_output: bool,
}

/// Anything that can turn an `LlmRequest` into raw response content.
///
/// Implementations classify failures into the `AssistantError` variants the
/// resolver acts on: `RateLimited`, `Unreachable`, `MissingCredential`,
/// `Malformed` / `EmptyResponse`, and `Llm` for everything else.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<String>;
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AssistantError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_instruction},
                {"role": "user", "content": request.user_message}
            ],
        });
        if request.want_structured_output {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let response_json: serde_json::Value = response.json().await.map_err(|e| {
            AssistantError::Malformed(format!("Failed to parse LLM response: {}", e))
        })?;

        extract_content(&response_json)
    }
}

/// Pull `choices[0].message.content` out of a completion body.
pub fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    let content = response_json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(AssistantError::EmptyResponse)?;

    if content.trim().is_empty() {
        return Err(AssistantError::EmptyResponse);
    }
    Ok(content.to_string())
}

pub fn classify_status(status: StatusCode, body: &str) -> AssistantError {
    let detail = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));
    match status {
        StatusCode::TOO_MANY_REQUESTS => AssistantError::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AssistantError::MissingCredential(detail)
        }
        s if s.is_server_error() => AssistantError::Unreachable(detail),
        _ => AssistantError::Llm(detail),
    }
}

/// A failed `send()` with no status never got an answer from the service:
/// refused, reset, closed mid-request or timed out. All of it is unreachable.
fn classify_transport_error(e: reqwest::Error) -> AssistantError {
    match e.status() {
        Some(status) => classify_status(status, &e.to_string()),
        None => AssistantError::Unreachable(format!("LLM API call failed: {}", e)),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
