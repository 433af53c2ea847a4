//! OpenAI-compatible chat-completions client
//!
//! Speaks the chat-completions protocol used by Groq and friends. One client
//! is constructed per endpoint slot, bound to that slot's model name and
//! credential. A call is a single request: failover across endpoints is the
//! dispatcher's job, so this client never retries on its own.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ChatClient, LlmError};
use crate::config::Config;

/// OpenAI-compatible API client for one endpoint
pub struct OpenAiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    json_response: bool,
}

impl OpenAiClient {
    /// Create a client bound to one model and credential
    ///
    /// Protocol options (base URL, token budget, response format) come from
    /// the shared configuration; the model and key are per endpoint.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, config: &Config) -> Result<Self, LlmError> {
        let model = model.into();
        debug!(%model, "OpenAiClient::new: called");

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model,
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
            json_response: config.json_response,
        })
    }

    /// Build the request body for the chat-completions endpoint
    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt,
            }],
            "max_completion_tokens": self.max_tokens,
        });

        if self.json_response {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        body
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(prompt);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Network)?;

        let status = response.status().as_u16();

        if status == 429 {
            debug!(model = %self.model, "complete: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            debug!(model = %self.model, status, "complete: API error");
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let api_response: ChatResponse = response.json().await?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))
    }
}

// Chat-completions response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(json_response: bool) -> OpenAiClient {
        OpenAiClient {
            model: "llama3-70b-8192".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.groq.com/openai".to_string(),
            http: Client::new(),
            max_tokens: 120,
            json_response,
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let client = test_client(true);
        let body = client.build_request_body("tag this");

        assert_eq!(body["model"], "llama3-70b-8192");
        assert_eq!(body["max_completion_tokens"], 120);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "tag this");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_build_request_body_without_json_mode() {
        let client = test_client(false);
        let body = client.build_request_body("tag this");

        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_parse_chat_response() {
        let raw = r#"{"choices":[{"message":{"content":"{\"tags\":[\"space opera\"]}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();

        let content = parsed.choices.into_iter().next().unwrap().message.content;
        assert_eq!(content.as_deref(), Some("{\"tags\":[\"space opera\"]}"));
    }
}
