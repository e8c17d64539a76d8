//! OpenRouter API client implementation.
//!
//! Any OpenAI-compatible `/chat/completions` endpoint works; the URL is
//! configurable. Requests are sent once; there is no retry.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{classify_http_status, LlmError, LlmErrorKind};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter API client.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenRouterClient {
    /// Create a new client for the public OpenRouter endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_api_url(api_key, OPENROUTER_API_URL.to_string())
    }

    /// Create a new client for a custom OpenAI-compatible endpoint.
    pub fn with_api_url(api_key: String, api_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url,
        }
    }

    /// Create an LlmError from HTTP response status and body.
    fn create_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let status_code = status.as_u16();

        match classify_http_status(status_code) {
            LlmErrorKind::RateLimited => LlmError::rate_limited(body.to_string()),
            LlmErrorKind::ClientError => LlmError::client_error(status_code, body.to_string()),
            _ => LlmError::server_error(status_code, body.to_string()),
        }
    }

    /// Execute a single request.
    async fn execute_request(&self, request: &OpenRouterRequest) -> Result<ChatResponse, LlmError> {
        let response = match self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "tasklane")
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(LlmError::network_error(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(LlmError::network_error(format!("Connection failed: {}", e)));
                } else {
                    return Err(LlmError::network_error(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Self::create_error(status, &body));
        }

        parse_response(&body)
    }
}

/// Decode a successful response body into a `ChatResponse`.
fn parse_response(body: &str) -> Result<ChatResponse, LlmError> {
    let parsed: OpenRouterResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

    Ok(ChatResponse {
        content: choice.message.content,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
    })
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatResponse, LlmError> {
        self.chat_completion_with_options(model, messages, ChatOptions::default())
            .await
    }

    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let request = OpenRouterRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            max_tokens: options.max_tokens,
        };

        tracing::debug!("Sending request to {}: model={}", self.api_url, model);

        let result = self.execute_request(&request).await;
        if let Err(ref error) = result {
            tracing::error!("Completion request failed: {}", error);
        }
        result
    }
}

/// OpenRouter API request format.
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

/// OpenRouter API response format.
#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    usage: Option<OpenRouterUsage>,
}

/// A choice in the OpenRouter response.
#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
}

/// Message in OpenRouter response.
#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
}

/// Usage data (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
