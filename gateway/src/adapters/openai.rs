//! OpenAI-style chat-completions adapter.
//!
//! Also covers the many OpenAI-compatible backends (Azure deployments
//! fronted by a compatible proxy, vLLM, LM Studio, OpenRouter) via
//! [`OpenAiAdapter::with_base_url`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::truncate_body;
use crate::credentials::Credential;
use crate::error::AdapterError;
use crate::gateway::ProviderAdapter;
use crate::types::{AdapterResponse, CompletionRequest, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Adapter for the `POST /chat/completions` wire format.
pub struct OpenAiAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiAdapter {
    /// Adapter pointed at api.openai.com.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Adapter pointed at any OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            // No client-level timeout: the gateway enforces the deadline.
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    async fn call(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<AdapterResponse, AdapterError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: request.model.as_str(),
            messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Decode(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AdapterError::Decode("response carried no choices".into()))?;

        Ok(AdapterResponse {
            text,
            usage: parsed.usage.map(|u| TokenUsage {
                input: u.prompt_tokens,
                output: u.completion_tokens,
            }),
        })
    }
}
