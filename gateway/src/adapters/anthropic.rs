//! Anthropic messages-API adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::truncate_body;
use crate::credentials::Credential;
use crate::error::{classify_http, AdapterError};
use crate::gateway::ProviderAdapter;
use crate::types::{AdapterResponse, CompletionRequest, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Adapter for `POST /messages`.
pub struct AnthropicAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AnthropicAdapter {
    /// Adapter pointed at api.anthropic.com.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Adapter pointed at a compatible proxy.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn call(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<AdapterResponse, AdapterError> {
        let url = format!("{}/messages", self.base_url);

        let body = MessagesRequest {
            model: request.model.as_str(),
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            system: request.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", API_VERSION)
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

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Decode(e.to_string()))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(AdapterError::Decode("response carried no text blocks".into()));
        }

        Ok(AdapterResponse {
            text,
            usage: parsed.usage.map(|u| TokenUsage {
                input: u.input_tokens,
                output: u.output_tokens,
            }),
        })
    }

    fn classify(&self, error: &AdapterError) -> crate::error::ProviderErrorKind {
        // 529 is Anthropic's "overloaded" signal; treat it like throttling.
        if let AdapterError::Status { status: 529, .. } = error {
            return crate::error::ProviderErrorKind::RateLimit;
        }
        classify_http(error)
    }
}
