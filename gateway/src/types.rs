//! Wire types shared by the gateway and its provider adapters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

id_type! {
    /// Identifier of an LLM provider (e.g. `openai`, `anthropic`).
    ProviderId
}

id_type! {
    /// Provider-facing model identifier (e.g. `gpt-4o-mini`).
    ModelId
}

id_type! {
    /// Tenant identifier; credentials are scoped per (provider, tenant).
    TenantId
}

/// Per-call tuning parameters supplied by the caller.
///
/// The timeout is enforced by the gateway itself, not delegated to the
/// provider SDK or HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// Hard deadline for the single call.
    pub timeout: Duration,
    /// Sampling temperature. Extraction wants determinism, so this
    /// defaults to 0.0.
    pub temperature: f32,
    /// Maximum tokens the provider may generate.
    pub max_tokens: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            temperature: 0.0,
            max_tokens: 2048,
        }
    }
}

impl CallOptions {
    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the generation token cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A fully assembled request handed to a provider adapter.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider-facing model name.
    pub model: ModelId,
    /// The rendered prompt.
    pub prompt: String,
    /// Optional system preamble; adapters that have no system slot
    /// prepend it to the prompt.
    pub system: Option<String>,
    /// Tuning parameters.
    pub options: CallOptions,
}

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub input: u32,
    /// Tokens generated by the model.
    pub output: u32,
}

impl TokenUsage {
    /// Total tokens for the call.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.input + self.output
    }
}

/// What an adapter returns on success. The gateway wraps this into a
/// [`CallOutcome`] with measured latency.
#[derive(Debug, Clone)]
pub struct AdapterResponse {
    /// Raw text of the model's reply.
    pub text: String,
    /// Provider-reported usage, if the API exposes it.
    pub usage: Option<TokenUsage>,
}

/// Result of one successful gateway call.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    /// Raw text of the model's reply.
    pub raw_text: String,
    /// Token usage; zeroed when the provider reports none.
    pub tokens_used: TokenUsage,
    /// Wall-clock latency measured by the gateway.
    pub latency: Duration,
}
