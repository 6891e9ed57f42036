//! Normalized error taxonomy for provider calls.
//!
//! Two layers, reflecting two failure surfaces:
//!
//! * [`AdapterError`]: what actually went wrong at the transport level
//!   (HTTP status, decode failure, timeout). Internal to adapters.
//! * [`ProviderError`]: the normalized form every caller sees, tagged
//!   with a [`ProviderErrorKind`] so retry decisions are uniform across
//!   providers.

use std::time::Duration;
use thiserror::Error;

use crate::types::{ModelId, ProviderId};

/// Normalized classification of a provider failure.
///
/// The retry semantics follow the conservative reading: only rate limits
/// and timeouts are worth retrying against the same model; everything
/// else advances the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// HTTP 429 or an equivalent throttling signal. Retryable.
    RateLimit,
    /// Authentication or authorization failure. Not retryable.
    Auth,
    /// The call did not complete within the enforced deadline. Retryable.
    Timeout,
    /// The provider answered, but the response could not be decoded.
    /// Not retryable; the same request would produce the same garbage.
    InvalidResponse,
    /// Anything else. Not retryable by default.
    Unknown,
}

impl ProviderErrorKind {
    /// Whether the same call may succeed if repeated against the same model.
    #[must_use]
    pub const fn retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Timeout)
    }

    /// Stable machine-readable code, used in audit rows.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::Auth => "AUTH",
            Self::Timeout => "TIMEOUT",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// A provider call failure, normalized for the engine.
#[derive(Debug, Clone, Error)]
#[error("provider '{provider}' model '{model}' failed ({}): {message}", .kind.code())]
pub struct ProviderError {
    /// Normalized failure class.
    pub kind: ProviderErrorKind,
    /// Provider the call was routed to.
    pub provider: ProviderId,
    /// Model the call was addressed to.
    pub model: ModelId,
    /// Human-readable detail from the transport layer.
    pub message: String,
}

impl ProviderError {
    /// Builds a normalized error.
    pub fn new(
        kind: ProviderErrorKind,
        provider: &ProviderId,
        model: &ModelId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            provider: provider.clone(),
            model: model.clone(),
            message: message.into(),
        }
    }

    /// Whether the fallback layer may retry the same step.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

/// Transport-level failure inside an adapter, before normalization.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The HTTP request itself failed (connect, TLS, body transfer).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated by the adapter.
        body: String,
    },

    /// The call exceeded the enforced deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider's 2xx response body could not be decoded.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

/// Default status-code classification shared by HTTP adapters.
///
/// Adapters override `classify` only where a provider deviates from
/// plain HTTP semantics (e.g. Anthropic's 529 overload signal).
#[must_use]
pub fn classify_http(error: &AdapterError) -> ProviderErrorKind {
    match error {
        AdapterError::Timeout(_) => ProviderErrorKind::Timeout,
        AdapterError::Decode(_) => ProviderErrorKind::InvalidResponse,
        AdapterError::Status { status, .. } => match status {
            429 => ProviderErrorKind::RateLimit,
            401 | 403 => ProviderErrorKind::Auth,
            _ => ProviderErrorKind::Unknown,
        },
        AdapterError::Request(e) => {
            if e.is_timeout() {
                ProviderErrorKind::Timeout
            } else if e.is_decode() {
                ProviderErrorKind::InvalidResponse
            } else {
                ProviderErrorKind::Unknown
            }
        }
    }
}
