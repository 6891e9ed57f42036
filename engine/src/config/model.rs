//! Provider and model reference data. Immutable from the engine's side.

use docflow_gateway::{ModelId, ProviderId};
use std::time::Duration;

/// How a provider authenticates. Informational for the engine; the
/// adapters own the mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <secret>`.
    Bearer,
    /// Secret in a provider-specific header.
    ApiKeyHeader,
}

/// An LLM provider as reference data.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Stable provider identifier.
    pub id: ProviderId,
    /// Display name.
    pub name: String,
    /// Authentication scheme.
    pub auth: AuthScheme,
}

/// Rough cost class of a model, used by administrators when ordering
/// fallback steps (cheap first, premium last, or the reverse for
/// accuracy-critical doc types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CostTier {
    /// Small/cheap models.
    Economy,
    /// Mid-range.
    Standard,
    /// Frontier models.
    Premium,
}

/// A model belonging to a provider.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Stable model identifier, also the provider-facing name.
    pub id: ModelId,
    /// Owning provider.
    pub provider: ProviderId,
    /// Display name.
    pub name: String,
    /// Context window in tokens.
    pub context_window: u32,
    /// Rough cost class.
    pub cost_hint: CostTier,
    /// Timeout applied when a step does not override it.
    pub default_timeout: Duration,
}

impl ModelSpec {
    /// A model spec with sensible defaults for the given ids.
    pub fn new(id: impl Into<ModelId>, provider: impl Into<ProviderId>) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().to_owned(),
            id,
            provider: provider.into(),
            context_window: 128_000,
            cost_hint: CostTier::Standard,
            default_timeout: Duration::from_secs(30),
        }
    }

    /// Set the context window.
    #[must_use]
    pub const fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    /// Set the cost class.
    #[must_use]
    pub const fn with_cost_hint(mut self, tier: CostTier) -> Self {
        self.cost_hint = tier;
        self
    }

    /// Set the default per-attempt timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}
