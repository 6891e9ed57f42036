//! # docflow-gateway
//!
//! Uniform call interface over heterogeneous LLM providers.
//!
//! Every provider-specific failure is normalized into a
//! [`ProviderErrorKind`] so the fallback layer above can make retry
//! decisions without knowing which backend it is talking to. The gateway
//! enforces the caller-supplied timeout itself; a provider that ignores
//! cancellation is still reported as timed out at the deadline.
//!
//! Retry logic deliberately does **not** live here: a gateway call is a
//! single deterministic unit. Retries, backoff, and fallback chains are
//! the responsibility of the extraction engine.
//!
//! ## Example
//!
//! ```no_run
//! # use docflow_gateway::{Gateway, CallOptions, StaticCredentials, Credential};
//! # use docflow_gateway::adapters::OpenAiAdapter;
//! # use docflow_gateway::{ProviderId, ModelId, TenantId};
//! # use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let openai = ProviderId::new("openai");
//! let credentials = StaticCredentials::new()
//!     .with_credential(openai.clone(), TenantId::new("acme"), Credential::new("sk-..."));
//!
//! let gateway = Gateway::new(Arc::new(credentials))
//!     .with_adapter(openai.clone(), Arc::new(OpenAiAdapter::new()));
//!
//! let outcome = gateway
//!     .call(
//!         &openai,
//!         &ModelId::new("gpt-4o-mini"),
//!         "Extract the patient name.",
//!         &CallOptions::default(),
//!         &TenantId::new("acme"),
//!     )
//!     .await?;
//! println!("{}", outcome.raw_text);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Concrete provider adapters (OpenAI-style, Anthropic).
pub mod adapters;

/// Credential resolution seam.
pub mod credentials;

/// Normalized error taxonomy.
pub mod error;

/// The gateway itself and the `ProviderAdapter` trait.
pub mod gateway;

/// Wire types and call options.
pub mod types;

pub use credentials::{Credential, CredentialError, CredentialStore, StaticCredentials};
pub use error::{AdapterError, ProviderError, ProviderErrorKind};
pub use gateway::{Gateway, ProviderAdapter};
pub use types::{
    AdapterResponse, CallOptions, CallOutcome, CompletionRequest, ModelId, ProviderId, TenantId,
    TokenUsage,
};
