//! The gateway: one deterministic call unit over registered adapters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

use crate::credentials::{Credential, CredentialStore};
use crate::error::{classify_http, AdapterError, ProviderError, ProviderErrorKind};
use crate::types::{
    AdapterResponse, CallOptions, CallOutcome, CompletionRequest, ModelId, ProviderId, TenantId,
};

/// Capability interface implemented once per provider.
///
/// `call` performs exactly one request; `classify` maps the adapter's
/// transport errors onto the normalized taxonomy. Everything above this
/// trait is provider-agnostic.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Performs a single completion request.
    async fn call(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<AdapterResponse, AdapterError>;

    /// Maps a transport error onto the normalized taxonomy.
    fn classify(&self, error: &AdapterError) -> ProviderErrorKind {
        classify_http(error)
    }
}

/// Routes calls to the adapter registered for a provider, resolving the
/// tenant credential at call time and enforcing the caller's timeout.
pub struct Gateway {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    credentials: Arc<dyn CredentialStore>,
}

impl Gateway {
    /// Creates a gateway with no adapters registered.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            adapters: HashMap::new(),
            credentials,
        }
    }

    /// Registers an adapter for a provider (builder form).
    #[must_use]
    pub fn with_adapter(mut self, provider: ProviderId, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(provider, adapter);
        self
    }

    /// Whether an adapter is registered for the provider.
    #[must_use]
    pub fn has_adapter(&self, provider: &ProviderId) -> bool {
        self.adapters.contains_key(provider)
    }

    /// The credential store the gateway consults at call time.
    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Performs one call against the given provider/model.
    ///
    /// The timeout in `options` is enforced here with `tokio::time::timeout`;
    /// if the adapter's future has not resolved by the deadline it is
    /// dropped and the call reported as [`ProviderErrorKind::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] tagged with the normalized failure kind.
    pub async fn call(
        &self,
        provider: &ProviderId,
        model: &ModelId,
        prompt: &str,
        options: &CallOptions,
        tenant: &TenantId,
    ) -> Result<CallOutcome, ProviderError> {
        let adapter = self.adapters.get(provider).ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::Unknown,
                provider,
                model,
                "no adapter registered for provider",
            )
        })?;

        let credential = self
            .credentials
            .get(provider, tenant)
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Auth, provider, model, e.to_string()))?;

        let request = CompletionRequest {
            model: model.clone(),
            prompt: prompt.to_owned(),
            system: None,
            options: options.clone(),
        };

        tracing::debug!(
            provider = %provider,
            model = %model,
            timeout_ms = options.timeout.as_millis() as u64,
            "dispatching provider call"
        );

        let started = Instant::now();
        match timeout(options.timeout, adapter.call(&request, &credential)).await {
            Ok(Ok(response)) => {
                let latency = started.elapsed();
                tracing::debug!(
                    provider = %provider,
                    model = %model,
                    latency_ms = latency.as_millis() as u64,
                    "provider call succeeded"
                );
                Ok(CallOutcome {
                    raw_text: response.text,
                    tokens_used: response.usage.unwrap_or_default(),
                    latency,
                })
            }
            Ok(Err(adapter_error)) => {
                let kind = adapter.classify(&adapter_error);
                tracing::warn!(
                    provider = %provider,
                    model = %model,
                    kind = kind.code(),
                    error = %adapter_error,
                    "provider call failed"
                );
                Err(ProviderError::new(
                    kind,
                    provider,
                    model,
                    adapter_error.to_string(),
                ))
            }
            Err(_elapsed) => {
                tracing::warn!(
                    provider = %provider,
                    model = %model,
                    timeout_ms = options.timeout.as_millis() as u64,
                    "provider call cancelled at gateway deadline"
                );
                Err(ProviderError::new(
                    ProviderErrorKind::Timeout,
                    provider,
                    model,
                    format!("gateway deadline of {:?} elapsed", options.timeout),
                ))
            }
        }
    }
}
