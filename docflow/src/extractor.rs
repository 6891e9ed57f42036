//! The high-level extractor: one builder that wires stores, adapters,
//! audit, and the engine together.

use std::sync::Arc;

use docflow_engine::audit::{AuditRecord, AuditSink, MemoryAuditLog};
use docflow_engine::config::{ConfigStore, CorrelationId};
use docflow_engine::orchestrator::{EngineConfig, Orchestrator};
use docflow_engine::types::{ExtractionRequest, ExtractionResult};
use docflow_gateway::adapters::{AnthropicAdapter, OpenAiAdapter};
use docflow_gateway::{CredentialStore, Gateway, ProviderAdapter, ProviderId};

use crate::errors::Error;

/// Ready-to-use extraction facade over the engine.
pub struct Extractor {
    orchestrator: Orchestrator,
}

impl Extractor {
    /// Returns a new builder.
    #[must_use]
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::default()
    }

    /// Runs one extraction request to a terminal state.
    ///
    /// # Errors
    ///
    /// [`Error::Extraction`] with the engine's error taxonomy.
    pub async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionResult, Error> {
        Ok(self.orchestrator.extract(request).await?)
    }

    /// The audit trail of a correlation id, ordered by (step, attempt).
    ///
    /// # Errors
    ///
    /// [`Error::Audit`] when the sink cannot be queried.
    pub async fn audit_trail(
        &self,
        correlation_id: impl Into<CorrelationId>,
    ) -> Result<Vec<AuditRecord>, Error> {
        Ok(self
            .orchestrator
            .audit()
            .attempts_for(&correlation_id.into())
            .await?)
    }

    /// Drops cached configuration after an administration change.
    pub async fn invalidate_config(&self) {
        self.orchestrator.invalidate_config().await;
    }
}

/// Builder for [`Extractor`].
#[derive(Default)]
pub struct ExtractorBuilder {
    store: Option<Arc<dyn ConfigStore>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    audit: Option<Arc<dyn AuditSink>>,
    adapters: Vec<(ProviderId, Arc<dyn ProviderAdapter>)>,
    config: EngineConfig,
}

impl ExtractorBuilder {
    /// The configuration store (chains, templates, doc types, models).
    #[must_use]
    pub fn config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The per-tenant credential store.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The audit sink. Defaults to an in-memory log; production wires a
    /// durable backend here.
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Registers an adapter for a provider id.
    #[must_use]
    pub fn adapter(
        mut self,
        provider: impl Into<ProviderId>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Self {
        self.adapters.push((provider.into(), adapter));
        self
    }

    /// Registers the bundled HTTP adapters under the conventional
    /// provider ids `openai` and `anthropic`.
    #[must_use]
    pub fn with_default_adapters(self) -> Self {
        self.adapter("openai", Arc::new(OpenAiAdapter::new()))
            .adapter("anthropic", Arc::new(AnthropicAdapter::new()))
    }

    /// Engine tuning (concurrency, deadlines, retry policy, cache TTL).
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Wires everything into an [`Extractor`].
    ///
    /// # Errors
    ///
    /// [`Error::Builder`] when the configuration store, the credential
    /// store, or every adapter is missing.
    pub fn build(self) -> Result<Extractor, Error> {
        let store = self
            .store
            .ok_or_else(|| Error::Builder("a configuration store is required".into()))?;
        let credentials = self
            .credentials
            .ok_or_else(|| Error::Builder("a credential store is required".into()))?;
        if self.adapters.is_empty() {
            return Err(Error::Builder(
                "at least one provider adapter is required".into(),
            ));
        }

        let mut gateway = Gateway::new(credentials);
        for (provider, adapter) in self.adapters {
            gateway = gateway.with_adapter(provider, adapter);
        }

        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(MemoryAuditLog::new()));

        Ok(Extractor {
            orchestrator: Orchestrator::new(store, Arc::new(gateway), audit, self.config),
        })
    }
}
