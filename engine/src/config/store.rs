//! The external configuration collaborator and an in-memory implementation.

use async_trait::async_trait;
use docflow_gateway::{ModelId, TenantId};
use std::collections::HashMap;
use thiserror::Error;

use super::chain::FallbackChain;
use super::doc_type::DocType;
use super::ids::DocTypeId;
use super::model::ModelSpec;
use super::template::PromptTemplate;

/// Failure to reach the configuration store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be queried.
    #[error("configuration store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only queries against the administration layer's configuration.
///
/// The engine never writes configuration; the store's contract guarantees
/// at most one active chain per (doc type, tenant).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The active fallback chain for a (doc type, tenant), if any.
    async fn get_active_chain(
        &self,
        doc_type: &DocTypeId,
        tenant: &TenantId,
    ) -> Result<Option<FallbackChain>, StoreError>;

    /// All template versions for a doc type (the registry filters
    /// active/highest-version).
    async fn templates_for(&self, doc_type: &DocTypeId) -> Result<Vec<PromptTemplate>, StoreError>;

    /// The doc type row for a slug.
    async fn doc_type(&self, slug: &DocTypeId) -> Result<Option<DocType>, StoreError>;

    /// The model row for an id.
    async fn model(&self, id: &ModelId) -> Result<Option<ModelSpec>, StoreError>;
}

/// In-memory configuration store for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    chains: Vec<FallbackChain>,
    templates: Vec<PromptTemplate>,
    doc_types: HashMap<DocTypeId, DocType>,
    models: HashMap<ModelId, ModelSpec>,
}

impl MemoryConfigStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chain (builder form).
    #[must_use]
    pub fn with_chain(mut self, chain: FallbackChain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Adds a template (builder form).
    #[must_use]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Adds a doc type (builder form).
    #[must_use]
    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.doc_types.insert(doc_type.slug.clone(), doc_type);
        self
    }

    /// Adds a model (builder form).
    #[must_use]
    pub fn with_model(mut self, model: ModelSpec) -> Self {
        self.models.insert(model.id.clone(), model);
        self
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_active_chain(
        &self,
        doc_type: &DocTypeId,
        tenant: &TenantId,
    ) -> Result<Option<FallbackChain>, StoreError> {
        Ok(self
            .chains
            .iter()
            .find(|c| c.active && &c.doc_type == doc_type && &c.tenant == tenant)
            .cloned())
    }

    async fn templates_for(&self, doc_type: &DocTypeId) -> Result<Vec<PromptTemplate>, StoreError> {
        Ok(self
            .templates
            .iter()
            .filter(|t| &t.doc_type == doc_type)
            .cloned()
            .collect())
    }

    async fn doc_type(&self, slug: &DocTypeId) -> Result<Option<DocType>, StoreError> {
        Ok(self.doc_types.get(slug).cloned())
    }

    async fn model(&self, id: &ModelId) -> Result<Option<ModelSpec>, StoreError> {
        Ok(self.models.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::chain::FallbackStep;

    #[tokio::test]
    async fn memory_store_finds_only_active_chains() {
        let active = FallbackChain::new(
            "c1",
            "LAB_REPORT",
            "acme",
            vec![FallbackStep::new(1, "model-a")],
        );
        let mut inactive = FallbackChain::new(
            "c2",
            "LAB_REPORT",
            "globex",
            vec![FallbackStep::new(1, "model-a")],
        );
        inactive.active = false;

        let store = MemoryConfigStore::new().with_chain(active).with_chain(inactive);

        let found = store
            .get_active_chain(&DocTypeId::new("LAB_REPORT"), &TenantId::new("acme"))
            .await
            .unwrap();
        assert!(found.is_some());

        let none = store
            .get_active_chain(&DocTypeId::new("LAB_REPORT"), &TenantId::new("globex"))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
