//! Read-through configuration cache with a bounded TTL.
//!
//! Configuration is shared read-only state across concurrent requests.
//! The cache hands each request an immutable [`ConfigSnapshot`]; a
//! configuration change is picked up by `invalidate()` or TTL expiry,
//! never by mutation in place.

use docflow_gateway::{ModelId, TenantId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::chain::FallbackChain;
use super::doc_type::DocType;
use super::ids::DocTypeId;
use super::model::ModelSpec;
use super::store::{ConfigStore, StoreError};
use super::template::PromptTemplate;

/// Everything one extraction request needs from configuration, resolved
/// at request start and immutable thereafter.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// The active chain for (doc type, tenant).
    pub chain: FallbackChain,
    /// The doc type row, including its schema.
    pub doc_type: DocType,
    /// All template versions for the doc type.
    pub templates: Vec<PromptTemplate>,
    /// Model rows for every model referenced by the chain's steps.
    /// A step whose model is absent here is a configuration error.
    pub models: HashMap<ModelId, ModelSpec>,
}

struct CacheEntry {
    snapshot: Option<Arc<ConfigSnapshot>>,
    fetched_at: Instant,
}

/// TTL-bounded read-through cache over a [`ConfigStore`].
pub struct ConfigCache {
    store: Arc<dyn ConfigStore>,
    ttl: Duration,
    entries: RwLock<HashMap<(DocTypeId, TenantId), CacheEntry>>,
}

impl ConfigCache {
    /// Wraps a store with the given TTL.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The snapshot for (doc type, tenant): cached if fresh, otherwise
    /// loaded from the store. `None` means no active chain exists.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the underlying store on a miss.
    pub async fn snapshot(
        &self,
        doc_type: &DocTypeId,
        tenant: &TenantId,
    ) -> Result<Option<Arc<ConfigSnapshot>>, StoreError> {
        let key = (doc_type.clone(), tenant.clone());

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        let snapshot = self.load(doc_type, tenant).await?;
        let snapshot = snapshot.map(Arc::new);

        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                snapshot: snapshot.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(snapshot)
    }

    /// Drops every cached entry. Called on configuration change.
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
        tracing::debug!("configuration cache invalidated");
    }

    async fn load(
        &self,
        doc_type: &DocTypeId,
        tenant: &TenantId,
    ) -> Result<Option<ConfigSnapshot>, StoreError> {
        let Some(chain) = self.store.get_active_chain(doc_type, tenant).await? else {
            return Ok(None);
        };

        let Some(doc_type_row) = self.store.doc_type(doc_type).await? else {
            // A chain referencing an unknown doc type cannot be used;
            // surfaced by the orchestrator as a configuration error.
            return Ok(None);
        };

        let templates = self.store.templates_for(doc_type).await?;

        let mut models = HashMap::new();
        for step in &chain.steps {
            if models.contains_key(&step.model) {
                continue;
            }
            if let Some(spec) = self.store.model(&step.model).await? {
                models.insert(step.model.clone(), spec);
            }
        }

        tracing::debug!(
            doc_type = %doc_type,
            tenant = %tenant,
            chain = %chain.id,
            steps = chain.steps.len(),
            templates = templates.len(),
            "configuration snapshot loaded"
        );

        Ok(Some(ConfigSnapshot {
            chain,
            doc_type: doc_type_row,
            templates,
            models,
        }))
    }
}
