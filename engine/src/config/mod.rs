//! Read-only configuration model.
//!
//! Chains, steps, doc types, and templates are created and versioned by
//! the external administration layer; the engine only reads them, through
//! [`ConfigCache`] with a bounded TTL. Nothing in the extraction path
//! mutates configuration.

mod cache;
mod chain;
mod doc_type;
mod ids;
mod model;
mod store;
mod template;

pub use cache::{ConfigCache, ConfigSnapshot};
pub use chain::{ChainConfigError, FallbackChain, FallbackStep};
pub use doc_type::DocType;
pub use ids::{ChainId, CorrelationId, DocTypeId, TemplateId};
pub use model::{AuthScheme, CostTier, ModelSpec, Provider};
pub use store::{ConfigStore, MemoryConfigStore, StoreError};
pub use template::{PromptTemplate, TemplateScope};
