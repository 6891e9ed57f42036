//! Commonly used types for wiring and driving an extractor.

pub use crate::errors::Error;
pub use crate::extractor::{Extractor, ExtractorBuilder};

pub use docflow_engine::audit::{AuditRecord, AuditSink, MemoryAuditLog};
pub use docflow_engine::config::{
    ConfigStore, DocType, DocTypeId, FallbackChain, FallbackStep, MemoryConfigStore, ModelSpec,
    PromptTemplate,
};
pub use docflow_engine::error::ExtractionError;
pub use docflow_engine::orchestrator::EngineConfig;
pub use docflow_engine::types::{ExtractionRequest, ExtractionResult, ExtractionStatus};
pub use docflow_gateway::{
    Credential, CredentialStore, Gateway, ModelId, ProviderAdapter, ProviderId, StaticCredentials,
    TenantId,
};
