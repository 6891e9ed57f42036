//! # docflow-engine
//!
//! The extraction orchestration core: given a normalized document and an
//! active fallback chain, render a prompt, call a provider through the
//! gateway, validate the output against the doc-type schema, and on
//! failure walk the chain deterministically, recording every attempt in
//! an append-only audit trail.
//!
//! The moving parts:
//!
//! - [`config`]: the read-only configuration model (doc types, prompt
//!   templates, fallback chains) plus the TTL-bounded read-through cache.
//! - [`registry::PromptRegistry`]: template resolution and pure rendering.
//! - [`validate::SchemaValidator`]: structured parse + all-violations
//!   schema checking.
//! - [`audit`]: the append-only attempt log and terminal-outcome store.
//! - [`fallback::FallbackManager`]: the per-request state machine.
//! - [`orchestrator::Orchestrator`]: idempotence, deadline enforcement,
//!   bounded concurrency, result assembly.

pub mod audit;
pub mod config;
pub mod error;
pub mod fallback;
pub mod feedback;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod types;
pub mod validate;

/// Commonly used types for wiring an extraction engine.
pub mod prelude {
    pub use crate::audit::{AuditRecord, AuditSink, AttemptStatus, MemoryAuditLog};
    pub use crate::config::{
        ChainId, ConfigStore, CorrelationId, DocType, DocTypeId, FallbackChain, FallbackStep,
        MemoryConfigStore, ModelSpec, PromptTemplate, TemplateId, TemplateScope,
    };
    pub use crate::error::ExtractionError;
    pub use crate::fallback::{FallbackState, RetryPolicy};
    pub use crate::metrics::AttemptMetrics;
    pub use crate::orchestrator::{EngineConfig, Orchestrator};
    pub use crate::types::{ExtractionRequest, ExtractionResult, ExtractionStatus};
}
