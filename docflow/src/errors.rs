//! Public error types for docflow.

use thiserror::Error;

/// Errors surfaced by the high-level extractor.
#[derive(Debug, Error)]
pub enum Error {
    /// The extraction request reached a terminal failure; see
    /// [`docflow_engine::error::ExtractionError`] for the taxonomy.
    #[error("{0}")]
    Extraction(#[from] docflow_engine::error::ExtractionError),

    /// The audit trail could not be queried.
    #[error("audit query failed: {0}")]
    Audit(#[from] docflow_engine::audit::AuditError),

    /// The builder was missing a required collaborator.
    #[error("extractor misconfigured: {0}")]
    Builder(String),
}
