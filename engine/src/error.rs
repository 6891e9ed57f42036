//! Terminal error taxonomy for extraction requests.
//!
//! Everything here is a *request-level* outcome. Step-local failures
//! (template misses, provider errors, validation failures) are recovered
//! or advanced inside the fallback manager and never surface directly;
//! they are visible only through the audit trail.

use docflow_gateway::{ModelId, ProviderId, TenantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{CorrelationId, DocTypeId};
use crate::types::ErrorReport;

/// Why an extraction request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// No active fallback chain is configured for (doc type, tenant).
    #[error("no active fallback chain for doc type '{doc_type}' and tenant '{tenant}'")]
    NoActiveChain {
        /// Requested doc type.
        doc_type: DocTypeId,
        /// Requesting tenant.
        tenant: TenantId,
    },

    /// The caller declared no doc type and classification found nothing.
    #[error("document could not be classified and no doc type was declared")]
    UnknownDocType,

    /// The active chain violates an ordering invariant.
    #[error("invalid chain configuration: {message}")]
    InvalidChain {
        /// Which invariant, from `ChainConfigError`.
        message: String,
    },

    /// A step references a provider without a credential for this tenant.
    #[error("missing credential for provider '{provider}' referenced by step {step}")]
    MissingCredential {
        /// Provider lacking a credential.
        provider: ProviderId,
        /// Step that references it.
        step: u32,
    },

    /// A step references a model the configuration store does not know.
    #[error("model '{model}' referenced by step {step} is not configured")]
    UnknownModel {
        /// Unknown model id.
        model: ModelId,
        /// Step that references it.
        step: u32,
    },

    /// The configuration store could not be queried at all.
    #[error("configuration store unavailable: {message}")]
    ConfigUnavailable {
        /// Store diagnostic.
        message: String,
    },

    /// The doc-type schema failed to compile.
    #[error("invalid schema for doc type '{doc_type}': {message}")]
    InvalidSchema {
        /// Doc type whose schema is broken.
        doc_type: DocTypeId,
        /// Compiler diagnostic.
        message: String,
    },

    /// The audit sink rejected a write. Proceeding would leave an
    /// unaudited attempt, so the request aborts instead.
    #[error("audit sink unavailable: {message}")]
    AuditUnavailable {
        /// Sink diagnostic.
        message: String,
    },

    /// Preprocessing rejected the document before any provider call.
    #[error("preprocessing failed: {message}")]
    PreProcess {
        /// `UNSUPPORTED_FORMAT` or `CORRUPT_INPUT`.
        code: String,
        /// Human-readable detail.
        message: String,
    },

    /// The overall deadline expired while a step was in flight.
    #[error("deadline exceeded while step {failed_at_step} was in flight")]
    DeadlineExceeded {
        /// Step that was in flight when the deadline hit.
        failed_at_step: u32,
    },

    /// Every step was attempted and none produced schema-valid data.
    #[error("all fallback steps exhausted; last step {failed_at_step} used model '{last_model}'")]
    Exhausted {
        /// Order of the last step attempted.
        failed_at_step: u32,
        /// Model of the last step.
        last_model: ModelId,
    },
}

impl ExtractionError {
    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::NoActiveChain { .. } => "NO_ACTIVE_CHAIN",
            Self::UnknownDocType => "UNKNOWN_DOC_TYPE",
            Self::InvalidChain { .. } => "INVALID_CHAIN",
            Self::MissingCredential { .. } => "MISSING_CREDENTIAL",
            Self::UnknownModel { .. } => "UNKNOWN_MODEL",
            Self::ConfigUnavailable { .. } => "CONFIG_UNAVAILABLE",
            Self::InvalidSchema { .. } => "INVALID_SCHEMA",
            Self::AuditUnavailable { .. } => "AUDIT_UNAVAILABLE",
            Self::PreProcess { code, .. } => code,
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Self::Exhausted { .. } => "FALLBACK_EXHAUSTED",
        }
    }

    /// The step in flight or last attempted when the request failed, for
    /// errors that reach the chain at all.
    #[must_use]
    pub const fn failed_at_step(&self) -> Option<u32> {
        match self {
            Self::DeadlineExceeded { failed_at_step } | Self::Exhausted { failed_at_step, .. } => {
                Some(*failed_at_step)
            }
            _ => None,
        }
    }

    /// Whether the failure is terminal for the correlation id. Terminal
    /// outcomes are recorded for idempotent replay; configuration and
    /// preprocessing faults are not, so the caller may retry them after
    /// fixing the input or the configuration.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. } | Self::Exhausted { .. })
    }

    /// The external error shape (spec'd output surface).
    #[must_use]
    pub fn report(&self, correlation_id: &CorrelationId) -> ErrorReport {
        ErrorReport {
            correlation_id: correlation_id.clone(),
            status: crate::types::ExtractionStatus::Error,
            error_code: self.code().to_owned(),
            error_message: self.to_string(),
            failed_at_step: self.failed_at_step(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = ExtractionError::Exhausted {
            failed_at_step: 3,
            last_model: ModelId::new("model-c"),
        };
        assert_eq!(err.code(), "FALLBACK_EXHAUSTED");
        assert_eq!(err.failed_at_step(), Some(3));
        assert!(err.is_terminal());
    }

    #[test]
    fn preprocess_code_passes_through() {
        let err = ExtractionError::PreProcess {
            code: "CORRUPT_INPUT".into(),
            message: "not valid UTF-8".into(),
        };
        assert_eq!(err.code(), "CORRUPT_INPUT");
        assert!(!err.is_terminal());
    }

    #[test]
    fn report_carries_the_correlation_id() {
        let err = ExtractionError::DeadlineExceeded { failed_at_step: 2 };
        let report = err.report(&CorrelationId::new("req-9"));
        assert_eq!(report.correlation_id.as_str(), "req-9");
        assert_eq!(report.error_code, "DEADLINE_EXCEEDED");
        assert_eq!(report.failed_at_step, Some(2));
    }

    #[test]
    fn round_trips_through_serde() {
        let err = ExtractionError::MissingCredential {
            provider: ProviderId::new("openai"),
            step: 1,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: ExtractionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
