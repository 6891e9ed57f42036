//! Request and result shapes of the extraction surface.

use docflow_gateway::{ModelId, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::{CorrelationId, DocTypeId};
use crate::error::ExtractionError;
use crate::metrics::AttemptMetrics;

/// One extraction request as handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Raw document bytes.
    pub document: Vec<u8>,
    /// Declared doc type; `None` lets preprocessing classify.
    pub doc_type: Option<DocTypeId>,
    /// Tenant on whose behalf the extraction runs.
    pub tenant: TenantId,
    /// Caller-supplied idempotency key.
    pub correlation_id: CorrelationId,
    /// Overall deadline; `None` uses the engine default.
    pub deadline: Option<Duration>,
}

impl ExtractionRequest {
    /// A request with no declared doc type and the default deadline.
    pub fn new(
        document: impl Into<Vec<u8>>,
        tenant: impl Into<TenantId>,
        correlation_id: impl Into<CorrelationId>,
    ) -> Self {
        Self {
            document: document.into(),
            doc_type: None,
            tenant: tenant.into(),
            correlation_id: correlation_id.into(),
            deadline: None,
        }
    }

    /// Declare the doc type, skipping classification.
    #[must_use]
    pub fn with_doc_type(mut self, doc_type: impl Into<DocTypeId>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    /// Set the overall deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Request status on the external surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Schema-valid data was produced.
    Success,
    /// The request failed terminally.
    Error,
}

/// Successful extraction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Echo of the caller's idempotency key.
    pub correlation_id: CorrelationId,
    /// Always [`ExtractionStatus::Success`] here.
    pub status: ExtractionStatus,
    /// Doc type the data was extracted as.
    pub doc_type: DocTypeId,
    /// Schema-valid structured data.
    pub data: Value,
    /// Classification confidence reported by preprocessing.
    pub confidence: f32,
    /// Chain step that produced the data.
    pub succeeded_step: u32,
    /// Model that produced the data.
    pub model: ModelId,
    /// Attempt accounting for the whole request.
    pub metrics: AttemptMetrics,
}

/// Failure shape on the external surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Echo of the caller's idempotency key.
    pub correlation_id: CorrelationId,
    /// Always [`ExtractionStatus::Error`] here.
    pub status: ExtractionStatus,
    /// Stable machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub error_message: String,
    /// Step in flight or last attempted, when the chain was reached.
    pub failed_at_step: Option<u32>,
}

/// Terminal outcome recorded per correlation id for idempotent replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractionOutcome {
    /// The request produced schema-valid data.
    Success(ExtractionResult),
    /// The request failed terminally (exhausted or deadline).
    Failure(ExtractionError),
}

impl ExtractionOutcome {
    /// Converts the stored outcome back into the surface result, cloning
    /// exactly what was recorded.
    pub fn into_result(self) -> Result<ExtractionResult, ExtractionError> {
        match self {
            Self::Success(result) => Ok(result),
            Self::Failure(error) => Err(error),
        }
    }
}
