//! Append-only audit trail of extraction attempts.
//!
//! Audit completeness is a compliance requirement, not best effort: a
//! sink failure aborts the request rather than letting an unaudited
//! provider call proceed. Rows are immutable and totally ordered by
//! (correlation id, step order, attempt number); the sink serializes
//! writes per correlation id but may parallelize across ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docflow_gateway::ModelId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::config::CorrelationId;
use crate::types::ExtractionOutcome;

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// The call returned and the output was schema-valid.
    Succeeded,
    /// The provider call failed (the error code column says how).
    ProviderError,
    /// The call returned but the output failed validation.
    ValidationFailed,
    /// The overall deadline expired while this attempt was in flight.
    Timeout,
    /// The attempt could not be made at all (e.g. no template).
    Failed,
}

impl AttemptStatus {
    /// Column value for the audit store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Failed => "FAILED",
        }
    }
}

/// One immutable audit row. Created exclusively by the engine, one per
/// attempt, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Row id.
    pub id: Uuid,
    /// Correlation id of the request.
    pub correlation_id: CorrelationId,
    /// 1-based chain step order.
    pub step_order: u32,
    /// 1-based attempt number within the step.
    pub attempt: u32,
    /// Model the attempt was addressed to.
    pub model: ModelId,
    /// How the attempt ended.
    pub status: AttemptStatus,
    /// Wall-clock latency of the attempt in milliseconds.
    pub latency_ms: u64,
    /// Machine-readable failure code, when the attempt failed.
    pub error_code: Option<String>,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// A new row stamped with the current time.
    #[must_use]
    pub fn new(
        correlation_id: CorrelationId,
        step_order: u32,
        attempt: u32,
        model: ModelId,
        status: AttemptStatus,
        latency_ms: u64,
        error_code: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            step_order,
            attempt,
            model,
            status,
            latency_ms,
            error_code,
            recorded_at: Utc::now(),
        }
    }
}

/// Audit backend failure. Never swallowed.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    /// The backing store rejected the write or query.
    #[error("audit backend unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, queryable-by-correlation-id audit storage.
///
/// The durable backend is external; [`MemoryAuditLog`] is the reference
/// implementation used in tests and embedded deployments.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one row. Must not fail silently.
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError>;

    /// All rows for a correlation id, ordered by (step order, attempt).
    async fn attempts_for(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<AuditRecord>, AuditError>;

    /// Stores the terminal outcome for idempotent replay. First write
    /// wins; outcomes are as immutable as the rows.
    async fn record_outcome(
        &self,
        correlation_id: &CorrelationId,
        outcome: &ExtractionOutcome,
    ) -> Result<(), AuditError>;

    /// The previously recorded terminal outcome, if any.
    async fn find_outcome(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<ExtractionOutcome>, AuditError>;
}

#[derive(Default)]
struct MemoryAuditInner {
    rows: HashMap<CorrelationId, Vec<AuditRecord>>,
    outcomes: HashMap<CorrelationId, ExtractionOutcome>,
}

/// In-memory audit log. Critical sections are short and synchronous, so
/// a plain mutex keeps per-correlation write order without blocking the
/// runtime.
#[derive(Default)]
pub struct MemoryAuditLog {
    inner: Mutex<MemoryAuditInner>,
}

impl MemoryAuditLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        inner
            .rows
            .entry(record.correlation_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn attempts_for(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        let mut rows = inner.rows.get(correlation_id).cloned().unwrap_or_default();
        rows.sort_by_key(|r| (r.step_order, r.attempt));
        Ok(rows)
    }

    async fn record_outcome(
        &self,
        correlation_id: &CorrelationId,
        outcome: &ExtractionOutcome,
    ) -> Result<(), AuditError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        inner
            .outcomes
            .entry(correlation_id.clone())
            .or_insert_with(|| outcome.clone());
        Ok(())
    }

    async fn find_outcome(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<ExtractionOutcome>, AuditError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        Ok(inner.outcomes.get(correlation_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;

    fn row(correlation: &str, step: u32, attempt: u32, status: AttemptStatus) -> AuditRecord {
        AuditRecord::new(
            CorrelationId::new(correlation),
            step,
            attempt,
            ModelId::new("model-a"),
            status,
            12,
            None,
        )
    }

    #[tokio::test]
    async fn rows_come_back_ordered() {
        let log = MemoryAuditLog::new();
        log.record(row("req-1", 2, 1, AttemptStatus::ProviderError))
            .await
            .unwrap();
        log.record(row("req-1", 1, 1, AttemptStatus::ProviderError))
            .await
            .unwrap();
        log.record(row("req-1", 1, 2, AttemptStatus::Succeeded))
            .await
            .unwrap();

        let rows = log.attempts_for(&CorrelationId::new("req-1")).await.unwrap();
        let order: Vec<(u32, u32)> = rows.iter().map(|r| (r.step_order, r.attempt)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[tokio::test]
    async fn correlation_ids_are_isolated() {
        let log = MemoryAuditLog::new();
        log.record(row("req-1", 1, 1, AttemptStatus::Succeeded))
            .await
            .unwrap();

        let other = log.attempts_for(&CorrelationId::new("req-2")).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn first_outcome_wins() {
        let log = MemoryAuditLog::new();
        let id = CorrelationId::new("req-1");
        let first = ExtractionOutcome::Failure(ExtractionError::DeadlineExceeded {
            failed_at_step: 1,
        });
        let second = ExtractionOutcome::Failure(ExtractionError::DeadlineExceeded {
            failed_at_step: 9,
        });

        log.record_outcome(&id, &first).await.unwrap();
        log.record_outcome(&id, &second).await.unwrap();

        let stored = log.find_outcome(&id).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }
}
