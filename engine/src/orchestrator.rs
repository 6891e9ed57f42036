//! Per-request coordination: idempotence, configuration resolution,
//! preflight, deadline enforcement, and result assembly.

use docflow_gateway::{CallOptions, Gateway};
use docflow_preprocess::PreProcessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::audit::AuditSink;
use crate::config::{ConfigCache, ConfigStore, DocTypeId};
use crate::error::ExtractionError;
use crate::fallback::{FallbackError, FallbackManager, RetryPolicy};
use crate::types::{ExtractionOutcome, ExtractionRequest, ExtractionResult, ExtractionStatus};
use crate::validate::SchemaValidator;

/// Engine-wide tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Extractions allowed to run concurrently. Protects downstream
    /// provider rate limits.
    pub max_concurrent_requests: usize,
    /// Overall deadline applied when the request carries none.
    pub default_deadline: Duration,
    /// TTL of the configuration cache.
    pub config_ttl: Duration,
    /// Backoff policy for retryable provider errors.
    pub retry: RetryPolicy,
    /// Sampling temperature for every extraction call.
    pub temperature: f32,
    /// Generation token cap for every extraction call.
    pub max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            default_deadline: Duration::from_secs(60),
            config_ttl: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            temperature: 0.0,
            max_tokens: 2048,
        }
    }
}

impl EngineConfig {
    /// Set the concurrency bound.
    #[must_use]
    pub const fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    /// Set the default overall deadline.
    #[must_use]
    pub const fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = deadline;
        self
    }

    /// Set the configuration cache TTL.
    #[must_use]
    pub const fn with_config_ttl(mut self, ttl: Duration) -> Self {
        self.config_ttl = ttl;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Top-level per-request coordinator.
pub struct Orchestrator {
    config: EngineConfig,
    cache: ConfigCache,
    gateway: Arc<Gateway>,
    preprocessor: PreProcessor,
    audit: Arc<dyn AuditSink>,
    limiter: Arc<Semaphore>,
}

impl Orchestrator {
    /// Wires an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConfigStore>,
        gateway: Arc<Gateway>,
        audit: Arc<dyn AuditSink>,
        config: EngineConfig,
    ) -> Self {
        let cache = ConfigCache::new(store, config.config_ttl);
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        Self {
            config,
            cache,
            gateway,
            preprocessor: PreProcessor::new(),
            audit,
            limiter,
        }
    }

    /// Drops cached configuration; the next request reloads from the store.
    pub async fn invalidate_config(&self) {
        self.cache.invalidate().await;
    }

    /// The audit sink, for callers that need the trail of a request.
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Runs one extraction to a terminal state.
    ///
    /// Idempotence: a previously recorded terminal outcome for the same
    /// correlation id is returned as-is, with no provider calls made.
    ///
    /// # Errors
    ///
    /// See [`ExtractionError`] for the taxonomy. Configuration and
    /// preprocessing faults surface before any provider call.
    pub async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        let correlation_id = request.correlation_id.clone();

        if let Some(outcome) = self
            .audit
            .find_outcome(&correlation_id)
            .await
            .map_err(|e| ExtractionError::AuditUnavailable {
                message: e.to_string(),
            })?
        {
            tracing::info!(
                correlation_id = %correlation_id,
                "duplicate submission; returning previously recorded outcome"
            );
            return outcome.into_result();
        }

        #[allow(clippy::expect_used)]
        let _permit = self
            .limiter
            .acquire()
            .await
            .expect("extraction semaphore is never closed");

        let pre = self
            .preprocessor
            .process(
                &request.document,
                request.doc_type.as_ref().map(DocTypeId::as_str),
            )
            .map_err(|e| ExtractionError::PreProcess {
                code: e.code().to_owned(),
                message: e.to_string(),
            })?;

        let doc_type = request
            .doc_type
            .clone()
            .or_else(|| pre.detected_doc_type.as_deref().map(DocTypeId::new))
            .ok_or(ExtractionError::UnknownDocType)?;

        let snapshot = self
            .cache
            .snapshot(&doc_type, &request.tenant)
            .await
            .map_err(|e| ExtractionError::ConfigUnavailable {
                message: e.to_string(),
            })?
            .ok_or_else(|| ExtractionError::NoActiveChain {
                doc_type: doc_type.clone(),
                tenant: request.tenant.clone(),
            })?;

        snapshot
            .chain
            .validate()
            .map_err(|e| ExtractionError::InvalidChain {
                message: e.to_string(),
            })?;

        // Preflight: every step needs a configured model and a resolvable
        // credential, else the chain is unusable and nothing is attempted.
        for step in &snapshot.chain.steps {
            let Some(model) = snapshot.models.get(&step.model) else {
                return Err(ExtractionError::UnknownModel {
                    model: step.model.clone(),
                    step: step.order,
                });
            };
            if !self
                .gateway
                .credentials()
                .contains(&model.provider, &request.tenant)
                .await
            {
                return Err(ExtractionError::MissingCredential {
                    provider: model.provider.clone(),
                    step: step.order,
                });
            }
        }

        let validator = SchemaValidator::new(&snapshot.doc_type.schema).map_err(|e| {
            ExtractionError::InvalidSchema {
                doc_type: doc_type.clone(),
                message: e.to_string(),
            }
        })?;

        let deadline =
            Instant::now() + request.deadline.unwrap_or(self.config.default_deadline);

        tracing::info!(
            correlation_id = %correlation_id,
            doc_type = %doc_type,
            tenant = %request.tenant,
            chain = %snapshot.chain.id,
            steps = snapshot.chain.steps.len(),
            pages = pre.page_count,
            "starting extraction"
        );

        let manager = FallbackManager::new(
            &snapshot,
            &validator,
            &self.gateway,
            self.audit.as_ref(),
            &correlation_id,
            &request.tenant,
            self.config.retry.clone(),
            CallOptions::default()
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens),
        );

        let outcome = match manager.run(&pre, deadline).await {
            Ok(success) => ExtractionOutcome::Success(ExtractionResult {
                correlation_id: correlation_id.clone(),
                status: ExtractionStatus::Success,
                doc_type,
                data: success.data,
                confidence: pre.confidence,
                succeeded_step: success.step_order,
                model: success.model,
                metrics: success.metrics,
            }),
            Err(FallbackError::Exhausted {
                failed_at_step,
                last_model,
                ..
            }) => ExtractionOutcome::Failure(ExtractionError::Exhausted {
                failed_at_step,
                last_model,
            }),
            Err(FallbackError::DeadlineExceeded { failed_at_step, .. }) => {
                ExtractionOutcome::Failure(ExtractionError::DeadlineExceeded { failed_at_step })
            }
            Err(FallbackError::Audit(e)) => {
                // Do not record an outcome for an audit fault: the trail
                // itself is broken, and replaying the fault would mask a
                // later recovery.
                return Err(ExtractionError::AuditUnavailable {
                    message: e.to_string(),
                });
            }
        };

        self.audit
            .record_outcome(&correlation_id, &outcome)
            .await
            .map_err(|e| ExtractionError::AuditUnavailable {
                message: e.to_string(),
            })?;

        outcome.into_result()
    }
}
