//! The fallback state machine.
//!
//! Walks the active chain's steps strictly in ascending order. Within a
//! step, retryable provider errors are retried with exponential backoff
//! and jitter up to the step's budget; the first schema-invalid result
//! earns exactly one corrective re-prompt; everything else advances.
//! Every attempt is recorded in the audit trail *before* the state
//! transition it causes; an unaudited attempt must never influence the
//! outcome.

use docflow_gateway::{CallOptions, Gateway, ModelId, ProviderErrorKind, TenantId};
use docflow_preprocess::PreProcessResult;
use rand::Rng;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::audit::{AttemptStatus, AuditError, AuditRecord, AuditSink};
use crate::config::{ConfigSnapshot, CorrelationId};
use crate::metrics::{estimate_tokens, AttemptMetrics};
use crate::registry::{render, render_corrective, PromptRegistry, TEMPLATE_NOT_FOUND};
use crate::validate::{SchemaValidator, ValidationReport};

/// Observable state of the machine, used in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    /// About to attempt the step with this order.
    Pending(u32),
    /// Backing off before re-attempting the same step.
    Retrying {
        /// Step being retried.
        step: u32,
        /// Attempt number about to run.
        attempt: u32,
    },
    /// Moving to the next step.
    Advancing,
    /// A step produced schema-valid data.
    Succeeded,
    /// Every step was attempted without success.
    Exhausted,
}

impl fmt::Display for FallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(step) => write!(f, "pending({step})"),
            Self::Retrying { step, attempt } => write!(f, "retrying({step}, attempt {attempt})"),
            Self::Advancing => f.write_str("advancing"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Exhausted => f.write_str("exhausted"),
        }
    }
}

/// Exponential backoff with jitter for retryable provider errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// First-retry delay; doubles per subsequent retry.
    pub base_delay: Duration,
    /// Upper bound on the deterministic part of the delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Set the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, base: Duration) -> Self {
        self.base_delay = base;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay = max;
        self
    }

    /// Deterministic part: `base * 2^(failures-1)`, capped at `max_delay`.
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(1_u64 << exponent);
        Duration::from_millis(millis).min(self.max_delay)
    }

    /// Backoff plus up to 50% jitter, so concurrent requests hitting the
    /// same rate-limit bucket do not re-converge on the provider.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let base = self.backoff(failures);
        let half = (base.as_millis() as u64) / 2;
        if half == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=half))
    }
}

/// Schema-valid data from the first step that produced it.
#[derive(Debug, Clone)]
pub struct FallbackSuccess {
    /// Order of the winning step.
    pub step_order: u32,
    /// Model that produced the data.
    pub model: ModelId,
    /// Parsed, schema-valid output.
    pub data: Value,
    /// Accounting across the whole run.
    pub metrics: AttemptMetrics,
}

/// Terminal failure of the machine.
#[derive(Debug)]
pub enum FallbackError {
    /// Every step was attempted and none produced valid data.
    Exhausted {
        /// Order of the last step.
        failed_at_step: u32,
        /// Model of the last step.
        last_model: ModelId,
        /// Accounting across the whole run.
        metrics: AttemptMetrics,
    },
    /// The overall deadline expired.
    DeadlineExceeded {
        /// Step in flight (or next up) when the deadline hit.
        failed_at_step: u32,
        /// Accounting across the whole run.
        metrics: AttemptMetrics,
    },
    /// The audit sink failed; the request aborts unaudited work.
    Audit(AuditError),
}

/// Drives one request through the chain. Borrowed pieces only; the
/// manager itself holds no state between requests.
pub struct FallbackManager<'a> {
    snapshot: &'a ConfigSnapshot,
    registry: PromptRegistry<'a>,
    validator: &'a SchemaValidator,
    gateway: &'a Gateway,
    audit: &'a dyn AuditSink,
    correlation_id: &'a CorrelationId,
    tenant: &'a TenantId,
    retry: RetryPolicy,
    options: CallOptions,
}

impl<'a> FallbackManager<'a> {
    /// Assembles a manager for one request.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        snapshot: &'a ConfigSnapshot,
        validator: &'a SchemaValidator,
        gateway: &'a Gateway,
        audit: &'a dyn AuditSink,
        correlation_id: &'a CorrelationId,
        tenant: &'a TenantId,
        retry: RetryPolicy,
        options: CallOptions,
    ) -> Self {
        Self {
            snapshot,
            registry: PromptRegistry::new(&snapshot.templates),
            validator,
            gateway,
            audit,
            correlation_id,
            tenant,
            retry,
            options,
        }
    }

    /// Runs the machine to a terminal state.
    pub async fn run(
        &self,
        pre: &PreProcessResult,
        deadline: Instant,
    ) -> Result<FallbackSuccess, FallbackError> {
        let started = Instant::now();
        let mut metrics = AttemptMetrics::default();

        'steps: for step in &self.snapshot.chain.steps {
            metrics.steps_tried += 1;
            tracing::info!(
                correlation_id = %self.correlation_id,
                state = %FallbackState::Pending(step.order),
                model = %step.model,
                "entering fallback step"
            );

            let Some(model) = self.snapshot.models.get(&step.model) else {
                // Preflighted by the orchestrator; advance if it slips through.
                metrics.total_attempts += 1;
                self.record(step.order, 1, &step.model, AttemptStatus::Failed, 0, Some("UNKNOWN_MODEL"))
                    .await?;
                continue 'steps;
            };

            let mut attempt: u32 = 0;
            let mut provider_failures: u32 = 0;
            let mut validation_failures: u32 = 0;
            let mut corrective: Option<ValidationReport> = None;

            loop {
                attempt += 1;

                let now = Instant::now();
                if now >= deadline {
                    // Nothing in flight: no attempt was made, no row written.
                    metrics.wall_time = started.elapsed();
                    return Err(FallbackError::DeadlineExceeded {
                        failed_at_step: step.order,
                        metrics,
                    });
                }
                let remaining = deadline - now;

                let template = match self.registry.resolve_pinned(
                    &self.snapshot.doc_type,
                    model,
                    step.template.as_ref(),
                ) {
                    Ok(template) => template,
                    Err(e) => {
                        tracing::warn!(
                            correlation_id = %self.correlation_id,
                            step = step.order,
                            state = %FallbackState::Advancing,
                            error = %e,
                            "no eligible template for step"
                        );
                        metrics.total_attempts += 1;
                        self.record(
                            step.order,
                            attempt,
                            &model.id,
                            AttemptStatus::Failed,
                            0,
                            Some(TEMPLATE_NOT_FOUND),
                        )
                        .await?;
                        continue 'steps;
                    }
                };

                let prompt = match &corrective {
                    None => render(template, &self.snapshot.doc_type, pre),
                    Some(report) => {
                        render_corrective(template, &self.snapshot.doc_type, pre, report)
                    }
                };
                metrics.estimated_input_tokens += estimate_tokens(&prompt);

                let step_timeout = if step.attempt_timeout.is_zero() {
                    model.default_timeout
                } else {
                    step.attempt_timeout
                };
                let options = self
                    .options
                    .clone()
                    .with_timeout(step_timeout.min(remaining));

                let attempt_started = Instant::now();
                let call = self
                    .gateway
                    .call(&model.provider, &model.id, &prompt, &options, self.tenant)
                    .await;

                match call {
                    Ok(outcome) => {
                        metrics.total_attempts += 1;
                        metrics.estimated_output_tokens += estimate_tokens(&outcome.raw_text);
                        let latency_ms = outcome.latency.as_millis() as u64;
                        let report = self.validator.validate(&outcome.raw_text);

                        if report.is_valid() {
                            self.record(
                                step.order,
                                attempt,
                                &model.id,
                                AttemptStatus::Succeeded,
                                latency_ms,
                                None,
                            )
                            .await?;
                            metrics.wall_time = started.elapsed();
                            tracing::info!(
                                correlation_id = %self.correlation_id,
                                state = %FallbackState::Succeeded,
                                step = step.order,
                                attempts = metrics.total_attempts,
                                "fallback machine succeeded"
                            );
                            return Ok(FallbackSuccess {
                                step_order: step.order,
                                model: model.id.clone(),
                                data: report.parsed.unwrap_or_default(),
                                metrics,
                            });
                        }

                        validation_failures += 1;
                        self.record(
                            step.order,
                            attempt,
                            &model.id,
                            AttemptStatus::ValidationFailed,
                            latency_ms,
                            report.error_code(),
                        )
                        .await?;

                        if validation_failures == 1 {
                            tracing::info!(
                                correlation_id = %self.correlation_id,
                                step = step.order,
                                violations = report.violations.len(),
                                "first validation failure; issuing corrective re-prompt"
                            );
                            corrective = Some(report);
                            continue;
                        }

                        tracing::warn!(
                            correlation_id = %self.correlation_id,
                            step = step.order,
                            state = %FallbackState::Advancing,
                            "second consecutive invalid result"
                        );
                        continue 'steps;
                    }
                    Err(provider_error) => {
                        metrics.total_attempts += 1;
                        let latency_ms = attempt_started.elapsed().as_millis() as u64;

                        let deadline_hit = provider_error.kind == ProviderErrorKind::Timeout
                            && Instant::now() >= deadline;
                        if deadline_hit {
                            // The in-flight attempt was cancelled at the
                            // overall deadline; record it and stop.
                            self.record(
                                step.order,
                                attempt,
                                &model.id,
                                AttemptStatus::Timeout,
                                latency_ms,
                                Some("DEADLINE_EXCEEDED"),
                            )
                            .await?;
                            metrics.wall_time = started.elapsed();
                            return Err(FallbackError::DeadlineExceeded {
                                failed_at_step: step.order,
                                metrics,
                            });
                        }

                        provider_failures += 1;
                        self.record(
                            step.order,
                            attempt,
                            &model.id,
                            AttemptStatus::ProviderError,
                            latency_ms,
                            Some(provider_error.kind.code()),
                        )
                        .await?;

                        if provider_error.retryable() && provider_failures < step.max_retries {
                            let delay = self
                                .retry
                                .delay_for(provider_failures)
                                .min(deadline.saturating_duration_since(Instant::now()));
                            let next = FallbackState::Retrying {
                                step: step.order,
                                attempt: attempt + 1,
                            };
                            tracing::warn!(
                                correlation_id = %self.correlation_id,
                                state = %next,
                                kind = provider_error.kind.code(),
                                delay_ms = delay.as_millis() as u64,
                                "retryable provider error; backing off"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }

                        tracing::warn!(
                            correlation_id = %self.correlation_id,
                            step = step.order,
                            state = %FallbackState::Advancing,
                            kind = provider_error.kind.code(),
                            retryable = provider_error.retryable(),
                            "provider error; advancing"
                        );
                        continue 'steps;
                    }
                }
            }
        }

        metrics.wall_time = started.elapsed();
        let (failed_at_step, last_model) = self
            .snapshot
            .chain
            .steps
            .last()
            .map_or((0, ModelId::new("")), |s| (s.order, s.model.clone()));
        tracing::warn!(
            correlation_id = %self.correlation_id,
            state = %FallbackState::Exhausted,
            steps = metrics.steps_tried,
            attempts = metrics.total_attempts,
            "fallback chain exhausted"
        );
        Err(FallbackError::Exhausted {
            failed_at_step,
            last_model,
            metrics,
        })
    }

    async fn record(
        &self,
        step_order: u32,
        attempt: u32,
        model: &ModelId,
        status: AttemptStatus,
        latency_ms: u64,
        error_code: Option<&str>,
    ) -> Result<(), FallbackError> {
        self.audit
            .record(AuditRecord::new(
                self.correlation_id.clone(),
                step_order,
                attempt,
                model.clone(),
                status,
                latency_ms,
                error_code.map(str::to_owned),
            ))
            .await
            .map_err(FallbackError::Audit)
    }
}
