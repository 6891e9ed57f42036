//! Fallback chains and their ordering invariants.

use docflow_gateway::{ModelId, TenantId};
use std::time::Duration;
use thiserror::Error;

use super::ids::{ChainId, DocTypeId, TemplateId};

/// One step of a fallback chain: which model to try, with what template,
/// how many attempts a retryable failure may consume, and the per-attempt
/// timeout.
#[derive(Debug, Clone)]
pub struct FallbackStep {
    /// 1-based position; orders within a chain are a continuous sequence.
    pub order: u32,
    /// Model to call.
    pub model: ModelId,
    /// Explicit template pin. `None` lets the registry resolve by scope.
    pub template: Option<TemplateId>,
    /// Maximum attempts this step may consume on retryable provider
    /// errors. Must be at least 1.
    pub max_retries: u32,
    /// Per-attempt timeout enforced by the gateway.
    pub attempt_timeout: Duration,
}

impl FallbackStep {
    /// A step with a 30-second attempt timeout and a budget of 2.
    pub fn new(order: u32, model: impl Into<ModelId>) -> Self {
        Self {
            order,
            model: model.into(),
            template: None,
            max_retries: 2,
            attempt_timeout: Duration::from_secs(30),
        }
    }

    /// Pin an explicit template.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<TemplateId>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the retryable-error attempt budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// An ordered sequence of steps tried until one produces schema-valid data.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    /// Chain row identifier.
    pub id: ChainId,
    /// Doc type this chain extracts.
    pub doc_type: DocTypeId,
    /// Tenant this chain belongs to.
    pub tenant: TenantId,
    /// Whether this chain is the active one for (doc type, tenant).
    pub active: bool,
    /// Steps in ascending order.
    pub steps: Vec<FallbackStep>,
}

/// Violation of a chain invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainConfigError {
    /// A chain with no steps can never produce a result.
    #[error("chain '{chain}' has no steps")]
    Empty {
        /// Offending chain.
        chain: ChainId,
    },

    /// Step orders must form a continuous ascending sequence starting at 1.
    #[error("chain '{chain}' step orders must be a continuous sequence starting at 1 (expected {expected}, found {found})")]
    BrokenSequence {
        /// Offending chain.
        chain: ChainId,
        /// Order expected at this position.
        expected: u32,
        /// Order actually found.
        found: u32,
    },

    /// A retry budget of zero would make the step unreachable.
    #[error("chain '{chain}' step {order} has a retry budget of 0")]
    ZeroRetryBudget {
        /// Offending chain.
        chain: ChainId,
        /// Offending step order.
        order: u32,
    },
}

impl FallbackChain {
    /// A new active chain; call [`FallbackChain::validate`] after adding steps.
    pub fn new(
        id: impl Into<ChainId>,
        doc_type: impl Into<DocTypeId>,
        tenant: impl Into<TenantId>,
        steps: Vec<FallbackStep>,
    ) -> Self {
        Self {
            id: id.into(),
            doc_type: doc_type.into(),
            tenant: tenant.into(),
            active: true,
            steps,
        }
    }

    /// Checks the ordering invariants: non-empty, orders continuous and
    /// ascending from 1, every retry budget at least 1.
    ///
    /// # Errors
    ///
    /// The first violated invariant, as a [`ChainConfigError`].
    pub fn validate(&self) -> Result<(), ChainConfigError> {
        if self.steps.is_empty() {
            return Err(ChainConfigError::Empty {
                chain: self.id.clone(),
            });
        }

        for (index, step) in self.steps.iter().enumerate() {
            let expected = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
            if step.order != expected {
                return Err(ChainConfigError::BrokenSequence {
                    chain: self.id.clone(),
                    expected,
                    found: step.order,
                });
            }
            if step.max_retries == 0 {
                return Err(ChainConfigError::ZeroRetryBudget {
                    chain: self.id.clone(),
                    order: step.order,
                });
            }
        }

        Ok(())
    }
}
