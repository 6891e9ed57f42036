//! Credential resolution seam.
//!
//! The gateway consults the store at call time and holds the secret only
//! for the duration of the call, never cached and never logged. The real
//! store lives outside this crate (encrypted per-tenant rows); the
//! in-memory [`StaticCredentials`] implementation exists for tests and
//! single-tenant deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::types::{ProviderId, TenantId};

/// An opaque provider secret.
///
/// `Debug` is redacted so credentials cannot leak through tracing or
/// error formatting.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for building the provider request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Failure to resolve a credential.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// No secret is configured for the (provider, tenant) pair.
    #[error("no credential for provider '{provider}' and tenant '{tenant}'")]
    NotFound {
        /// Provider the lookup was for.
        provider: ProviderId,
        /// Tenant the lookup was for.
        tenant: TenantId,
    },

    /// The backing store could not be reached.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only credential lookup, implemented by the external store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolves the secret for a (provider, tenant) pair.
    async fn get(
        &self,
        provider: &ProviderId,
        tenant: &TenantId,
    ) -> Result<Credential, CredentialError>;

    /// Whether a credential exists, without exposing it. Used by the
    /// engine's chain preflight.
    async fn contains(&self, provider: &ProviderId, tenant: &TenantId) -> bool {
        self.get(provider, tenant).await.is_ok()
    }
}

/// In-memory credential map for tests and single-tenant setups.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    secrets: HashMap<(ProviderId, TenantId), Credential>,
}

impl StaticCredentials {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential (builder form).
    #[must_use]
    pub fn with_credential(
        mut self,
        provider: ProviderId,
        tenant: TenantId,
        credential: Credential,
    ) -> Self {
        self.secrets.insert((provider, tenant), credential);
        self
    }
}

#[async_trait]
impl CredentialStore for StaticCredentials {
    async fn get(
        &self,
        provider: &ProviderId,
        tenant: &TenantId,
    ) -> Result<Credential, CredentialError> {
        self.secrets
            .get(&(provider.clone(), tenant.clone()))
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                provider: provider.clone(),
                tenant: tenant.clone(),
            })
    }
}
