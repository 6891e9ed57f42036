//! Versioned prompt templates.

use docflow_gateway::{ModelId, ProviderId};

use super::ids::{DocTypeId, TemplateId};

/// What a template is scoped to. Resolution prefers the narrowest scope:
/// model, then provider, then the doc-type default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateScope {
    /// Tuned for one specific model.
    Model(ModelId),
    /// Shared by every model of one provider.
    Provider(ProviderId),
    /// Doc-type-wide default.
    DocType,
}

/// A versioned prompt template body. Only the highest active version per
/// (doc type, scope) is eligible for resolution.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template row identifier.
    pub id: TemplateId,
    /// Doc type this template extracts.
    pub doc_type: DocTypeId,
    /// Scope of applicability.
    pub scope: TemplateScope,
    /// Monotonically increasing version.
    pub version: u32,
    /// Whether this version may be used.
    pub active: bool,
    /// Template body with `{{document}}`-style placeholders.
    pub body: String,
}

impl PromptTemplate {
    /// An active version-1 doc-type-default template.
    pub fn new(
        id: impl Into<TemplateId>,
        doc_type: impl Into<DocTypeId>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            doc_type: doc_type.into(),
            scope: TemplateScope::DocType,
            version: 1,
            active: true,
            body: body.into(),
        }
    }

    /// Scope the template to one model.
    #[must_use]
    pub fn for_model(mut self, model: impl Into<ModelId>) -> Self {
        self.scope = TemplateScope::Model(model.into());
        self
    }

    /// Scope the template to one provider.
    #[must_use]
    pub fn for_provider(mut self, provider: impl Into<ProviderId>) -> Self {
        self.scope = TemplateScope::Provider(provider.into());
        self
    }

    /// Set the version.
    #[must_use]
    pub const fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Deactivate this version.
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
