//! Prompt template resolution and rendering.
//!
//! Resolution prefers the narrowest scope (model, then provider, then
//! the doc-type default) and within a scope the highest active version.
//! Rendering is pure: identical inputs produce identical prompts, which
//! is what makes audit rows replayable.

use docflow_preprocess::PreProcessResult;
use thiserror::Error;

use crate::config::{DocType, ModelSpec, PromptTemplate, TemplateScope};
use crate::feedback;
use crate::validate::ValidationReport;

/// No eligible template for the (doc type, model) pair.
#[derive(Debug, Clone, Error)]
#[error("no active template for doc type '{doc_type}' and model '{model}'")]
pub struct TemplateNotFound {
    /// Doc type looked up.
    pub doc_type: String,
    /// Model looked up.
    pub model: String,
}

/// Error code recorded when a step has no template.
pub const TEMPLATE_NOT_FOUND: &str = "TEMPLATE_NOT_FOUND";

/// Resolves and renders templates out of a per-request snapshot.
pub struct PromptRegistry<'a> {
    templates: &'a [PromptTemplate],
}

impl<'a> PromptRegistry<'a> {
    /// A registry over the snapshot's templates.
    #[must_use]
    pub const fn new(templates: &'a [PromptTemplate]) -> Self {
        Self { templates }
    }

    /// Picks the template for a (doc type, model) pair.
    ///
    /// # Errors
    ///
    /// [`TemplateNotFound`] when no active template exists at any scope.
    pub fn resolve(
        &self,
        doc_type: &DocType,
        model: &ModelSpec,
    ) -> Result<&'a PromptTemplate, TemplateNotFound> {
        self.best(doc_type, |s| {
            matches!(s, TemplateScope::Model(m) if *m == model.id)
        })
        .or_else(|| {
            self.best(doc_type, |s| {
                matches!(s, TemplateScope::Provider(p) if *p == model.provider)
            })
        })
        .or_else(|| self.best(doc_type, |s| matches!(s, TemplateScope::DocType)))
        .ok_or_else(|| TemplateNotFound {
            doc_type: doc_type.slug.to_string(),
            model: model.id.to_string(),
        })
    }

    fn best(
        &self,
        doc_type: &DocType,
        scope_matches: impl Fn(&TemplateScope) -> bool,
    ) -> Option<&'a PromptTemplate> {
        self.templates
            .iter()
            .filter(|t| t.active && t.doc_type == doc_type.slug)
            .filter(|t| scope_matches(&t.scope))
            .max_by_key(|t| t.version)
    }

    /// Resolves a step's template: the explicit pin when the step carries
    /// one (and it is active), otherwise scope resolution.
    pub fn resolve_pinned(
        &self,
        doc_type: &DocType,
        model: &ModelSpec,
        pin: Option<&crate::config::TemplateId>,
    ) -> Result<&'a PromptTemplate, TemplateNotFound> {
        if let Some(id) = pin {
            return self
                .templates
                .iter()
                .find(|t| &t.id == id && t.active)
                .ok_or_else(|| TemplateNotFound {
                    doc_type: doc_type.slug.to_string(),
                    model: model.id.to_string(),
                });
        }
        self.resolve(doc_type, model)
    }
}

/// Renders the initial prompt for a step. Pure.
#[must_use]
pub fn render(template: &PromptTemplate, doc_type: &DocType, pre: &PreProcessResult) -> String {
    let schema = serde_json::to_string_pretty(&doc_type.schema)
        .unwrap_or_else(|_| doc_type.schema.to_string());

    template
        .body
        .replace("{{document}}", &pre.normalized_text)
        .replace("{{doc_type}}", doc_type.slug.as_str())
        .replace("{{page_count}}", &pre.page_count.to_string())
        .replace("{{schema}}", &schema)
}

/// Renders the corrective re-prompt: the initial prompt plus a feedback
/// block listing every violation of the previous attempt. Pure.
#[must_use]
pub fn render_corrective(
    template: &PromptTemplate,
    doc_type: &DocType,
    pre: &PreProcessResult,
    report: &ValidationReport,
) -> String {
    let initial = render(template, doc_type, pre);
    let block = match &report.parsed {
        Some(submitted) => {
            feedback::build_validation_feedback(&doc_type.schema, submitted, &report.violations)
        }
        None => feedback::build_parse_error_feedback(&doc_type.schema, &report.violations),
    };
    format!("{initial}\n\n{block}")
}
