//! Doc types and their structural schemas.

use serde_json::Value;

use super::ids::DocTypeId;

/// A document classification driving schema and prompt selection.
#[derive(Debug, Clone)]
pub struct DocType {
    /// Slug, e.g. `LAB_REPORT`.
    pub slug: DocTypeId,
    /// Display name.
    pub name: String,
    /// JSON Schema the extracted data must satisfy (required fields,
    /// types, value constraints).
    pub schema: Value,
}

impl DocType {
    /// A doc type from slug and schema; the display name defaults to the slug.
    pub fn new(slug: impl Into<DocTypeId>, schema: Value) -> Self {
        let slug = slug.into();
        Self {
            name: slug.as_str().to_owned(),
            slug,
            schema,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
