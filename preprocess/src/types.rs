//! Result type handed to the extraction engine.

use serde::{Deserialize, Serialize};

/// A normalized document, ready for prompt rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreProcessResult {
    /// Full text with pages joined by a page-break marker.
    pub normalized_text: String,
    /// Per-page text, in document order.
    pub pages: Vec<String>,
    /// Number of pages detected.
    pub page_count: usize,
    /// Classification confidence in `[0.0, 1.0]`. 1.0 when the caller
    /// declared the doc type; possibly low when inferred. Ambiguity is
    /// passed downstream here rather than failing the request.
    pub confidence: f32,
    /// Doc-type slug: the declared one, or the classifier's best guess,
    /// or `None` when nothing matched.
    pub detected_doc_type: Option<String>,
}
