use crate::classify::classify;
use crate::error::PreProcessError;
use crate::normalize::{detect_binary_format, sanitize_text, split_pages};
use crate::types::PreProcessResult;

/// Marker inserted between pages in the concatenated text.
const PAGE_JOIN: &str = "\n\n--- Page Break ---\n\n";

/// Turns raw document bytes into normalized text and pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreProcessor;

impl PreProcessor {
    /// A preprocessor with default behavior.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalizes raw bytes; classifies when no doc type was declared.
    ///
    /// # Errors
    ///
    /// [`PreProcessError::UnsupportedFormat`] for recognized binary
    /// containers, [`PreProcessError::CorruptInput`] for undecodable or
    /// empty input. Low classification confidence is never an error.
    pub fn process(
        &self,
        raw_bytes: &[u8],
        declared_doc_type: Option<&str>,
    ) -> Result<PreProcessResult, PreProcessError> {
        if let Some(format) = detect_binary_format(raw_bytes) {
            return Err(PreProcessError::UnsupportedFormat {
                format: format.to_owned(),
            });
        }

        let text = std::str::from_utf8(raw_bytes)
            .map_err(|e| PreProcessError::CorruptInput(format!("not valid UTF-8: {e}")))?;

        if text.contains('\0') {
            return Err(PreProcessError::CorruptInput("embedded NUL bytes".into()));
        }

        let pages: Vec<String> = split_pages(text)
            .iter()
            .map(|p| sanitize_text(p))
            .filter(|p| !p.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(PreProcessError::CorruptInput(
                "document contains no extractable text".into(),
            ));
        }

        let normalized_text = pages.join(PAGE_JOIN);

        let (detected_doc_type, confidence) = match declared_doc_type {
            Some(declared) => (Some(declared.to_owned()), 1.0),
            None => {
                let (guess, confidence) = classify(&normalized_text);
                (guess.map(str::to_owned), confidence)
            }
        };

        tracing::info!(
            pages = pages.len(),
            confidence,
            doc_type = detected_doc_type.as_deref().unwrap_or("unknown"),
            text_length = normalized_text.len(),
            "document normalized"
        );

        Ok(PreProcessResult {
            page_count: pages.len(),
            normalized_text,
            pages,
            confidence,
            detected_doc_type,
        })
    }
}
