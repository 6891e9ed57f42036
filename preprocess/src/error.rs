//! Preprocessing failures. Both are fatal for the request and surface
//! before any provider call is made.

use thiserror::Error;

/// Why a document could not be normalized.
#[derive(Debug, Clone, Error)]
pub enum PreProcessError {
    /// The bytes are a recognized binary format this build cannot extract.
    #[error("unsupported document format: {format}")]
    UnsupportedFormat {
        /// Short name of the detected format (e.g. `pdf`, `png`).
        format: String,
    },

    /// The bytes are not decodable as a text document.
    #[error("corrupt input: {0}")]
    CorruptInput(String),
}

impl PreProcessError {
    /// Stable machine-readable code for audit rows and API errors.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::CorruptInput(_) => "CORRUPT_INPUT",
        }
    }
}
