//! # docflow-preprocess
//!
//! Normalizes raw document bytes into extractable text and pages before
//! any prompt is built. Binary formats are rejected up front, control
//! characters are stripped, and when the caller did not declare a doc
//! type a lightweight keyword classifier reports a best guess with a
//! confidence score. Low confidence is metadata for the layers above,
//! never an error.

pub mod classify;
pub mod error;
pub mod normalize;
mod processor;
pub mod types;

pub use error::PreProcessError;
pub use processor::PreProcessor;
pub use types::PreProcessResult;
