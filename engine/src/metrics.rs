//! Attempt accounting across a fallback run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics accumulated over every attempt of one extraction request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMetrics {
    /// Attempts made, across all steps, including retries and the
    /// corrective re-prompt.
    pub total_attempts: u32,
    /// Distinct chain steps that saw at least one attempt.
    pub steps_tried: u32,
    /// Wall-clock time from the first attempt to the terminal state.
    pub wall_time: Duration,
    /// Estimated prompt tokens sent, summed over attempts.
    pub estimated_input_tokens: usize,
    /// Estimated completion tokens received, summed over attempts.
    pub estimated_output_tokens: usize,
}

/// Estimate token count with the 4-chars-per-token heuristic.
///
/// Counts chars, not bytes, so multi-byte text is not overestimated;
/// ceiling division avoids underestimation.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
