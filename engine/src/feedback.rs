//! Feedback blocks appended to the corrective re-prompt.
//!
//! The block gives the model everything it needs in one shot: every
//! violation with its instance path, the expected schema, and its own
//! submission echoed back for comparison.

use serde_json::Value;

use crate::validate::Violation;

/// Feedback for a submission that parsed but violated the schema.
#[must_use]
pub fn build_validation_feedback(
    schema: &Value,
    submitted: &Value,
    violations: &[Violation],
) -> String {
    let mut feedback =
        String::from("Your previous response failed validation against the expected schema.\n\n");

    feedback.push_str("Errors:\n");
    for violation in violations {
        feedback.push_str("  - ");
        feedback.push_str(&violation.describe());
        feedback.push('\n');
    }

    feedback.push_str("\nExpected schema:\n");
    feedback.push_str(&pretty(schema));

    feedback.push_str("\n\nYour submission:\n");
    feedback.push_str(&pretty(submitted));

    feedback.push_str("\n\nFix every error and respond with the corrected JSON only.");
    feedback
}

/// Feedback for a submission that was not parseable JSON at all.
#[must_use]
pub fn build_parse_error_feedback(schema: &Value, violations: &[Violation]) -> String {
    let mut feedback = String::from("Your previous response could not be parsed as JSON.\n\n");

    for violation in violations {
        feedback.push_str("Parse error: ");
        feedback.push_str(&violation.message);
        feedback.push('\n');
    }

    feedback.push_str("\nExpected schema:\n");
    feedback.push_str(&pretty(schema));

    feedback.push_str("\n\nRespond with valid JSON matching the schema above, and nothing else.");
    feedback
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
