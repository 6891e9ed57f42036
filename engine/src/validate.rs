//! Schema validation of raw model output.
//!
//! A parse failure is itself a validation failure (`MALFORMED_OUTPUT`);
//! schema checking collects every violation, not just the first, so a
//! single corrective re-prompt can fix them all at once.

use serde_json::Value;
use thiserror::Error;

/// Error code for output that was not parseable JSON at all.
pub const MALFORMED_OUTPUT: &str = "MALFORMED_OUTPUT";
/// Error code for parseable output that violates the doc-type schema.
pub const SCHEMA_VIOLATION: &str = "SCHEMA_VIOLATION";

/// The doc-type schema failed to compile.
#[derive(Debug, Clone, Error)]
#[error("schema failed to compile: {0}")]
pub struct SchemaError(pub String);

/// One violation found in a candidate output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Instance path inside the submitted JSON (empty for parse errors).
    pub path: String,
    /// `MALFORMED_OUTPUT` or `SCHEMA_VIOLATION`.
    pub code: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl Violation {
    /// Formats the violation the way the corrective feedback lists it.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.path.is_empty() {
            self.message.clone()
        } else {
            format!("At path '{}': {}", self.path, self.message)
        }
    }
}

/// Result of validating one raw output.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// The parsed JSON, when parsing succeeded.
    pub parsed: Option<Value>,
    /// Every violation found. Empty means valid.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Whether the output parsed and satisfied the schema.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty() && self.parsed.is_some()
    }

    /// The audit error code for this report, when invalid.
    #[must_use]
    pub fn error_code(&self) -> Option<&'static str> {
        self.violations.first().map(|v| v.code)
    }
}

/// Compiled doc-type schema, built once per request.
pub struct SchemaValidator {
    schema: Value,
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compiles the schema.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] when the schema document itself is invalid: a
    /// configuration fault, surfaced before any provider call.
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let compiled =
            jsonschema::Validator::new(schema).map_err(|e| SchemaError(e.to_string()))?;
        Ok(Self {
            schema: schema.clone(),
            compiled,
        })
    }

    /// The schema document, for feedback rendering.
    #[must_use]
    pub const fn schema(&self) -> &Value {
        &self.schema
    }

    /// Parses and validates one raw model output.
    #[must_use]
    pub fn validate(&self, raw_text: &str) -> ValidationReport {
        let candidate = strip_code_fence(raw_text);

        let parsed = match serde_json::from_str::<Value>(candidate) {
            Ok(value) => value,
            Err(e) => {
                return ValidationReport {
                    parsed: None,
                    violations: vec![Violation {
                        path: String::new(),
                        code: MALFORMED_OUTPUT,
                        message: format!("output is not valid JSON: {e}"),
                    }],
                };
            }
        };

        let violations: Vec<Violation> = self
            .compiled
            .iter_errors(&parsed)
            .map(|error| Violation {
                path: error.instance_path.to_string(),
                code: SCHEMA_VIOLATION,
                message: error.to_string(),
            })
            .collect();

        ValidationReport {
            parsed: Some(parsed),
            violations,
        }
    }
}

/// Strips a surrounding markdown code fence, which chat models love to
/// wrap JSON in even when told not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    match body.split_once('\n') {
        Some((first, remainder)) if !first.trim_start().starts_with(['{', '[']) => remainder.trim(),
        _ => body.trim(),
    }
}
