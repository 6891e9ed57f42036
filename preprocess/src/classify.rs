//! Keyword-heuristic doc-type classification.
//!
//! Deliberately lightweight: the goal is a best-guess slug plus an honest
//! confidence score, not a classifier. Anything smarter belongs in a
//! dedicated model upstream; a wrong low-confidence guess here only
//! changes which prompt template the engine starts from.

/// Keyword evidence per known doc-type slug.
const DOC_TYPE_PATTERNS: &[(&str, &[&str])] = &[
    (
        "LAB_REPORT",
        &[
            "laboratory",
            "lab report",
            "reference range",
            "specimen",
            "mmol/l",
            "mg/dl",
            "hemoglobin",
            "creatinine",
            "glucose",
            "potassium",
            "white blood cell",
        ],
    ),
    (
        "INTAKE_FORM",
        &[
            "intake",
            "patient information",
            "date of birth",
            "emergency contact",
            "insurance",
            "medical history",
            "current medications",
            "reason for visit",
            "consent",
        ],
    ),
    (
        "ADVERSE_EVENT_REPORT",
        &[
            "adverse event",
            "adverse reaction",
            "side effect",
            "onset",
            "severity",
            "causality",
            "outcome",
            "suspect drug",
            "dechallenge",
            "rechallenge",
        ],
    ),
];

/// Scores the text against every known doc type.
///
/// Returns the winning slug and a confidence in `[0.0, 0.9]`; more
/// distinct keyword hits mean higher confidence, saturating well below
/// 1.0; only a caller-declared type earns full confidence.
#[must_use]
pub fn classify(text: &str) -> (Option<&'static str>, f32) {
    let lower = text.to_lowercase();

    let mut best: Option<(&'static str, usize)> = None;
    for (slug, patterns) in DOC_TYPE_PATTERNS {
        let hits = patterns.iter().filter(|p| lower.contains(*p)).count();
        if hits > 0 && best.map_or(true, |(_, prev)| hits > prev) {
            best = Some((slug, hits));
        }
    }

    match best {
        Some((slug, hits)) => {
            #[allow(clippy::cast_precision_loss)]
            let confidence = (hits as f32 / (hits as f32 + 2.0)).min(0.9);
            (Some(slug), confidence)
        }
        None => (None, 0.0),
    }
}
