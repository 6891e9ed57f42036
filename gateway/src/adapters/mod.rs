//! Concrete provider adapters.
//!
//! Each adapter owns its wire format and its deviation from plain HTTP
//! error semantics; everything else (timeout enforcement, credential
//! resolution, error normalization) lives in the gateway.

mod anthropic;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;

/// Truncate a response body for error messages. Provider error bodies can
/// embed the full prompt; audit rows only need the leading diagnostic.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_body;

    #[test]
    fn truncates_long_bodies() {
        let long = "x".repeat(2000);
        let short = truncate_body(&long);
        assert!(short.len() <= 504);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn respects_utf8_boundaries() {
        let s = "é".repeat(400);
        let t = truncate_body(&s);
        assert!(t.ends_with("..."));
    }
}
