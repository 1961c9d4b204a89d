//! Evidence sanitization
//!
//! Evidence strings quote values taken from an untrusted device document.
//! Before they reach a report or a log line, control characters and
//! bidirectional overrides are escaped and the length is capped.
//! Sanitizing an already sanitized string returns it unchanged.

use cce_parser::config::compile_time::evidence::{
    MAX_EVIDENCE_CHARS, MAX_QUOTED_VALUE_CHARS, TRUNCATION_MARKER,
};

/// Escape and cap `input` at `MAX_EVIDENCE_CHARS`
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, MAX_EVIDENCE_CHARS)
}

pub fn sanitize_with_limit(input: &str, max_chars: usize) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() || is_bidi_control(c) => {
                escaped.push_str(&format!("\\u{{{:04x}}}", c as u32));
            }
            c => escaped.push(c),
        }
    }
    truncate(escaped, max_chars)
}

/// Sanitized value wrapped in single quotes, capped at `MAX_QUOTED_VALUE_CHARS`
pub fn quote(value: &str) -> String {
    format!("'{}'", sanitize_with_limit(value, MAX_QUOTED_VALUE_CHARS))
}

fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{061C}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
    )
}

fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let marker_chars = TRUNCATION_MARKER.chars().count();
    let keep = max_chars.saturating_sub(marker_chars);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controls_and_bidi_are_escaped() {
        let raw = "lan\nFAKE: compliant\u{1b}[31m\u{202e}txt";
        let clean = sanitize(raw);

        assert!(!clean.chars().any(|c| c.is_control()));
        assert!(clean.contains("\\n"));
        assert!(clean.contains("\\u{001b}"));
        assert!(clean.contains("\\u{202e}"));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = ["plain", "tab\there", "\u{2066}iso", &"x".repeat(10_000)];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_truncation_respects_limit() {
        let clean = sanitize_with_limit(&"a".repeat(100), 20);
        assert_eq!(clean.chars().count(), 20);
        assert!(clean.ends_with(TRUNCATION_MARKER));

        assert_eq!(sanitize_with_limit("short", 20), "short");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("wan"), "'wan'");
        assert_eq!(quote("a\nb"), "'a\\nb'");
    }
}
