//! Commit-time validation of user text.
//!
//! Note text is sanitized only when an edit is committed, never while the
//! edit buffer is live. Oversized text is truncated, never rejected.

#[cfg(test)]
#[path = "text_test.rs"]
mod text_test;

use std::sync::OnceLock;

use regex::Regex;

use crate::consts::{BOARD_ID_MAX_LENGTH, BOARD_ID_MIN_LENGTH, NOTE_TEXT_MAX_LENGTH};

/// Markup and script fragments removed before escaping.
const DANGEROUS_PATTERNS: &[&str] = &[
    r"(?i)<\s*/?\s*script[^>]*>",
    r"(?i)javascript\s*:",
    r"(?i)\bon\w+\s*=",
    r"(?i)data:text/html",
    r"(?i)<\s*iframe[^>]*>",
    r"(?i)<\s*object[^>]*>",
    r"(?i)<\s*embed[^>]*>",
    r"(?i)<\s*link[^>]*>",
    r"(?i)<\s*meta[^>]*>",
    r"(?i)expression\s*\(",
    r"(?i)<\s*img[^>]*src[^>]*=[^>]*>",
];

fn dangerous_patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        DANGEROUS_PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(%pattern, error = %e, "skipping invalid sanitizer pattern");
                    None
                }
            })
            .collect()
    })
}

/// Strip dangerous fragments, then entity-escape `& < > " ' /`.
#[must_use]
pub fn sanitize_input(input: &str) -> String {
    let mut stripped = input.to_owned();
    for re in dangerous_patterns() {
        stripped = re.replace_all(&stripped, "").into_owned();
    }

    let mut escaped = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Result of validating an edit buffer for commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    /// Whether the sanitized text exceeded the length limit and was cut.
    pub truncated: bool,
}

/// Sanitize `buffer` and cut it to `NOTE_TEXT_MAX_LENGTH` characters without
/// splitting an entity.
#[must_use]
pub fn sanitize_note_text(buffer: &str) -> Sanitized {
    let text = sanitize_input(buffer);
    let Some((cut, _)) = text.char_indices().nth(NOTE_TEXT_MAX_LENGTH) else {
        return Sanitized { text, truncated: false };
    };

    let mut head = &text[..cut];
    if let Some(amp) = head.rfind('&') {
        if !head[amp..].contains(';') {
            head = &head[..amp];
        }
    }
    tracing::warn!(len = text.chars().count(), kept = head.chars().count(), "note text truncated");
    Sanitized { text: head.to_owned(), truncated: true }
}

/// Entities produced by [`sanitize_input`], with the character each stands for.
const ESCAPES: [(&str, char); 6] =
    [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"'), ("&#x27;", '\''), ("&#x2F;", '/')];

/// Turn committed text back into what the user typed, for seeding the editor.
/// Single pass, so `&amp;lt;` decodes to `&lt;`, not `<`.
#[must_use]
pub fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match ESCAPES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render escaped newline sequences as real newlines and drop stray backslashes.
#[must_use]
pub fn format_note_text(text: &str) -> String {
    text.replace("\\\\n", "\n").replace("\\n", "\n").replace('\\', "")
}

/// Board ids are 8 to 36 characters of `[A-Za-z0-9_-]`.
#[must_use]
pub fn validate_board_id(id: &str) -> bool {
    (BOARD_ID_MIN_LENGTH..=BOARD_ID_MAX_LENGTH).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
