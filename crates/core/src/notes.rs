//! Speaker-notes cleanup before speech synthesis.
//!
//! Notes come out of the deck with editor artifacts: mixed line endings,
//! runs of tabs and spaces, blank paragraphs, vertical tabs used as soft
//! line breaks. Punctuation is kept because the speech engine relies on it
//! for pauses and intonation.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple whitespace characters into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Characters PowerPoint uses for soft line breaks inside a paragraph.
const SOFT_BREAK_CHARS: &[char] = &['\u{b}', '\u{2028}', '\u{2029}'];

/// Normalizer that turns raw speaker notes into speakable text.
///
/// Paragraph breaks are kept as newlines.
#[derive(Debug, Clone, Default)]
pub struct NotesNormalizer;

impl NotesNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize notes text.
    ///
    /// Returns `None` when nothing speakable remains, so whitespace-only notes
    /// are treated the same as a slide without notes.
    pub fn normalize(&self, text: &str) -> Option<String> {
        let unified: String = text
            .nfc()
            .map(|c| if SOFT_BREAK_CHARS.contains(&c) { '\n' } else { c })
            .filter(|c| *c == '\n' || *c == '\r' || *c == '\t' || !c.is_control())
            .collect();

        let unified = unified.replace("\r\n", "\n").replace('\r', "\n");

        let lines: Vec<String> = unified
            .lines()
            .map(|line| WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if lines.is_empty() {
            return None;
        }

        Some(lines.join("\n"))
    }

    /// Normalize an optional notes value, as read from the deck.
    pub fn normalize_opt(&self, text: Option<&str>) -> Option<String> {
        text.and_then(|t| self.normalize(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_punctuation() {
        let normalizer = NotesNormalizer::new();
        assert_eq!(
            normalizer.normalize("Hello, world! Isn't this fun?").as_deref(),
            Some("Hello, world! Isn't this fun?")
        );
    }

    #[test]
    fn test_collapses_whitespace_runs() {
        let normalizer = NotesNormalizer::new();
        assert_eq!(
            normalizer.normalize("  one \t two\u{a0}\u{a0}three  ").as_deref(),
            Some("one two three")
        );
    }

    #[test]
    fn test_drops_blank_paragraphs() {
        let normalizer = NotesNormalizer::new();
        assert_eq!(
            normalizer.normalize("First\r\n\r\n   \nSecond\rThird").as_deref(),
            Some("First\nSecond\nThird")
        );
    }

    #[test]
    fn test_soft_breaks_become_newlines() {
        let normalizer = NotesNormalizer::new();
        assert_eq!(
            normalizer.normalize("line one\u{b}line two").as_deref(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn test_whitespace_only_is_none() {
        let normalizer = NotesNormalizer::new();
        assert_eq!(normalizer.normalize(""), None);
        assert_eq!(normalizer.normalize(" \n\t\r\n "), None);
        assert_eq!(normalizer.normalize_opt(None), None);
        assert_eq!(normalizer.normalize_opt(Some("\u{b}")), None);
    }

    #[test]
    fn test_unicode_composed() {
        let normalizer = NotesNormalizer::new();
        // "e" + combining acute accent composes to a single code point
        assert_eq!(
            normalizer.normalize("cafe\u{301}").as_deref(),
            Some("caf\u{e9}")
        );
    }
}
