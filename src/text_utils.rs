//! Narration text cleanup before it is sent to the speech service.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link regex"));
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*{1,3}|_{2,3}|`+)").expect("valid emphasis regex"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Normalize text for speech: NFKC, strip light markdown, collapse whitespace.
pub fn normalize_narration(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    let unlinked = MARKDOWN_LINK.replace_all(&folded, "$1");
    let plain = EMPHASIS.replace_all(&unlinked, "");
    WHITESPACE.replace_all(&plain, " ").trim().to_string()
}

/// Join narration fragments into one script, ending each with punctuation so the
/// synthesizer pauses between them.
pub fn join_sentences<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut script = String::new();
    for part in parts {
        let part = normalize_narration(part);
        if part.is_empty() {
            continue;
        }
        if !script.is_empty() {
            script.push(' ');
        }
        script.push_str(&part);
        if !part.ends_with(['.', '!', '?', ':', ';']) {
            script.push('.');
        }
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_and_collapses_whitespace() {
        let text = "  **Breaking**:\n\n a [claim](https://example.com) was  `checked`  ";
        assert_eq!(normalize_narration(text), "Breaking: a claim was checked");
    }

    #[test]
    fn folds_compatibility_characters() {
        assert_eq!(normalize_narration("ﬁrst\u{00A0}step"), "first step");
    }

    #[test]
    fn join_adds_terminal_punctuation() {
        let script = join_sentences(["Election night", "", "Results came in!"]);
        assert_eq!(script, "Election night. Results came in!");
    }
}
