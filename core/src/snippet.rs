//! Result snippets: a window of page text around the first matched lemma
//! with every word of a query lemma highlighted.

use crate::lemmatizer::{lemma_of, word_spans};

pub const CHARS_BEFORE: usize = 50;
pub const CHARS_AFTER: usize = 100;
pub const FALLBACK_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

/// Byte offset of the first word of `text` whose lemma is `lemma`.
fn first_occurrence(text: &str, lemma: &str) -> Option<usize> {
    word_spans(text)
        .find(|&(start, end)| lemma_of(&text[start..end]).as_deref() == Some(lemma))
        .map(|(start, _)| start)
}

/// Build a snippet of `text`.
///
/// `anchors` are lemmas tried in order; the first one occurring in the text
/// places the window from `CHARS_BEFORE` characters before to `CHARS_AFTER`
/// characters after that word. Without any occurrence the first
/// `FALLBACK_CHARS` characters are used. Words of the window whose lemma is
/// in `highlight` are wrapped in `<b>`.
pub fn build(text: &str, anchors: &[&str], highlight: &[&str]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let anchor = anchors
        .iter()
        .find_map(|lemma| first_occurrence(text, lemma))
        .map(|byte| text[..byte].chars().count());

    let (start, end) = match anchor {
        Some(at) => (at.saturating_sub(CHARS_BEFORE), (at + CHARS_AFTER).min(chars.len())),
        None => (0, FALLBACK_CHARS.min(chars.len())),
    };
    let window: String = chars[start..end].iter().collect();

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&highlight_terms(&window, highlight));
    if end < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Wrap every word of `snippet` whose lemma is one of `lemmas` in `<b>`.
pub fn highlight_terms(snippet: &str, lemmas: &[&str]) -> String {
    if lemmas.is_empty() {
        return snippet.to_string();
    }
    let mut out = String::with_capacity(snippet.len());
    let mut last = 0;
    for (start, end) in word_spans(snippet) {
        let word = &snippet[start..end];
        let Some(lemma) = lemma_of(word) else { continue };
        if lemmas.contains(&lemma.as_str()) {
            out.push_str(&snippet[last..start]);
            out.push_str("<b>");
            out.push_str(word);
            out.push_str("</b>");
            last = end;
        }
    }
    out.push_str(&snippet[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_surrounds_first_match() {
        let text = format!("{} Rust here {}", "x".repeat(79), "y".repeat(149));
        let snippet = build(&text, &["rust"], &["rust"]);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("<b>Rust</b> here"));
        let visible = snippet.replace("<b>", "").replace("</b>", "");
        assert_eq!(visible.chars().count(), CHARS_BEFORE + CHARS_AFTER + 2 * ELLIPSIS.len());
    }

    #[test]
    fn no_match_takes_leading_text() {
        let text = "z".repeat(300);
        let snippet = build(&text, &["rust"], &["rust"]);
        assert_eq!(snippet, format!("{}...", "z".repeat(FALLBACK_CHARS)));
        assert_eq!(build("short text", &["rust"], &["rust"]), "short text");
    }

    #[test]
    fn anchors_are_tried_in_order() {
        let text = format!("alpha {} omega", "-".repeat(200));
        let snippet = build(&text, &["omega", "alpha"], &["omega", "alpha"]);
        assert!(snippet.ends_with("<b>omega</b>"));
        assert!(!snippet.contains("alpha"));
    }

    #[test]
    fn whole_word_forms_are_highlighted() {
        let out = highlight_terms("Indexes, index and INDEXING", &["index"]);
        assert_eq!(out, "<b>Indexes</b>, <b>index</b> and <b>INDEXING</b>");
        assert_eq!(highlight_terms("reindex", &["index"]), "reindex");
    }

    #[test]
    fn multibyte_text_is_cut_on_characters() {
        let text = format!("{} поиска {}", "ж".repeat(60), "ш".repeat(120));
        let snippet = build(&text, &["поиск"], &["поиск"]);
        assert!(snippet.contains("<b>поиска</b>"));
        assert!(snippet.starts_with("...ж"));
    }
}
