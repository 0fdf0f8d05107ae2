use search_core::html::visible_text;
use search_core::lemmatizer::{analyze, analyze_html, lemma_set};

#[test]
fn it_lowercases_and_stems() {
    let counts = analyze("Running Runners RUN! The café's menu.");
    // Stemming folds the forms of "run"
    assert_eq!(counts.get("run"), Some(&2));
    assert!(counts.contains_key("runner"));
    assert!(!counts.keys().any(|k| k.chars().any(char::is_uppercase)));
}

#[test]
fn it_filters_function_words() {
    let lemmas = lemma_set("The quick brown fox and the lazy dog");
    assert!(!lemmas.contains("the"));
    assert!(!lemmas.contains("and"));
    assert!(lemmas.contains("fox"));
}

#[test]
fn it_filters_russian_function_words() {
    let lemmas = lemma_set("Кошки и собаки, ах, не бегают по двору");
    for skipped in ["и", "ах", "не", "по"] {
        assert!(!lemmas.contains(skipped), "{skipped} should be dropped");
    }
    assert_eq!(lemmas.len(), 4);
}

#[test]
fn query_and_page_share_lemmas() {
    let page = analyze_html("<html><body><p>Search engines index pages</p></body></html>");
    let query = lemma_set("indexing engine");
    for lemma in &query {
        assert!(page.contains_key(lemma), "{lemma} missing from page lemmas");
    }
}

#[test]
fn markup_is_not_indexed() {
    let html = "<html><head><style>p { color: red }</style></head>\
                <body><script>var hidden = 1;</script><p class=\"note\">Visible words</p></body></html>";
    let text = visible_text(html);
    assert_eq!(text, "Visible words");
    let counts = analyze_html(html);
    assert!(!counts.contains_key("color"));
    assert!(!counts.contains_key("note"));
    assert!(!counts.contains_key("hidden"));
}
