//! Plain-text views of stored HTML.

use scraper::{Html, Node, Selector};

const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Visible text of a document: text nodes under `<body>` (or the whole
/// document when there is none), skipping script-like elements, with
/// whitespace collapsed to single spaces.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body = selector("body");
    let root = doc.select(&body).next().unwrap_or_else(|| doc.root_element());

    let mut out = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => SKIPPED.contains(&el.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// First `<title>`, falling back to the first `<h1>`.
pub fn title(html: &str) -> String {
    let doc = Html::parse_document(html);
    for css in ["title", "h1"] {
        let sel = selector(css);
        if let Some(el) = doc.select(&sel).next() {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_title_element() {
        let html = "<html><head><title> Home  page </title></head><body><h1>Welcome</h1></body></html>";
        assert_eq!(title(html), "Home page");
    }

    #[test]
    fn title_falls_back_to_heading() {
        assert_eq!(title("<body><h1>Welcome <em>back</em></h1></body>"), "Welcome back");
        assert_eq!(title("<p>no headings</p>"), "");
    }

    #[test]
    fn text_is_collapsed() {
        let html = "<body><div>one\n\n   two</div><p>three</p></body>";
        assert_eq!(visible_text(html), "one two three");
    }
}
