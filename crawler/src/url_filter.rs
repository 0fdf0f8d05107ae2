//! Decides which discovered links belong to a site and turns them into
//! site-relative paths.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

/// Scheme, host and port agree and the scheme is http(s).
pub fn same_origin(url: &Url, base: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.origin() == base.origin()
}

/// Path of `url` without query, `/` when empty.
pub fn relative_path(url: &Url) -> String {
    match url.path() {
        "" => "/".to_string(),
        p => p.to_string(),
    }
}

fn has_fragment_marker(raw: &str, url: &Url) -> bool {
    url.fragment().is_some() || raw.contains('#')
}

fn has_foreign_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, ext)) => !PAGE_EXTENSIONS.iter().any(|p| p.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Map a discovered absolute link to a path of the site at `base`, or reject
/// it. `raw` is the link as written, used to spot an empty `#`.
pub fn normalize_link(raw: &str, url: &Url, base: &Url) -> Option<String> {
    if !same_origin(url, base) {
        return None;
    }
    let path = relative_path(url);
    if has_fragment_marker(raw, url) || has_foreign_extension(&path) {
        return None;
    }
    Some(path)
}

/// Absolute `a[href]` targets of a page in document order, without duplicates.
/// Each item keeps the href as written next to the resolved URL.
pub fn outbound_links(html: &str, page_url: &Url) -> Vec<(String, Url)> {
    let doc = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("valid selector");
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for a in doc.select(&anchors) {
        let Some(href) = a.value().attr("href") else { continue };
        let href = href.trim();
        let Ok(url) = page_url.join(href) else { continue };
        if seen.insert(url.as_str().to_string()) {
            links.push((href.to_string(), url));
        }
    }
    links
}

/// Site paths a page links to, filtered and deduplicated.
pub fn child_paths(html: &str, page_url: &Url, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    outbound_links(html, page_url)
        .into_iter()
        .filter_map(|(raw, url)| normalize_link(&raw, &url, base))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://site.example/").unwrap()
    }

    fn check(link: &str) -> Option<String> {
        let url = base().join(link).unwrap();
        normalize_link(link, &url, &base())
    }

    #[test]
    fn query_is_dropped_and_root_defaults() {
        assert_eq!(check("https://site.example/docs?page=2"), Some("/docs".into()));
        assert_eq!(check("https://site.example"), Some("/".into()));
        assert_eq!(check("/guide/intro.HTML"), Some("/guide/intro.HTML".into()));
    }

    #[test]
    fn foreign_origins_are_rejected() {
        assert_eq!(check("https://other.example/docs"), None);
        assert_eq!(check("http://site.example/docs"), None);
        assert_eq!(check("https://site.example:8443/docs"), None);
        assert_eq!(check("mailto:someone@site.example"), None);
    }

    #[test]
    fn fragments_and_files_are_rejected() {
        assert_eq!(check("/docs#install"), None);
        assert_eq!(check("/docs#"), None);
        assert_eq!(check("/files/report.pdf"), None);
        assert_eq!(check("/img/logo.png"), None);
        assert_eq!(check("/v1.2/"), Some("/v1.2/".into()));
    }

    #[test]
    fn links_keep_document_order_without_duplicates() {
        let html = r#"<body>
            <a href="/b">b</a><a href="https://site.example/a">a</a>
            <a href="/b">again</a><a>no href</a><a href="c">relative</a>
        </body>"#;
        let page = Url::parse("https://site.example/dir/page").unwrap();
        let urls: Vec<String> = outbound_links(html, &page).into_iter().map(|(_, u)| u.to_string()).collect();
        assert_eq!(
            urls,
            vec!["https://site.example/b", "https://site.example/a", "https://site.example/dir/c"]
        );
    }

    #[test]
    fn child_paths_filter_and_dedup() {
        let html = r##"<a href="/x?q=1">x</a><a href="/x?q=2">x</a><a href="#top">top</a>
            <a href="https://elsewhere.example/">out</a><a href="/y.zip">zip</a>"##;
        assert_eq!(child_paths(html, &base(), &base()), vec!["/x".to_string()]);
    }
}
