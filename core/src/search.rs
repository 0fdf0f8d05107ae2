//! Ranked full-text search over the lemma index.

use crate::error::SearchError;
use crate::html::{title, visible_text};
use crate::lemmatizer::lemma_set;
use crate::snippet;
use crate::store::Store;
use crate::{normalize_site_url, Lemma, LemmaId, PageId, Site, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lemmas found on more than this share of a site's pages are ignored.
pub const COMMON_LEMMA_RATIO: f64 = 0.7;

pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// Base URL of one site; all sites when absent.
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize { DEFAULT_LIMIT }

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), site: None, offset: 0, limit: DEFAULT_LIMIT }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub site: String,
    pub site_name: String,
    pub uri: String,
    pub title: String,
    pub snippet: String,
    pub relevance: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Number of matching pages before pagination.
    pub count: usize,
    pub data: Vec<SearchHit>,
}

struct Candidate {
    page_id: PageId,
    site_id: SiteId,
    absolute: f32,
}

pub fn search(store: &dyn Store, request: &SearchRequest) -> Result<SearchResults, SearchError> {
    if request.query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let sites: Vec<Site> = match request.site.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => {
            let site = store
                .site_by_url(&normalize_site_url(url))?
                .ok_or_else(|| SearchError::UnknownSite(url.to_string()))?;
            vec![site]
        }
        None => store.sites()?,
    };

    let mut query_lemmas: Vec<String> = lemma_set(&request.query).into_iter().collect();
    query_lemmas.sort();

    let QueryRows { selected, present } = query_rows(store, &sites, &query_lemmas)?;
    let mut candidates = gather_candidates(store, &selected, &present)?;
    if candidates.is_empty() {
        tracing::debug!(query = %request.query, "no candidate pages");
        return Ok(SearchResults::default());
    }

    let max = candidates.iter().map(|c| c.absolute).fold(0.0f32, f32::max);
    // Stable: equal relevance keeps gathering order.
    candidates.sort_by(|a, b| b.absolute.partial_cmp(&a.absolute).unwrap_or(std::cmp::Ordering::Equal));

    let count = candidates.len();
    let sites_by_id: HashMap<SiteId, &Site> = sites.iter().map(|s| (s.id, s)).collect();
    let anchors: Vec<&str> = selected.iter().map(|l| l.text.as_str()).collect();
    let highlight: Vec<&str> = query_lemmas.iter().map(String::as_str).collect();

    let mut data = Vec::new();
    for candidate in candidates.iter().skip(request.offset).take(request.limit) {
        let Some(page) = store.page_by_id(candidate.page_id)? else { continue };
        let Some(site) = sites_by_id.get(&candidate.site_id) else { continue };
        let relevance = if max > 0.0 { candidate.absolute / max } else { 0.0 };
        let text = visible_text(&page.content);
        data.push(SearchHit {
            site: site.display_url().to_string(),
            site_name: site.name.clone(),
            uri: page.path.clone(),
            title: title(&page.content),
            snippet: snippet::build(&text, &anchors, &highlight),
            relevance,
        });
    }

    tracing::debug!(query = %request.query, count, returned = data.len(), "search finished");
    Ok(SearchResults { count, data })
}

/// Lemma rows of the query found in the searched sites.
struct QueryRows {
    /// Rows rare enough to discriminate, rarest first.
    selected: Vec<Lemma>,
    /// Every query row per site, common ones included.
    present: HashMap<SiteId, HashSet<LemmaId>>,
}

fn query_rows(store: &dyn Store, sites: &[Site], query_lemmas: &[String]) -> Result<QueryRows, SearchError> {
    let mut selected = Vec::new();
    let mut present: HashMap<SiteId, HashSet<LemmaId>> = HashMap::new();
    for site in sites {
        let pages = store.count_pages(site.id)?;
        let limit = pages as f64 * COMMON_LEMMA_RATIO;
        for text in query_lemmas {
            let Some(lemma) = store.lemma(site.id, text)? else { continue };
            present.entry(site.id).or_default().insert(lemma.id);
            if lemma.frequency as f64 > limit {
                tracing::trace!(lemma = %lemma.text, site = %site.url, "too common, skipped");
                continue;
            }
            selected.push(lemma);
        }
    }
    selected.sort_by_key(|l| l.frequency);
    Ok(QueryRows { selected, present })
}

/// Union of the pages posting any selected lemma, in first-seen order. A
/// page's absolute relevance sums the ranks of every query lemma it carries,
/// including the ones too common to select pages by.
fn gather_candidates(
    store: &dyn Store,
    selected: &[Lemma],
    present: &HashMap<SiteId, HashSet<LemmaId>>,
) -> Result<Vec<Candidate>, SearchError> {
    let mut order: Vec<Candidate> = Vec::new();
    let mut seen: HashSet<PageId> = HashSet::new();
    for lemma in selected {
        for posting in store.postings_by_lemma(lemma.id)? {
            if seen.insert(posting.page_id) {
                order.push(Candidate { page_id: posting.page_id, site_id: lemma.site_id, absolute: 0.0 });
            }
        }
    }

    for candidate in &mut order {
        let Some(rows) = present.get(&candidate.site_id) else { continue };
        candidate.absolute = store
            .postings_by_page(candidate.page_id)?
            .iter()
            .filter(|p| rows.contains(&p.lemma_id))
            .map(|p| p.rank)
            .sum();
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::writer::IndexWriter;
    use std::sync::Arc;

    /// Four pages so that a lemma on two of them stays under the common ratio.
    fn fixture() -> (Arc<dyn Store>, Site) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let writer = IndexWriter::new(store.clone());
        let site = store.begin_site("Rust Blog", "https://blog.example").unwrap();
        let pages = [
            ("/", "<title>Home</title><body>welcome reader</body>"),
            ("/async", "<title>Async</title><body>futures futures futures executor</body>"),
            ("/threads", "<title>Threads</title><body>threads futures executor</body>"),
            ("/misc", "<title>Misc</title><body>welcome notes</body>"),
        ];
        for (path, html) in pages {
            writer.index_page(&site, path, 200, html).unwrap();
        }
        (store, site)
    }

    #[test]
    fn blank_query_is_rejected() {
        let (store, _) = fixture();
        let err = search(store.as_ref(), &SearchRequest::new("   ")).unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
        assert!(err.is_user_error());
    }

    #[test]
    fn unknown_site_is_rejected() {
        let (store, _) = fixture();
        let mut request = SearchRequest::new("futures");
        request.site = Some("https://elsewhere.example".into());
        assert!(matches!(
            search(store.as_ref(), &request).unwrap_err(),
            SearchError::UnknownSite(_)
        ));
    }

    #[test]
    fn top_hit_has_relevance_one() {
        let (store, _) = fixture();
        let results = search(store.as_ref(), &SearchRequest::new("future executor")).unwrap();
        assert_eq!(results.count, 2);
        assert_eq!(results.data[0].uri, "/async");
        assert_eq!(results.data[0].relevance, 1.0);
        assert_eq!(results.data[1].uri, "/threads");
        assert!((results.data[1].relevance - 0.5).abs() < 1e-6);
        assert_eq!(results.data[0].site, "https://blog.example");
        assert_eq!(results.data[0].site_name, "Rust Blog");
        assert_eq!(results.data[0].title, "Async");
        assert_eq!(
            results.data[0].snippet,
            "<b>futures</b> <b>futures</b> <b>futures</b> <b>executor</b>"
        );
    }

    #[test]
    fn common_lemmas_yield_empty_success() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let writer = IndexWriter::new(store.clone());
        let site = store.begin_site("Tiny", "https://tiny.example").unwrap();
        writer.index_page(&site, "/", 200, "<body>everywhere</body>").unwrap();
        writer.index_page(&site, "/b", 200, "<body>everywhere</body>").unwrap();

        let results = search(store.as_ref(), &SearchRequest::new("everywhere")).unwrap();
        assert_eq!(results.count, 0);
        assert!(results.data.is_empty());
    }

    #[test]
    fn pagination_applies_after_ranking() {
        let (store, _) = fixture();
        let mut request = SearchRequest::new("futures executor");
        request.offset = 1;
        request.limit = 5;
        let results = search(store.as_ref(), &request).unwrap();
        assert_eq!(results.count, 2);
        assert_eq!(results.data.len(), 1);
        assert_eq!(results.data[0].uri, "/threads");

        request.offset = 0;
        request.limit = 0;
        let results = search(store.as_ref(), &request).unwrap();
        assert_eq!(results.count, 2);
        assert!(results.data.is_empty());
    }

    #[test]
    fn site_filter_accepts_url_without_slash() {
        let (store, site) = fixture();
        let mut request = SearchRequest::new("welcome");
        request.site = Some(site.display_url().to_string());
        let results = search(store.as_ref(), &request).unwrap();
        let uris: Vec<&str> = results.data.iter().map(|h| h.uri.as_str()).collect();
        assert_eq!(uris, vec!["/", "/misc"]);
        assert!(results.data.iter().all(|h| h.relevance == 1.0));
    }

    #[test]
    fn common_lemmas_still_weigh_in_relevance() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let writer = IndexWriter::new(store.clone());
        let site = store.begin_site("Plants", "https://plants.example").unwrap();
        let pages = [
            ("/a", "<body>orchid garden garden garden garden garden garden garden garden garden garden</body>"),
            ("/b", "<body>orchid orchid</body>"),
            ("/c", "<body>garden</body>"),
            ("/d", "<body>garden</body>"),
        ];
        for (path, html) in pages {
            writer.index_page(&site, path, 200, html).unwrap();
        }

        // "garden" is on 3 of 4 pages: it selects nothing but still counts.
        let results = search(store.as_ref(), &SearchRequest::new("orchid garden")).unwrap();
        assert_eq!(results.count, 2);
        assert_eq!(results.data[0].uri, "/a");
        assert_eq!(results.data[0].relevance, 1.0);
        assert_eq!(results.data[1].uri, "/b");
        assert!((results.data[1].relevance - 2.0 / 11.0).abs() < 1e-6);
    }
}
