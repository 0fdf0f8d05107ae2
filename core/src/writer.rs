use crate::error::StoreError;
use crate::lemmatizer::analyze_html;
use crate::store::Store;
use crate::{NewPage, Page, Site};
use std::sync::Arc;

/// Turns fetched HTML into a stored page with weighted postings.
#[derive(Clone)]
pub struct IndexWriter {
    store: Arc<dyn Store>,
}

impl IndexWriter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Store `content` at `path`, replacing any previous version of the page.
    /// Each posting's rank is the lemma's occurrence count in the visible text.
    pub fn index_page(
        &self,
        site: &Site,
        path: &str,
        code: u16,
        content: &str,
    ) -> Result<Page, StoreError> {
        let lemmas = analyze_html(content);
        let page = self.store.replace_page(
            NewPage { site_id: site.id, path, code, content },
            &lemmas,
        )?;
        self.store.touch_site(site.id)?;
        tracing::debug!(site = %site.url, path, lemmas = lemmas.len(), "page indexed");
        Ok(page)
    }

    /// Drop a stored page. Returns whether anything was removed.
    pub fn remove_page(&self, site: &Site, path: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete_page(site.id, path)?;
        if removed {
            self.store.touch_site(site.id)?;
            tracing::debug!(site = %site.url, path, "page removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn reindex_leaves_one_page_with_fresh_postings() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let writer = IndexWriter::new(store.clone());
        let site = store.begin_site("Docs", "https://docs.example").unwrap();

        writer.index_page(&site, "/guide", 200, "<body>borrow checker</body>").unwrap();
        let page = writer
            .index_page(&site, "/guide", 200, "<body>lifetimes lifetimes</body>")
            .unwrap();

        assert_eq!(store.count_pages(site.id).unwrap(), 1);
        assert!(store.lemma(site.id, "borrow").unwrap().is_none());
        let lifetime = store.lemma(site.id, "lifetim").unwrap().unwrap();
        let postings = store.postings_by_page(page.id).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].lemma_id, lifetime.id);
        assert_eq!(postings[0].rank, 2.0);
    }

    #[test]
    fn remove_page_reports_missing() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let writer = IndexWriter::new(store.clone());
        let site = store.begin_site("Docs", "https://docs.example").unwrap();
        writer.index_page(&site, "/", 200, "<body>home</body>").unwrap();

        assert!(writer.remove_page(&site, "/").unwrap());
        assert!(!writer.remove_page(&site, "/").unwrap());
        assert_eq!(store.count_lemmas(site.id).unwrap(), 0);
    }
}
