use crate::error::StoreError;
use crate::{Lemma, LemmaId, NewPage, Page, PageId, Posting, Site, SiteId, SiteStatus};
use std::collections::HashMap;

/// Logical storage of sites, pages, lemmas and postings.
///
/// Multi-row changes (`replace_page`, `delete_page`, `begin_site`) are atomic:
/// readers never observe a page without its postings or a lemma frequency
/// that disagrees with the postings referencing it.
pub trait Store: Send + Sync {
    /// Create or reuse the site row for a fresh crawl: status becomes
    /// INDEXING, the last error is cleared and all of the site's pages,
    /// lemmas and postings are dropped.
    fn begin_site(&self, name: &str, url: &str) -> Result<Site, StoreError>;

    /// Find the site by URL or create it with status INDEXING. The flag tells
    /// whether the row was created by this call.
    fn ensure_site(&self, name: &str, url: &str) -> Result<(Site, bool), StoreError>;

    fn site(&self, id: SiteId) -> Result<Option<Site>, StoreError>;
    fn site_by_url(&self, url: &str) -> Result<Option<Site>, StoreError>;
    fn sites(&self) -> Result<Vec<Site>, StoreError>;

    /// Bump the site's status time.
    fn touch_site(&self, id: SiteId) -> Result<(), StoreError>;

    /// Move a site out of INDEXING. Returns false, changing nothing, when the
    /// site is not currently INDEXING.
    fn finish_site(
        &self,
        id: SiteId,
        status: SiteStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError>;

    fn page(&self, site_id: SiteId, path: &str) -> Result<Option<Page>, StoreError>;
    fn page_by_id(&self, id: PageId) -> Result<Option<Page>, StoreError>;
    fn count_pages(&self, site_id: SiteId) -> Result<usize, StoreError>;

    fn lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>, StoreError>;
    fn count_lemmas(&self, site_id: SiteId) -> Result<usize, StoreError>;

    /// Postings of a lemma, ordered by page id.
    fn postings_by_lemma(&self, lemma_id: LemmaId) -> Result<Vec<Posting>, StoreError>;
    fn postings_by_page(&self, page_id: PageId) -> Result<Vec<Posting>, StoreError>;

    /// Insert a page with one posting per lemma (rank = count), replacing any
    /// page already stored at the same path. Lemma frequencies of the old page
    /// are decremented before those of the new page are incremented.
    fn replace_page(
        &self,
        page: NewPage<'_>,
        lemmas: &HashMap<String, u32>,
    ) -> Result<Page, StoreError>;

    /// Remove a page and its postings, decrementing lemma frequencies.
    fn delete_page(&self, site_id: SiteId, path: &str) -> Result<bool, StoreError>;

    /// Make the current state durable, if the store is backed by disk.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
