//! In-memory [`Store`] with optional snapshot files on disk.

use crate::error::StoreError;
use crate::persist::{load_snapshot, save_snapshot, snapshot_exists, IndexPaths};
use crate::store::Store;
use crate::{
    normalize_site_url, now_millis, Lemma, LemmaId, NewPage, Page, PageId, Posting, PostingId,
    Site, SiteId, SiteStatus,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// All rows plus the secondary indexes over them.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Tables {
    sites: BTreeMap<SiteId, Site>,
    pages: BTreeMap<PageId, Page>,
    page_index: HashMap<(SiteId, String), PageId>,
    lemmas: BTreeMap<LemmaId, Lemma>,
    lemma_index: HashMap<(SiteId, String), LemmaId>,
    postings: BTreeMap<PostingId, Posting>,
    page_postings: HashMap<PageId, Vec<PostingId>>,
    lemma_postings: HashMap<LemmaId, BTreeSet<PostingId>>,
    next_site: SiteId,
    next_page: PageId,
    next_lemma: LemmaId,
    next_posting: PostingId,
}

impl Tables {
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn lemma_count(&self) -> usize {
        self.lemmas.len()
    }

    fn site_mut(&mut self, id: SiteId) -> Result<&mut Site, StoreError> {
        self.sites.get_mut(&id).ok_or(StoreError::SiteNotFound(id))
    }

    fn site_id_by_url(&self, url: &str) -> Option<SiteId> {
        self.sites.values().find(|s| s.url == url).map(|s| s.id)
    }

    fn insert_site(&mut self, name: &str, url: String) -> SiteId {
        self.next_site += 1;
        let id = self.next_site;
        self.sites.insert(
            id,
            Site {
                id,
                name: name.to_string(),
                url,
                status: SiteStatus::Indexing,
                status_time: now_millis(),
                last_error: None,
            },
        );
        id
    }

    /// Drop a page, its postings, and one unit of frequency from every lemma
    /// it contributed. Lemmas left with no pages are deleted.
    fn remove_page(&mut self, page_id: PageId) -> Option<Page> {
        let page = self.pages.remove(&page_id)?;
        self.page_index.remove(&(page.site_id, page.path.clone()));
        for posting_id in self.page_postings.remove(&page_id).unwrap_or_default() {
            let Some(posting) = self.postings.remove(&posting_id) else { continue };
            if let Some(ids) = self.lemma_postings.get_mut(&posting.lemma_id) {
                ids.remove(&posting_id);
            }
            let emptied = match self.lemmas.get_mut(&posting.lemma_id) {
                Some(lemma) => {
                    lemma.frequency = lemma.frequency.saturating_sub(1);
                    lemma.frequency == 0
                }
                None => false,
            };
            if emptied {
                if let Some(lemma) = self.lemmas.remove(&posting.lemma_id) {
                    self.lemma_index.remove(&(lemma.site_id, lemma.text));
                }
                self.lemma_postings.remove(&posting.lemma_id);
            }
        }
        Some(page)
    }

    /// Create the lemma with frequency 1 or count one more page for it.
    fn upsert_lemma(&mut self, site_id: SiteId, text: &str) -> LemmaId {
        let key = (site_id, text.to_string());
        if let Some(&id) = self.lemma_index.get(&key) {
            if let Some(lemma) = self.lemmas.get_mut(&id) {
                lemma.frequency += 1;
            }
            return id;
        }
        self.next_lemma += 1;
        let id = self.next_lemma;
        self.lemmas.insert(
            id,
            Lemma { id, site_id, text: text.to_string(), frequency: 1 },
        );
        self.lemma_index.insert(key, id);
        id
    }

    fn insert_posting(&mut self, page_id: PageId, lemma_id: LemmaId, rank: f32) {
        self.next_posting += 1;
        let id = self.next_posting;
        self.postings.insert(id, Posting { id, page_id, lemma_id, rank });
        self.page_postings.entry(page_id).or_default().push(id);
        self.lemma_postings.entry(lemma_id).or_default().insert(id);
    }

    fn clear_site(&mut self, site_id: SiteId) {
        let pages: Vec<PageId> = self
            .pages
            .values()
            .filter(|p| p.site_id == site_id)
            .map(|p| p.id)
            .collect();
        for id in pages {
            self.remove_page(id);
        }
    }
}

/// Store keeping every table in memory behind one lock. When opened on a
/// directory, `flush` writes a snapshot that the next `open` loads back.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    paths: Option<IndexPaths>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted under `root`, loading the previous snapshot if any.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let paths = IndexPaths::new(root);
        let tables = if snapshot_exists(&paths) {
            let tables = load_snapshot(&paths)?;
            tracing::info!(
                root = %paths.root.display(),
                sites = tables.site_count(),
                pages = tables.page_count(),
                "loaded index snapshot"
            );
            tables
        } else {
            Tables::default()
        };
        Ok(Self { tables: RwLock::new(tables), paths: Some(paths) })
    }
}

impl Store for MemoryStore {
    fn begin_site(&self, name: &str, url: &str) -> Result<Site, StoreError> {
        let url = normalize_site_url(url);
        let mut t = self.tables.write();
        let id = match t.site_id_by_url(&url) {
            Some(id) => {
                t.clear_site(id);
                id
            }
            None => t.insert_site(name, url),
        };
        let site = t.site_mut(id)?;
        site.name = name.to_string();
        site.status = SiteStatus::Indexing;
        site.status_time = now_millis();
        site.last_error = None;
        Ok(site.clone())
    }

    fn ensure_site(&self, name: &str, url: &str) -> Result<(Site, bool), StoreError> {
        let url = normalize_site_url(url);
        let mut t = self.tables.write();
        if let Some(id) = t.site_id_by_url(&url) {
            return Ok((t.site_mut(id)?.clone(), false));
        }
        let id = t.insert_site(name, url);
        Ok((t.site_mut(id)?.clone(), true))
    }

    fn site(&self, id: SiteId) -> Result<Option<Site>, StoreError> {
        Ok(self.tables.read().sites.get(&id).cloned())
    }

    fn site_by_url(&self, url: &str) -> Result<Option<Site>, StoreError> {
        let url = normalize_site_url(url);
        let t = self.tables.read();
        Ok(t.site_id_by_url(&url).and_then(|id| t.sites.get(&id).cloned()))
    }

    fn sites(&self) -> Result<Vec<Site>, StoreError> {
        Ok(self.tables.read().sites.values().cloned().collect())
    }

    fn touch_site(&self, id: SiteId) -> Result<(), StoreError> {
        self.tables.write().site_mut(id)?.status_time = now_millis();
        Ok(())
    }

    fn finish_site(
        &self,
        id: SiteId,
        status: SiteStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut t = self.tables.write();
        let site = t.site_mut(id)?;
        if site.status != SiteStatus::Indexing {
            return Ok(false);
        }
        site.status = status;
        site.status_time = now_millis();
        site.last_error = error.map(str::to_string);
        Ok(true)
    }

    fn page(&self, site_id: SiteId, path: &str) -> Result<Option<Page>, StoreError> {
        let t = self.tables.read();
        Ok(t.page_index
            .get(&(site_id, path.to_string()))
            .and_then(|id| t.pages.get(id).cloned()))
    }

    fn page_by_id(&self, id: PageId) -> Result<Option<Page>, StoreError> {
        Ok(self.tables.read().pages.get(&id).cloned())
    }

    fn count_pages(&self, site_id: SiteId) -> Result<usize, StoreError> {
        Ok(self.tables.read().pages.values().filter(|p| p.site_id == site_id).count())
    }

    fn lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>, StoreError> {
        let t = self.tables.read();
        Ok(t.lemma_index
            .get(&(site_id, text.to_string()))
            .and_then(|id| t.lemmas.get(id).cloned()))
    }

    fn count_lemmas(&self, site_id: SiteId) -> Result<usize, StoreError> {
        Ok(self.tables.read().lemmas.values().filter(|l| l.site_id == site_id).count())
    }

    fn postings_by_lemma(&self, lemma_id: LemmaId) -> Result<Vec<Posting>, StoreError> {
        let t = self.tables.read();
        let mut postings: Vec<Posting> = t
            .lemma_postings
            .get(&lemma_id)
            .map(|ids| ids.iter().filter_map(|id| t.postings.get(id).cloned()).collect())
            .unwrap_or_default();
        postings.sort_by_key(|p| p.page_id);
        Ok(postings)
    }

    fn postings_by_page(&self, page_id: PageId) -> Result<Vec<Posting>, StoreError> {
        let t = self.tables.read();
        Ok(t.page_postings
            .get(&page_id)
            .map(|ids| ids.iter().filter_map(|id| t.postings.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn replace_page(
        &self,
        page: NewPage<'_>,
        lemmas: &HashMap<String, u32>,
    ) -> Result<Page, StoreError> {
        let mut t = self.tables.write();
        if !t.sites.contains_key(&page.site_id) {
            return Err(StoreError::SiteNotFound(page.site_id));
        }
        if let Some(&old) = t.page_index.get(&(page.site_id, page.path.to_string())) {
            t.remove_page(old);
        }

        t.next_page += 1;
        let stored = Page {
            id: t.next_page,
            site_id: page.site_id,
            path: page.path.to_string(),
            code: page.code,
            content: page.content.to_string(),
        };
        t.page_index.insert((stored.site_id, stored.path.clone()), stored.id);
        t.pages.insert(stored.id, stored.clone());

        // Sorted so ids are assigned deterministically.
        let mut entries: Vec<(&String, &u32)> = lemmas.iter().collect();
        entries.sort();
        for (text, &count) in entries {
            let lemma_id = t.upsert_lemma(stored.site_id, text);
            t.insert_posting(stored.id, lemma_id, count as f32);
        }
        Ok(stored)
    }

    fn delete_page(&self, site_id: SiteId, path: &str) -> Result<bool, StoreError> {
        let mut t = self.tables.write();
        let Some(&id) = t.page_index.get(&(site_id, path.to_string())) else {
            return Ok(false);
        };
        Ok(t.remove_page(id).is_some())
    }

    fn flush(&self) -> Result<(), StoreError> {
        match &self.paths {
            Some(paths) => save_snapshot(paths, &self.tables.read()),
            None => Ok(()),
        }
    }
}
