use crate::error::StoreError;
use crate::store::Store;
use crate::SiteStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    /// True while any site is being crawled.
    pub indexing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStatisticsItem {
    pub name: String,
    pub url: String,
    pub status: SiteStatus,
    pub status_time: i64,
    pub error: String,
    pub pages: usize,
    pub lemmas: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatisticsItem>,
}

/// Summarize every stored site.
pub fn statistics(store: &dyn Store) -> Result<Statistics, StoreError> {
    let mut stats = Statistics::default();
    for site in store.sites()? {
        let pages = store.count_pages(site.id)?;
        let lemmas = store.count_lemmas(site.id)?;
        stats.total.sites += 1;
        stats.total.pages += pages;
        stats.total.lemmas += lemmas;
        stats.total.indexing |= site.status == SiteStatus::Indexing;
        stats.detailed.push(DetailedStatisticsItem {
            name: site.name.clone(),
            url: site.display_url().to_string(),
            status: site.status,
            status_time: site.status_time,
            error: site.last_error.clone().unwrap_or_default(),
            pages,
            lemmas,
        });
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::writer::IndexWriter;
    use std::sync::Arc;

    #[test]
    fn totals_sum_over_sites() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let writer = IndexWriter::new(store.clone());
        let a = store.begin_site("A", "https://a.example/").unwrap();
        let b = store.begin_site("B", "https://b.example").unwrap();
        writer.index_page(&a, "/", 200, "<body>alpha beta</body>").unwrap();
        writer.index_page(&b, "/", 200, "<body>gamma</body>").unwrap();
        store.finish_site(a.id, SiteStatus::Indexed, None).unwrap();
        store.finish_site(b.id, SiteStatus::Failed, Some("Main page is unavailable")).unwrap();

        let stats = statistics(store.as_ref()).unwrap();
        assert_eq!(stats.total, TotalStatistics { sites: 2, pages: 2, lemmas: 3, indexing: false });
        let detail = &stats.detailed[1];
        assert_eq!(detail.url, "https://b.example");
        assert_eq!(detail.status, SiteStatus::Failed);
        assert_eq!(detail.error, "Main page is unavailable");
        assert_eq!(stats.detailed[0].error, "");
    }

    #[test]
    fn indexing_flag_follows_site_status() {
        let store = MemoryStore::new();
        store.begin_site("A", "https://a.example").unwrap();
        let stats = statistics(&store).unwrap();
        assert!(stats.total.indexing);

        let json = serde_json::to_value(&stats.detailed[0]).unwrap();
        assert_eq!(json["status"], "INDEXING");
        assert!(json["statusTime"].is_i64());
    }
}
