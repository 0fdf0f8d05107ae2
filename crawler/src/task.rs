//! Recursive crawl of one site: fetch a path, index it, then crawl every new
//! in-site link it contains and join those children before returning.

use crate::cancel::CancelToken;
use crate::fetcher::Fetcher;
use crate::pool::WorkerPool;
use crate::url_filter::child_paths;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use search_core::{IndexWriter, Site, SiteStatus, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use url::Url;

pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Follow links and mark the site indexed once the root subtree is done.
    Full,
    /// Refresh exactly one path, never expanding its links.
    Reindex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    Indexed,
    Reindexed,
    AlreadyVisited,
    Cancelled,
    FetchFailed,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid page path {0}")]
    InvalidPath(String),

    #[error("crawl task aborted: {0}")]
    Aborted(String),
}

/// Paths already claimed during one run.
#[derive(Default)]
pub struct VisitedSet(Mutex<HashSet<String>>);

impl VisitedSet {
    /// Claim `path`; false when it was claimed before.
    pub fn insert(&self, path: &str) -> bool {
        self.0.lock().insert(path.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State shared by every task of one site run.
pub struct SiteCrawl {
    pub site: Site,
    pub base: Url,
    pub mode: CrawlMode,
    pub visited: VisitedSet,
    pub cancel: CancelToken,
    pool: Arc<WorkerPool>,
    fetcher: Arc<dyn Fetcher>,
    writer: IndexWriter,
}

impl SiteCrawl {
    pub fn new(
        site: Site,
        base: Url,
        mode: CrawlMode,
        pool: Arc<WorkerPool>,
        fetcher: Arc<dyn Fetcher>,
        writer: IndexWriter,
    ) -> Self {
        Self {
            site,
            base,
            mode,
            visited: VisitedSet::default(),
            cancel: CancelToken::new(),
            pool,
            fetcher,
            writer,
        }
    }

    pub fn writer(&self) -> &IndexWriter {
        &self.writer
    }

    fn fail(&self, path: &str, e: StoreError) -> CrawlError {
        error!(site = %self.site.url, path, error = %e, "persisting page failed, cancelling site");
        self.cancel.cancel();
        CrawlError::Store(e)
    }
}

/// Crawl `path` of the site and, in full mode, everything reachable from it.
pub fn crawl_path(ctx: Arc<SiteCrawl>, path: String) -> BoxFuture<'static, Result<CrawlOutcome, CrawlError>> {
    async move {
        if ctx.cancel.is_cancelled() {
            return Ok(CrawlOutcome::Cancelled);
        }
        if !ctx.visited.insert(&path) {
            return Ok(CrawlOutcome::AlreadyVisited);
        }

        let permit = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Ok(CrawlOutcome::Cancelled),
            permit = ctx.pool.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return Ok(CrawlOutcome::Cancelled),
            },
        };

        let url = ctx.base.join(&path).map_err(|_| CrawlError::InvalidPath(path.clone()))?;
        let fetched = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Ok(CrawlOutcome::Cancelled),
            fetched = ctx.fetcher.fetch(&url) => fetched,
        };
        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!(site = %ctx.site.url, path = %path, error = %e, "fetch failed");
                if ctx.mode == CrawlMode::Reindex && e.is_gone() {
                    ctx.writer.remove_page(&ctx.site, &path).map_err(|e| ctx.fail(&path, e))?;
                }
                return Ok(CrawlOutcome::FetchFailed);
            }
        };

        ctx.writer
            .index_page(&ctx.site, &path, page.status, &page.body)
            .map_err(|e| ctx.fail(&path, e))?;
        drop(permit);

        if ctx.mode == CrawlMode::Reindex {
            return Ok(CrawlOutcome::Reindexed);
        }
        if ctx.cancel.is_cancelled() {
            return Ok(CrawlOutcome::Cancelled);
        }

        let children = child_paths(&page.body, &url, &ctx.base);
        debug!(site = %ctx.site.url, path = %path, children = children.len(), "expanding");
        let mut tasks = JoinSet::new();
        for child in children {
            tasks.spawn(crawl_path(ctx.clone(), child));
        }

        let mut first_error = None;
        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(CrawlError::Aborted(e.to_string())));
            match result {
                Ok(CrawlOutcome::Cancelled) => cancelled = true,
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if cancelled {
            return Ok(CrawlOutcome::Cancelled);
        }

        if path == ROOT_PATH {
            ctx.writer.store().finish_site(ctx.site.id, SiteStatus::Indexed, None)?;
        }
        Ok(CrawlOutcome::Indexed)
    }
    .boxed()
}
