use crate::cancel::CancelToken;
use crate::config::{CrawlerConfig, SiteConfig};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::pool::WorkerPool;
use crate::task::{crawl_path, CrawlMode, CrawlOutcome, SiteCrawl, ROOT_PATH};
use crate::url_filter::{relative_path, same_origin};
use parking_lot::Mutex;
use search_core::{IndexWriter, SiteId, SiteStatus, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

pub const CANCELLED_MESSAGE: &str = "Indexing stopped by user";
pub const MAIN_PAGE_UNAVAILABLE: &str = "Main page is unavailable";

#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("Indexing is already running")]
    AlreadyRunning,

    #[error("Indexing is not running")]
    NotRunning,

    #[error("Page url is empty")]
    EmptyUrl,

    #[error("This page is outside the sites listed in the configuration file")]
    OutOfScope,

    #[error("Invalid site url {0}")]
    InvalidSiteUrl(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexingError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, IndexingError::EmptyUrl | IndexingError::OutOfScope)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, IndexingError::AlreadyRunning | IndexingError::NotRunning)
    }
}

struct TrackedRun {
    site_id: SiteId,
    cancel: CancelToken,
    handle: JoinHandle<()>,
    /// The run decides the site's final status.
    owns_status: bool,
}

struct RunState {
    pool: Arc<WorkerPool>,
    runs: Vec<TrackedRun>,
}

/// Starts, tracks and stops crawl runs over the configured sites.
pub struct Orchestrator {
    config: CrawlerConfig,
    writer: IndexWriter,
    fetcher: Arc<dyn Fetcher>,
    state: Mutex<RunState>,
}

impl Orchestrator {
    pub fn new(config: CrawlerConfig, store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>) -> Self {
        let pool = Arc::new(WorkerPool::new(config.worker_slots()));
        info!(workers = pool.size(), sites = config.sites.len(), "orchestrator ready");
        Self {
            config,
            writer: IndexWriter::new(store),
            fetcher,
            state: Mutex::new(RunState { pool, runs: Vec::new() }),
        }
    }

    /// Orchestrator fetching over HTTP with the configured identity.
    pub fn with_http(config: CrawlerConfig, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.identity, config.request_delay(), config.timeout())?;
        Ok(Self::new(config, store, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.writer.store()
    }

    /// Make sure the pool accepts work, replacing a stopped pool once its
    /// runs have drained.
    fn ready_pool(&self, state: &mut RunState) -> Result<Arc<WorkerPool>, IndexingError> {
        if state.pool.is_shut_down() {
            if !state.pool.is_quiescent() {
                return Err(IndexingError::AlreadyRunning);
            }
            state.pool = Arc::new(WorkerPool::new(self.config.worker_slots()));
            state.runs.clear();
        }
        state.runs.retain(|run| !run.handle.is_finished());
        Ok(state.pool.clone())
    }

    fn crawl_context(
        &self,
        site: search_core::Site,
        mode: CrawlMode,
        pool: &Arc<WorkerPool>,
    ) -> Result<Arc<SiteCrawl>, IndexingError> {
        let base = Url::parse(&site.url).map_err(|_| IndexingError::InvalidSiteUrl(site.url.clone()))?;
        Ok(Arc::new(SiteCrawl::new(
            site,
            base,
            mode,
            pool.clone(),
            self.fetcher.clone(),
            self.writer.clone(),
        )))
    }

    /// Crawl every configured site from its root page.
    pub fn start_indexing(&self) -> Result<(), IndexingError> {
        let mut state = self.state.lock();
        let pool = self.ready_pool(&mut state)?;
        if !pool.is_quiescent() {
            return Err(IndexingError::AlreadyRunning);
        }

        for site_config in &self.config.sites {
            let site = self.writer.store().begin_site(&site_config.name, &site_config.url)?;
            let ctx = self.crawl_context(site, CrawlMode::Full, &pool)?;
            let cancel = ctx.cancel.clone();
            let site_id = ctx.site.id;
            let handle = pool.submit(drive_site(ctx)).map_err(|_| IndexingError::AlreadyRunning)?;
            state.runs.push(TrackedRun { site_id, cancel, handle, owns_status: true });
        }
        info!(sites = self.config.sites.len(), "indexing started");
        Ok(())
    }

    /// Stop accepting work and give running crawls `stop_grace` to finish;
    /// whatever is still running afterwards is cancelled, aborted and its
    /// site failed.
    pub async fn stop_indexing(&self) -> Result<(), IndexingError> {
        let pool = {
            let state = self.state.lock();
            if state.pool.is_shut_down() || state.pool.is_quiescent() {
                return Err(IndexingError::NotRunning);
            }
            state.pool.shutdown();
            state.pool.clone()
        };
        info!(grace_ms = self.config.stop_grace_ms, "stopping indexing");

        if pool.await_quiescent(self.config.stop_grace()).await {
            info!("indexing finished within the grace period");
            self.writer.store().flush()?;
            return Ok(());
        }

        let runs = std::mem::take(&mut self.state.lock().runs);
        let mut cancelled = 0usize;
        for run in runs {
            if run.handle.is_finished() {
                continue;
            }
            run.cancel.cancel();
            // Dropping the run drops its JoinSet, which aborts the children.
            run.handle.abort();
            cancelled += 1;
            if run.owns_status {
                self.writer
                    .store()
                    .finish_site(run.site_id, SiteStatus::Failed, Some(CANCELLED_MESSAGE))?;
            }
        }
        warn!(cancelled, "indexing stopped by user");
        self.writer.store().flush()?;
        Ok(())
    }

    /// Reindex a single page. `url` is either an absolute URL of a configured
    /// site or a `/`-relative path applied to every configured site.
    pub fn index_page(&self, url: &str) -> Result<(), IndexingError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(IndexingError::EmptyUrl);
        }
        let targets = self.resolve_targets(url);
        if targets.is_empty() {
            return Err(IndexingError::OutOfScope);
        }

        let mut state = self.state.lock();
        let pool = self.ready_pool(&mut state)?;
        for (site_config, path) in targets {
            let (site, created) =
                self.writer.store().ensure_site(&site_config.name, &site_config.url)?;
            let ctx = self.crawl_context(site, CrawlMode::Reindex, &pool)?;
            let cancel = ctx.cancel.clone();
            let site_id = ctx.site.id;
            info!(site = %ctx.site.url, path = %path, "reindexing page");
            let handle = pool
                .submit(drive_page(ctx, path, created))
                .map_err(|_| IndexingError::AlreadyRunning)?;
            state.runs.push(TrackedRun { site_id, cancel, handle, owns_status: created });
        }
        Ok(())
    }

    fn resolve_targets(&self, url: &str) -> Vec<(&SiteConfig, String)> {
        let mut targets = Vec::new();
        for site in &self.config.sites {
            let Ok(base) = Url::parse(&site.url) else { continue };
            if url.starts_with('/') {
                match base.join(url) {
                    Ok(joined) if same_origin(&joined, &base) => {
                        targets.push((site, relative_path(&joined)))
                    }
                    _ => {}
                }
            } else if let Ok(absolute) = Url::parse(url) {
                if same_origin(&absolute, &base) {
                    targets.push((site, relative_path(&absolute)));
                }
            }
        }
        targets
    }

    pub fn is_running(&self) -> bool {
        !self.state.lock().pool.is_quiescent()
    }

    /// Wait until no run is in flight. False on timeout.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let pool = self.state.lock().pool.clone();
        pool.await_quiescent(timeout).await
    }
}

fn finish(ctx: &SiteCrawl, status: SiteStatus, message: Option<&str>) {
    if let Err(e) = ctx.writer().store().finish_site(ctx.site.id, status, message) {
        error!(site = %ctx.site.url, error = %e, "could not record site status");
    }
}

fn flush(ctx: &SiteCrawl) {
    if let Err(e) = ctx.writer().store().flush() {
        error!(site = %ctx.site.url, error = %e, "flushing the index failed");
    }
}

async fn drive_site(ctx: Arc<SiteCrawl>) {
    info!(site = %ctx.site.url, "site crawl started");
    let outcome = crawl_path(ctx.clone(), ROOT_PATH.to_string()).await;
    match &outcome {
        Ok(CrawlOutcome::Indexed) => {}
        Ok(CrawlOutcome::FetchFailed) => finish(&ctx, SiteStatus::Failed, Some(MAIN_PAGE_UNAVAILABLE)),
        Ok(_) => finish(&ctx, SiteStatus::Failed, Some(CANCELLED_MESSAGE)),
        Err(e) => finish(&ctx, SiteStatus::Failed, Some(&e.to_string())),
    }
    flush(&ctx);
    info!(site = %ctx.site.url, pages = ctx.visited.len(), outcome = ?outcome, "site crawl finished");
}

async fn drive_page(ctx: Arc<SiteCrawl>, path: String, created: bool) {
    let outcome = crawl_path(ctx.clone(), path.clone()).await;
    if created {
        match &outcome {
            Ok(CrawlOutcome::Reindexed) => finish(&ctx, SiteStatus::Indexed, None),
            Ok(CrawlOutcome::FetchFailed) => {
                finish(&ctx, SiteStatus::Failed, Some(&format!("Page {path} is unavailable")))
            }
            Ok(_) => finish(&ctx, SiteStatus::Failed, Some(CANCELLED_MESSAGE)),
            Err(e) => finish(&ctx, SiteStatus::Failed, Some(&e.to_string())),
        }
    }
    flush(&ctx);
    info!(site = %ctx.site.url, path = %path, outcome = ?outcome, "page reindex finished");
}
