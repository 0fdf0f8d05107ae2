//! Concurrent site crawler feeding the lemma index.

pub mod cancel;
pub mod config;
pub mod fetcher;
pub mod orchestrator;
pub mod pool;
pub mod task;
pub mod url_filter;

pub use cancel::CancelToken;
pub use config::{CrawlerConfig, Identity, SiteConfig};
pub use fetcher::{FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use orchestrator::{IndexingError, Orchestrator, CANCELLED_MESSAGE, MAIN_PAGE_UNAVAILABLE};
pub use pool::WorkerPool;
pub use task::{crawl_path, CrawlError, CrawlMode, CrawlOutcome, SiteCrawl};
