//! Lemma index and ranked search shared by the crawler, the CLI and the
//! HTTP server.

pub mod error;
pub mod html;
pub mod lemmatizer;
pub mod memory;
pub mod model;
pub mod persist;
pub mod response;
pub mod search;
pub mod snippet;
pub mod stats;
pub mod store;
pub mod writer;

pub use error::{SearchError, StoreError};
pub use memory::MemoryStore;
pub use model::{
    normalize_site_url, now_millis, Lemma, LemmaId, NewPage, Page, PageId, Posting, PostingId,
    Site, SiteId, SiteStatus,
};
pub use search::{search, SearchHit, SearchRequest, SearchResults};
pub use store::Store;
pub use writer::IndexWriter;
