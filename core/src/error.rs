use crate::SiteId;
use thiserror::Error;

/// Failures of the index store and its snapshot files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("snapshot metadata error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("site {0} does not exist")]
    SiteNotFound(SiteId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors returned by the query engine.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Empty search query")]
    EmptyQuery,

    #[error("Site {0} is not indexed")]
    UnknownSite(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SearchError {
    /// True for errors caused by the caller's input rather than the backend.
    pub fn is_user_error(&self) -> bool {
        matches!(self, SearchError::EmptyQuery | SearchError::UnknownSite(_))
    }
}
