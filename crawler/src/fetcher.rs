use crate::config::Identity;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Bodies above this size are not indexed.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered with status {status}")]
    Rejected { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} is not an HTML document ({content_type})")]
    NotHtml { url: String, content_type: String },

    #[error("{url} body exceeds 2 MiB")]
    TooLarge { url: String },
}

impl FetchError {
    /// The document is gone for good (404 or 410).
    pub fn is_gone(&self) -> bool {
        matches!(self, FetchError::Rejected { status: 404 | 410, .. })
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Polite HTTP fetcher: waits `request_delay` before each request and sends
/// the configured user agent and referrer. Never retries.
pub struct HttpFetcher {
    client: Client,
    referrer: String,
    request_delay: Duration,
}

impl HttpFetcher {
    pub fn new(
        identity: &Identity,
        request_delay: Duration,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(identity.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, referrer: identity.referrer.clone(), request_delay })
    }
}

fn transport(url: &Url, e: reqwest::Error) -> FetchError {
    FetchError::Transport { url: url.to_string(), message: e.to_string() }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let mut resp = self
            .client
            .get(url.clone())
            .header(header::REFERER, &self.referrer)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Rejected { url: url.to_string(), status: status.as_u16() });
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            let ct = ct.to_ascii_lowercase();
            if !ct.starts_with("text/html") && !ct.starts_with("application/xhtml") {
                return Err(FetchError::NotHtml { url: url.to_string(), content_type: ct });
            }
        }
        if resp.content_length().is_some_and(|len| len as usize > MAX_BODY_BYTES) {
            return Err(FetchError::TooLarge { url: url.to_string() });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| transport(url, e))? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > MAX_BODY_BYTES {
                return Err(FetchError::TooLarge { url: url.to_string() });
            }
        }

        Ok(FetchedPage {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
