use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

pub type SiteId = u32;
pub type PageId = u32;
pub type LemmaId = u32;
pub type PostingId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Indexing => "INDEXING",
            SiteStatus::Indexed => "INDEXED",
            SiteStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    /// Base URL, always stored with a single trailing slash.
    pub url: String,
    pub status: SiteStatus,
    /// Unix epoch milliseconds of the last status or content change.
    pub status_time: i64,
    pub last_error: Option<String>,
}

impl Site {
    /// Base URL without the trailing slash, as shown to API clients.
    pub fn display_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub site_id: SiteId,
    /// Site-relative path, starts with `/`.
    pub path: String,
    pub code: u16,
    /// Raw HTML as fetched.
    pub content: String,
}

/// Page data handed to the store; ids are assigned on insert.
#[derive(Debug, Clone, Copy)]
pub struct NewPage<'a> {
    pub site_id: SiteId,
    pub path: &'a str,
    pub code: u16,
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lemma {
    pub id: LemmaId,
    pub site_id: SiteId,
    pub text: String,
    /// Number of pages of the site containing this lemma at least once.
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    pub page_id: PageId,
    pub lemma_id: LemmaId,
    pub rank: f32, // raw occurrence count within the page
}

/// Normalize a base URL to carry exactly one trailing slash.
pub fn normalize_site_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_urls_get_one_trailing_slash() {
        assert_eq!(normalize_site_url("https://example.com"), "https://example.com/");
        assert_eq!(normalize_site_url("https://example.com///"), "https://example.com/");
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&SiteStatus::Indexed).unwrap();
        assert_eq!(json, "\"INDEXED\"");
    }
}
