use anyhow::{anyhow, Context, Result};
use search_core::normalize_site_url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
}

/// HTTP identity presented to crawled sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referrer")]
    pub referrer: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self { user_agent: default_user_agent(), referrer: default_referrer() }
    }
}

fn default_user_agent() -> String {
    "lemma-search-bot/0.1 (+https://example.com/bot)".to_string()
}
fn default_referrer() -> String {
    "https://www.google.com".to_string()
}
fn default_request_delay_ms() -> u64 { 2000 }
fn default_timeout_secs() -> u64 { 12 }
fn default_stop_grace_ms() -> u64 { 5000 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Crawled in this order.
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub identity: Identity,
    /// Courtesy pause before every request.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Worker slots; available parallelism when unset.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            identity: Identity::default(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
            workers: None,
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl CrawlerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: CrawlerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validated()
    }

    /// Check every site URL and normalize it to a single trailing slash.
    pub fn validated(mut self) -> Result<Self> {
        for site in &mut self.sites {
            let parsed = Url::parse(site.url.trim())
                .with_context(|| format!("site {:?} has an invalid url {:?}", site.name, site.url))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                return Err(anyhow!("site {:?} must use an http(s) url, got {:?}", site.name, site.url));
            }
            site.url = normalize_site_url(&site.url);
        }
        if self.workers == Some(0) {
            return Err(anyhow!("workers must be at least 1"));
        }
        Ok(self)
    }

    pub fn worker_slots(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sites":[{{"name":"Docs","url":"https://docs.example"}}]}}"#).unwrap();

        let config = CrawlerConfig::load(file.path()).unwrap();
        assert_eq!(config.sites[0].url, "https://docs.example/");
        assert_eq!(config.request_delay_ms, 2000);
        assert_eq!(config.stop_grace(), Duration::from_secs(5));
        assert!(config.worker_slots() >= 1);
    }

    #[test]
    fn non_http_sites_are_rejected() {
        let config = CrawlerConfig {
            sites: vec![SiteConfig { name: "Ftp".into(), url: "ftp://files.example".into() }],
            ..CrawlerConfig::default()
        };
        assert!(config.validated().is_err());
    }
}
