use crate::error::{Result, SourceError};
use crate::types::{ContentKind, Item};
use crate::upstream::Upstream;
use std::time::Duration;

/// HTTP client bound to one upstream and base URL.
#[derive(Debug, Clone)]
pub struct ContentClient {
    upstream: Upstream,
    base_url: String,
    http: reqwest::Client,
}

impl ContentClient {
    pub fn new(upstream: Upstream, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = match base_url.map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => normalize_base_url(url)?,
            None => upstream.default_base_url().to_string(),
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::InvalidConfig(format!("http client build failed: {e}")))?;
        Ok(Self {
            upstream,
            base_url,
            http,
        })
    }

    pub fn kind(&self) -> ContentKind {
        self.upstream.kind()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[tracing::instrument(level = "debug", skip_all, fields(upstream = ?self.upstream))]
    pub async fn fetch_one(&self) -> Result<Item> {
        let url = self.upstream.single_url(&self.base_url);
        let body = self.get_text(&url).await?;
        self.upstream.parse_single(&body)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(upstream = ?self.upstream, amount = amount))]
    pub async fn fetch_batch(&self, amount: usize) -> Result<Vec<Item>> {
        let Some(url) = self.upstream.batch_url(&self.base_url, amount) else {
            return Err(SourceError::InvalidConfig(format!(
                "{:?} does not support batch fetches",
                self.upstream
            )));
        };
        let body = self.get_text(&url).await?;
        self.upstream.parse_batch(&body)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Transport(format!(
                "GET {url} status={status} body={body}"
            )));
        }
        Ok(body)
    }
}

fn normalize_base_url(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| SourceError::InvalidConfig(format!("invalid base url {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(url.trim_end_matches('/').to_string()),
        other => Err(SourceError::InvalidConfig(format!(
            "base url {url:?} must use http or https, got {other}"
        ))),
    }
}
