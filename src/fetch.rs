use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use crate::config::Settings;
use crate::error::ScrapeError;

/// HTTP GET capability: URL in, page markup out.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// reqwest-backed fetcher sending the configured user agent on every request.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let body = response.text().await?;
        debug!(
            "GET {} -> {} ({} bytes, {}ms)",
            url,
            status.as_u16(),
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}
