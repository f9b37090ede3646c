use crate::config::HttpSettings;
use crate::error::ScoutError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Plain HTTP retrieval of a listing page.
///
/// Implementations never fail: any transport error yields an empty body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> String;
}

/// Shared reqwest pool with a cap on concurrent requests
pub struct HttpFetcher {
    client: Client,
    permits: Semaphore,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(settings.max_connections)
            .user_agent(settings.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            permits: Semaphore::new(settings.max_connections.max(1)),
        })
    }

    async fn try_fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ScoutError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ScoutError::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScoutError::Transport(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| ScoutError::Transport(e.to_string()))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> String {
        match self.try_fetch(url, query).await {
            Ok(body) => {
                debug!("Downloaded {} bytes from {}", body.len(), url);
                body
            }
            Err(e) => {
                warn!("Fetch error {} → {}", url, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unreachable_host_yields_empty_body() {
        let settings = HttpSettings {
            timeout: Duration::from_millis(500),
            ..HttpSettings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();
        let body = fetcher.fetch("http://127.0.0.1:9/listings", &[]).await;
        assert!(body.is_empty());
    }
}
