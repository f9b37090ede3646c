use crate::models::Listing;
use crate::scrapers::traits::ScraperTrait;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// A known source whose extraction has not been written yet.
/// Always yields nothing so it can sit in the registry unchanged.
pub struct PlaceholderScraper {
    name: &'static str,
    prefix: &'static str,
}

impl PlaceholderScraper {
    pub const fn new(name: &'static str, prefix: &'static str) -> Self {
        Self { name, prefix }
    }
}

#[async_trait]
impl ScraperTrait for PlaceholderScraper {
    async fn scrape(&self) -> Result<Vec<Listing>> {
        debug!("[{}] no extractor yet", self.name);
        Ok(Vec::new())
    }

    fn extract(&self, _html: &str) -> Result<Vec<Listing>> {
        Ok(Vec::new())
    }

    fn source_name(&self) -> &'static str {
        self.name
    }

    fn prefix(&self) -> &'static str {
        self.prefix
    }
}
