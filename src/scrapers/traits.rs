use crate::models::Listing;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for all listing sources
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Fetch the source and extract its listings
    async fn scrape(&self) -> Result<Vec<Listing>>;

    /// Extract listings from already retrieved markup
    fn extract(&self, html: &str) -> Result<Vec<Listing>>;

    /// Human-readable provider name
    fn source_name(&self) -> &'static str;

    /// Prefix for listing ids and configuration keys
    fn prefix(&self) -> &'static str;
}
