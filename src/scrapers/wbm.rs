use crate::error::ScoutError;
use crate::models::{listing_id, Listing};
use crate::normalize;
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::{first_text, selector};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const LISTING_URL: &str = "https://www.wbm.de/wohnungen-berlin/angebote/";

/// WBM serves its offers as static OpenImmo markup
pub struct WbmScraper {
    fetcher: Arc<dyn PageFetcher>,
    url: Url,
}

struct NodeSelectors {
    rooms: Selector,
    size: Selector,
    details: Selector,
    title: Selector,
    address: Selector,
    rent: Selector,
}

impl WbmScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            fetcher,
            url: Url::parse(LISTING_URL)?,
        })
    }

    fn parse_node(&self, node: ElementRef<'_>, sel: &NodeSelectors) -> Result<Listing, ScoutError> {
        let rooms = first_text(node, &sel.rooms).ok_or_else(|| ScoutError::parse("no rooms"))?;
        let size = first_text(node, &sel.size).ok_or_else(|| ScoutError::parse("no size"))?;
        let native_id = node
            .value()
            .attr("data-uid")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ScoutError::parse("item without data-uid"))?;
        let href = node
            .select(&sel.details)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ScoutError::parse("no details link"))?;

        Ok(Listing {
            id: listing_id(self.prefix(), native_id),
            rooms: normalize::parse_number(&rooms)?,
            area_sqm: normalize::parse_number(&size)?,
            link: normalize::resolve_link(&self.url, href)?,
            rent: first_text(node, &sel.rent),
            title: first_text(node, &sel.title),
            address: first_text(node, &sel.address),
            source: self.source_name().to_string(),
        })
    }
}

#[async_trait]
impl ScraperTrait for WbmScraper {
    async fn scrape(&self) -> Result<Vec<Listing>> {
        let html = self.fetcher.fetch(self.url.as_str(), &[]).await;
        if html.is_empty() {
            return Ok(Vec::new());
        }
        let listings = self.extract(&html)?;
        info!("[WBM] {} listings", listings.len());
        Ok(listings)
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        let document = Html::parse_document(html);
        let items = selector("div.row.openimmo-search-list-item")?;
        let sel = NodeSelectors {
            rooms: selector("div.main-property-rooms")?,
            size: selector("div.main-property-size")?,
            details: selector(r#"a[title="Details"]"#)?,
            title: selector("h2.imageTitle")?,
            address: selector("div.address")?,
            rent: selector("div.main-property-rent")?,
        };

        let mut listings = Vec::new();
        for node in document.select(&items) {
            match self.parse_node(node, &sel) {
                Ok(listing) => listings.push(listing),
                Err(e) => debug!("WBM parse error: {}", e),
            }
        }
        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "WBM"
    }

    fn prefix(&self) -> &'static str {
        "wbm"
    }
}
