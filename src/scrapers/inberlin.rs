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

const LISTING_URL: &str = "https://inberlinwohnen.de/wohnungsfinder/";

/// Catalogs already scraped directly; their entries here are duplicates
const EXCLUDED_LINKS: &[&str] = &["wbm.de", "gewobag"];

/// Canonical rent text. Cents are kept so the rent cap sees the exact amount.
fn rent_text(rent: f64) -> String {
    if rent.fract() == 0.0 {
        format!("{:.0}", rent)
    } else {
        format!("{:.2}", rent)
    }
}

/// inBerlinWohnen aggregates the municipal housing companies
pub struct InBerlinScraper {
    fetcher: Arc<dyn PageFetcher>,
    url: Url,
}

struct NodeSelectors {
    strong: Selector,
    details: Selector,
    title: Selector,
}

impl InBerlinScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            fetcher,
            url: Url::parse(LISTING_URL)?,
        })
    }

    /// `Ok(None)` for an entry that belongs to another scraped catalog
    fn parse_node(
        &self,
        node: ElementRef<'_>,
        sel: &NodeSelectors,
    ) -> Result<Option<Listing>, ScoutError> {
        let native_id = node
            .value()
            .attr("id")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ScoutError::parse("item without id"))?;

        let facts: Vec<String> = node
            .select(&sel.strong)
            .map(|s| s.text().collect::<String>())
            .collect();
        if facts.len() < 3 {
            return Err(ScoutError::parse(format!(
                "expected rooms/area/rent, got {} facts",
                facts.len()
            )));
        }

        let rooms = normalize::parse_number(&facts[0])?;
        let area_sqm = normalize::parse_number(&facts[1])?;
        let rent = normalize::parse_amount(&facts[2])?;

        let href = node
            .select(&sel.details)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ScoutError::parse("no detail link"))?;
        let link = normalize::resolve_link(&self.url, href)?;

        if EXCLUDED_LINKS.iter().any(|pattern| link.contains(pattern)) {
            return Ok(None);
        }

        Ok(Some(Listing {
            id: listing_id(self.prefix(), native_id),
            rooms,
            area_sqm,
            link,
            rent: Some(rent_text(rent)),
            title: first_text(node, &sel.title),
            address: None,
            source: self.source_name().to_string(),
        }))
    }
}

#[async_trait]
impl ScraperTrait for InBerlinScraper {
    async fn scrape(&self) -> Result<Vec<Listing>> {
        let html = self.fetcher.fetch(self.url.as_str(), &[]).await;
        if html.is_empty() {
            return Ok(Vec::new());
        }
        let listings = self.extract(&html)?;
        info!("[inberlinwohnen] {} listings", listings.len());
        Ok(listings)
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        let document = Html::parse_document(html);
        let results = selector("ul#_tb_relevant_results")?;
        let Some(list) = document.select(&results).next() else {
            return Ok(Vec::new());
        };

        let items = selector("li.tb-merkflat")?;
        let sel = NodeSelectors {
            strong: selector("strong")?,
            details: selector(r#"a[title*="detailierte"]"#)?,
            title: selector("h3")?,
        };

        let mut listings = Vec::new();
        for node in list.select(&items) {
            match self.parse_node(node, &sel) {
                Ok(Some(listing)) => listings.push(listing),
                Ok(None) => debug!("inBerlin entry duplicates a direct source, skipped"),
                Err(e) => debug!("inBerlin parse error: {}", e),
            }
        }
        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "inBerlinWohnen"
    }

    fn prefix(&self) -> &'static str {
        "inberlinwohnen"
    }
}
