use crate::error::ScoutError;
use crate::models::{listing_id, Listing};
use crate::normalize;
use crate::scrapers::browser::{RenderSession, Renderer};
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::{first_text, selector};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const SEARCH_URL: &str = "https://www.gewobag.de/fuer-mietinteressentinnen/mietangebote/?bezirke%5B%5D=friedrichshain-kreuzberg&bezirke%5B%5D=friedrichshain-kreuzberg-friedrichshain&bezirke%5B%5D=friedrichshain-kreuzberg-kreuzberg&bezirke%5B%5D=mitte&bezirke%5B%5D=mitte-gesundbrunnen&bezirke%5B%5D=mitte-moabit&bezirke%5B%5D=mitte-wedding&bezirke%5B%5D=pankow-pankow&bezirke%5B%5D=pankow-prenzlauer-berg&bezirke%5B%5D=reinickendorf-reinickendorf&objekttyp%5B%5D=wohnung&gesamtmiete_von=&gesamtmiete_bis=&gesamtflaeche_von=60&gesamtflaeche_bis=&zimmer_von=3&zimmer_bis=&sort-by=";

const COOKIE_ACCEPT: &str = "a._brlbs-btn-accept-all[data-cookie-accept-all]";
const LISTING_NODE: &str = "article.angebot-big-box";
const NAVIGATION_ATTEMPTS: u32 = 3;

/// Gewobag renders its offers client-side, so it goes through the browser
pub struct GewobagScraper {
    renderer: Arc<dyn Renderer>,
    url: Url,
    nav_timeout: Duration,
    backoff_step: Duration,
}

struct NodeSelectors {
    area: Selector,
    link: Selector,
    title: Selector,
    address: Selector,
}

impl GewobagScraper {
    pub fn new(renderer: Arc<dyn Renderer>, nav_timeout: Duration) -> Result<Self> {
        Ok(Self {
            renderer,
            url: Url::parse(SEARCH_URL)?,
            nav_timeout,
            backoff_step: Duration::from_secs(1),
        })
    }

    /// Navigate with linear backoff, dismiss the cookie banner and return
    /// the rendered page. `None` once navigation retries are exhausted.
    async fn render(&self, session: &mut dyn RenderSession) -> Result<Option<String>> {
        for attempt in 1..=NAVIGATION_ATTEMPTS {
            match session.navigate(self.url.as_str(), self.nav_timeout).await {
                Ok(()) => break,
                Err(e) if attempt == NAVIGATION_ATTEMPTS => {
                    error!(
                        "Gewobag navigation failed after {} attempts: {}",
                        NAVIGATION_ATTEMPTS, e
                    );
                    return Ok(None);
                }
                Err(e) => {
                    warn!(
                        "Gewobag navigation failed ({}/{}): {}",
                        attempt, NAVIGATION_ATTEMPTS, e
                    );
                    tokio::time::sleep(self.backoff_step * attempt).await;
                }
            }
        }

        if session
            .wait_for_selector(COOKIE_ACCEPT, Duration::from_secs(5))
            .await
            .is_ok()
        {
            if let Err(e) = session.click(COOKIE_ACCEPT).await {
                debug!("Cookie banner click failed: {}", e);
            }
        }

        if let Err(e) = session.wait_for_selector(LISTING_NODE, self.nav_timeout).await {
            debug!("No Gewobag listing container rendered: {}", e);
        }
        if let Err(e) = session.wait_for_network_idle().await {
            debug!("Gewobag network did not settle: {}", e);
        }

        Ok(Some(session.content().await?))
    }

    fn parse_node(&self, node: ElementRef<'_>, sel: &NodeSelectors) -> Result<Listing, ScoutError> {
        let native_id = node
            .value()
            .attr("id")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ScoutError::parse("article without id"))?;

        let area = first_text(node, &sel.area).ok_or_else(|| ScoutError::parse("no area row"))?;
        let (rooms_text, sqm_text) = area
            .split_once('|')
            .ok_or_else(|| ScoutError::parse(format!("unexpected area row {:?}", area)))?;

        let href = node
            .select(&sel.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ScoutError::parse("no read-more link"))?;

        Ok(Listing {
            id: listing_id(self.prefix(), native_id),
            rooms: normalize::parse_number(rooms_text)?,
            area_sqm: normalize::parse_number(sqm_text)?,
            link: normalize::resolve_link(&self.url, href)?,
            rent: None,
            title: first_text(node, &sel.title),
            address: first_text(node, &sel.address),
            source: self.source_name().to_string(),
        })
    }
}

#[async_trait]
impl ScraperTrait for GewobagScraper {
    async fn scrape(&self) -> Result<Vec<Listing>> {
        info!("[Gewobag] start");

        let mut session = self.renderer.open_session().await?;
        let rendered = self.render(&mut *session).await;
        session.close().await;

        let listings = match rendered? {
            Some(html) => self.extract(&html)?,
            None => Vec::new(),
        };
        info!("[Gewobag] {} listings", listings.len());
        Ok(listings)
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        let document = Html::parse_document(html);
        let nodes = selector(LISTING_NODE)?;
        let sel = NodeSelectors {
            area: selector("tr.angebot-area td")?,
            link: selector("a.read-more-link")?,
            title: selector("h3.angebot-title")?,
            address: selector("address")?,
        };

        let mut listings = Vec::new();
        for node in document.select(&nodes) {
            match self.parse_node(node, &sel) {
                Ok(listing) => listings.push(listing),
                Err(e) => debug!("Gewobag parse error: {}", e),
            }
        }
        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "Gewobag"
    }

    fn prefix(&self) -> &'static str {
        "gewobag"
    }
}
