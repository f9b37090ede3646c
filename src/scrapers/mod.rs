pub mod browser;
pub mod fetch;
pub mod gewobag;
pub mod inberlin;
pub mod placeholder;
pub mod traits;
pub mod types;
pub mod wbm;

pub use browser::{ChromeRenderer, Renderer};
pub use fetch::{HttpFetcher, PageFetcher};
pub use gewobag::GewobagScraper;
pub use inberlin::InBerlinScraper;
pub use placeholder::PlaceholderScraper;
pub use traits::ScraperTrait;
pub use wbm::WbmScraper;

use crate::config::Config;
use crate::error::ScoutError;
use anyhow::Result;
use scraper::{ElementRef, Selector};
use std::sync::Arc;
use tracing::warn;

/// Sources without an extractor yet: (provider name, prefix)
pub const PLACEHOLDERS: [(&str, &str); 4] = [
    ("Gesobau", "gesobau"),
    ("Degewo", "degewo"),
    ("Howoge", "howoge"),
    ("Stadt und Land", "stadtundland"),
];

/// Every known source, narrowed to the ones enabled in the config
pub fn registry(
    config: &Config,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Arc<dyn Renderer>,
) -> Result<Vec<Arc<dyn ScraperTrait>>> {
    let mut all: Vec<Arc<dyn ScraperTrait>> = vec![
        Arc::new(GewobagScraper::new(renderer, config.render_timeout)?),
        Arc::new(WbmScraper::new(fetcher.clone())?),
        Arc::new(InBerlinScraper::new(fetcher)?),
    ];
    for (name, prefix) in PLACEHOLDERS {
        all.push(Arc::new(PlaceholderScraper::new(name, prefix)));
    }

    for wanted in &config.sources {
        if !all.iter().any(|s| s.prefix() == wanted) {
            warn!("Unknown source '{}' in SOURCES, ignoring", wanted);
        }
    }

    Ok(all
        .into_iter()
        .filter(|s| config.is_enabled(s.prefix()))
        .collect())
}

pub(crate) fn selector(css: &str) -> Result<Selector, ScoutError> {
    Selector::parse(css).map_err(|e| ScoutError::parse(format!("invalid selector {}: {}", css, e)))
}

/// Whitespace-collapsed text of the first match, if non-empty
pub(crate) fn first_text(node: ElementRef<'_>, sel: &Selector) -> Option<String> {
    let el = node.select(sel).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}
