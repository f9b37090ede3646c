use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

/// One browsing session (a tab) on the rendering engine
#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    async fn click(&mut self, selector: &str) -> Result<()>;

    async fn wait_for_network_idle(&mut self) -> Result<()>;

    /// Fully rendered document markup
    async fn content(&mut self) -> Result<String>;

    async fn close(&mut self);
}

/// Hands out browsing sessions on a shared rendering engine
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>>;
}

/// Headless Chrome, launched lazily once and reused across runs
pub struct ChromeRenderer {
    browser: Mutex<Option<Arc<Browser>>>,
}

impl ChromeRenderer {
    pub fn new() -> Self {
        Self {
            browser: Mutex::new(None),
        }
    }

    /// Return the running browser, launching it on first use.
    ///
    /// The lock is held across the launch so concurrent callers never
    /// spawn a second Chrome process.
    async fn ensure_browser(&self) -> Result<Arc<Browser>> {
        let mut slot = self.browser.lock().await;
        if let Some(browser) = slot.as_ref() {
            return Ok(browser.clone());
        }

        info!("Launching headless Chrome...");
        let browser = task::spawn_blocking(|| {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .idle_browser_timeout(Duration::from_secs(60 * 60 * 24 * 365))
                .args(vec![
                    OsStr::new("--disable-dev-shm-usage"),
                    OsStr::new("--disable-setuid-sandbox"),
                ])
                .build()
                .context("Failed to build launch options")?;

            Browser::new(options).context("Failed to launch Chrome browser")
        })
        .await??;

        let browser = Arc::new(browser);
        *slot = Some(browser.clone());
        info!("Chrome launched (singleton)");
        Ok(browser)
    }

    /// Tear down the browser process if it was ever launched
    pub async fn shutdown(&self) {
        if self.browser.lock().await.take().is_some() {
            info!("Chrome closed");
        }
    }
}

impl Default for ChromeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        let browser = self.ensure_browser().await?;
        let handle = browser.clone();
        match task::spawn_blocking(move || handle.new_tab()).await? {
            Ok(tab) => Ok(Box::new(ChromeSession { tab })),
            Err(e) => {
                // A dead Chrome fails every new tab; relaunch on the next run
                if evict(&mut *self.browser.lock().await, &browser) {
                    warn!("Opening a tab failed, dropping the cached browser");
                }
                Err(e.context("Failed to open Chrome tab"))
            }
        }
    }
}

/// Clear `slot` if it still holds `stale`. A newer handle is left alone.
fn evict<T>(slot: &mut Option<Arc<T>>, stale: &Arc<T>) -> bool {
    if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, stale)) {
        *slot = None;
        true
    } else {
        false
    }
}

struct ChromeSession {
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Run a blocking tab operation off the async runtime
    async fn with_tab<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = self.tab.clone();
        task::spawn_blocking(move || op(&tab)).await?
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)?;
            Ok(())
        })
        .await
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            tab.find_element(&selector)?.click()?;
            Ok(())
        })
        .await
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        self.with_tab(|tab| {
            tab.wait_until_navigated()?;
            // Let late XHR-driven listing widgets settle
            thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await
    }

    async fn content(&mut self) -> Result<String> {
        self.with_tab(|tab| tab.get_content()).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.with_tab(|tab| tab.close(true)).await {
            debug!("Closing tab failed: {}", e);
        }
    }
}
