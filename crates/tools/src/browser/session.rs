//! Single-page browser session facade.
//!
//! Actions (`navigate`, `click`, `fill`, `screenshot`) raise typed
//! [`BrowserError`]s. Probes (`read_text`, `element_exists`,
//! `verify_text_contains`, `wait_for_selector`) always return values so
//! callers can branch on absence; the only error a probe reports is
//! [`BrowserError::SessionNotInitialized`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use proto::BrowserError;
use serde::Serialize;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use super::engine::{BrowserEngine, PageDriver};

const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Timeouts owned by the facade.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Upper bound for one page load.
    pub navigation_timeout: Duration,
    /// How long `click`/`fill` wait for their element to appear.
    pub element_timeout: Duration,
    /// Delay between element probes while waiting.
    pub poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            element_timeout: Duration::from_millis(DEFAULT_ELEMENT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Result of a page load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigateOutcome {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub title: String,
    pub success: bool,
}

/// Result of a click or fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub action: &'static str,
    pub selector: String,
    /// Value typed by `fill`.
    pub value: Option<String>,
    pub success: bool,
}

/// Result of a case-insensitive text check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextCheck {
    pub selector: String,
    pub expected: String,
    pub actual: String,
    pub matched: bool,
}

/// Result of a saved screenshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenshotOutcome {
    pub path: PathBuf,
    pub size_bytes: usize,
    pub width: u32,
    pub height: u32,
}

/// Result of waiting for a selector. A timeout is a failed outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitOutcome {
    pub selector: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Current page location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

/// Owns one browser page and exposes primitive automation operations on it.
pub struct BrowserSession {
    engine: Arc<dyn BrowserEngine>,
    options: SessionOptions,
    page: Option<Box<dyn PageDriver>>,
}

impl BrowserSession {
    /// Creates an uninitialized session for the given engine.
    pub fn new(engine: Arc<dyn BrowserEngine>, options: SessionOptions) -> Self {
        Self {
            engine,
            options,
            page: None,
        }
    }

    /// Whether a page is currently live.
    pub fn is_initialized(&self) -> bool {
        self.page.is_some()
    }

    /// Launches the browser, context, and page.
    pub async fn initialize(&mut self, headless: bool) -> Result<(), BrowserError> {
        if self.page.is_some() {
            return Err(BrowserError::AlreadyInitialized);
        }
        let page = self.engine.launch(headless).await?;
        info!(headless, "Browser session initialized");
        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&dyn PageDriver, BrowserError> {
        self.page
            .as_deref()
            .ok_or(BrowserError::SessionNotInitialized)
    }

    /// Loads `url` and reports the resulting title.
    pub async fn navigate(&self, url: &str) -> Result<NavigateOutcome, BrowserError> {
        let page = self.page()?;
        let limit = self.options.navigation_timeout;

        match timeout(limit, page.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: format!("timed out after {}ms", limit.as_millis()),
                });
            }
        }

        let final_url = page.current_url().await?;
        let title = page.title().await?;
        debug!(%url, %final_url, %title, "Navigation finished");

        Ok(NavigateOutcome {
            url: url.to_string(),
            final_url,
            title,
            success: true,
        })
    }

    /// Clicks the element matching `selector`.
    pub async fn click(&self, selector: &str) -> Result<ActionOutcome, BrowserError> {
        let page = self.page()?;
        self.require_element(page, selector).await?;
        page.click(selector).await?;
        Ok(ActionOutcome {
            action: "click",
            selector: selector.to_string(),
            value: None,
            success: true,
        })
    }

    /// Replaces the value of the input matching `selector`.
    pub async fn fill(&self, selector: &str, value: &str) -> Result<ActionOutcome, BrowserError> {
        let page = self.page()?;
        self.require_element(page, selector).await?;
        page.fill(selector, value).await?;
        Ok(ActionOutcome {
            action: "fill",
            selector: selector.to_string(),
            value: Some(value.to_string()),
            success: true,
        })
    }

    /// Text content of the element, or an empty string when nothing matches.
    pub async fn read_text(&self, selector: &str) -> Result<String, BrowserError> {
        let page = self.page()?;
        match page.query_text(selector).await {
            Ok(text) => Ok(text.unwrap_or_default()),
            Err(e) => {
                debug!(%selector, error = %e, "Text probe failed, treating as absent");
                Ok(String::new())
            }
        }
    }

    /// Whether any element matches `selector`. Invalid selectors report `false`.
    pub async fn element_exists(&self, selector: &str) -> Result<bool, BrowserError> {
        let page = self.page()?;
        Ok(probe(page, selector).await)
    }

    /// Case-insensitive substring check against [`read_text`](Self::read_text).
    pub async fn verify_text_contains(
        &self,
        selector: &str,
        expected: &str,
    ) -> Result<TextCheck, BrowserError> {
        let actual = self.read_text(selector).await?;
        let matched = !actual.is_empty() && actual.to_lowercase().contains(&expected.to_lowercase());
        Ok(TextCheck {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual,
            matched,
        })
    }

    /// Captures the page and writes a PNG to `path`.
    pub async fn screenshot(&self, path: &Path) -> Result<ScreenshotOutcome, BrowserError> {
        let page = self.page()?;
        let png = page.screenshot_png().await?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &png).await?;

        let (width, height) = image::load_from_memory(&png)
            .map(|img| (img.width(), img.height()))
            .unwrap_or((0, 0));
        debug!(path = %path.display(), size_bytes = png.len(), "Screenshot saved");

        Ok(ScreenshotOutcome {
            path: path.to_path_buf(),
            size_bytes: png.len(),
            width,
            height,
        })
    }

    /// Polls until `selector` matches or `timeout_ms` elapses.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout_ms: u64,
    ) -> Result<WaitOutcome, BrowserError> {
        let page = self.page()?;
        let found = poll_until_present(
            page,
            selector,
            Duration::from_millis(timeout_ms),
            self.options.poll_interval,
        )
        .await;

        Ok(WaitOutcome {
            selector: selector.to_string(),
            success: found,
            error: (!found).then(|| format!("Timeout {timeout_ms}ms exceeded")),
        })
    }

    /// Current URL and title.
    pub async fn page_info(&self) -> Result<PageInfo, BrowserError> {
        let page = self.page()?;
        Ok(PageInfo {
            url: page.current_url().await?,
            title: page.title().await?,
        })
    }

    /// Releases page, browser, and engine handler in that order.
    ///
    /// Never fails; teardown errors are logged. Closing an uninitialized or
    /// already closed session does nothing.
    pub async fn close(&mut self) {
        let Some(mut page) = self.page.take() else {
            return;
        };
        if let Err(e) = page.close_page().await {
            warn!(error = %e, "Failed to close page");
        }
        if let Err(e) = page.close_browser().await {
            warn!(error = %e, "Failed to close browser");
        }
        page.stop_handler();
        info!("Browser session closed");
    }

    async fn require_element(&self, page: &dyn PageDriver, selector: &str) -> Result<(), BrowserError> {
        let limit = self.options.element_timeout;
        if poll_until_present(page, selector, limit, self.options.poll_interval).await {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }
}

async fn probe(page: &dyn PageDriver, selector: &str) -> bool {
    matches!(page.query_text(selector).await, Ok(Some(_)))
}

async fn poll_until_present(
    page: &dyn PageDriver,
    selector: &str,
    limit: Duration,
    interval: Duration,
) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if probe(page, selector).await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}
