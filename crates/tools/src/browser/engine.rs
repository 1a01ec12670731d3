//! Automation engine seam between the session facade and a concrete browser.

use async_trait::async_trait;
use proto::BrowserError;

/// Launches a browser and hands back its single page.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Starts a browser process with one context and one blank page.
    async fn launch(&self, headless: bool) -> Result<Box<dyn PageDriver>, BrowserError>;
}

/// Primitive operations on one live page.
///
/// Implementations report engine failures as [`BrowserError::Protocol`];
/// timeouts and soft-fail policy are owned by the session facade.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and waits for the load event.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Current page URL.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Current document title (empty when none).
    async fn title(&self) -> Result<String, BrowserError>;

    /// Text content of the first element matching `selector`.
    ///
    /// `Ok(None)` means nothing matched. Invalid selectors are errors.
    async fn query_text(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Replaces the value of the first input matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Captures the viewport as PNG bytes.
    async fn screenshot_png(&self) -> Result<Vec<u8>, BrowserError>;

    /// Closes the page. Repeated calls are no-ops.
    async fn close_page(&mut self) -> Result<(), BrowserError>;

    /// Closes the browsing context and browser process. Repeated calls are no-ops.
    async fn close_browser(&mut self) -> Result<(), BrowserError>;

    /// Stops the engine's protocol event loop. Repeated calls are no-ops.
    fn stop_handler(&mut self);
}
