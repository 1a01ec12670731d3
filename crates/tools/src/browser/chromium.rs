//! Chromium engine backed by chromiumoxide (CDP).

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use proto::BrowserError;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::engine::{BrowserEngine, PageDriver};

/// Launches a local Chromium through the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    /// Uses the Chromium found on the system path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit Chrome/Chromium executable.
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, headless: bool) -> Result<Box<dyn PageDriver>, BrowserError> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "Failed to close browser after page error");
                }
                handler_task.abort();
                return Err(BrowserError::Launch(format!("failed to create page: {e}")));
            }
        };

        Ok(Box::new(ChromiumPage {
            page: Some(page),
            browser: Some(browser),
            handler_task: Some(handler_task),
        }))
    }
}

struct ChromiumPage {
    page: Option<Page>,
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
}

#[derive(Debug, Deserialize)]
struct TextProbe {
    found: bool,
    #[serde(default)]
    text: String,
}

fn protocol(context: &str, err: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(format!("{context}: {err}"))
}

/// Empties an input and notifies listeners the way a user edit would.
const CLEAR_VALUE_JS: &str =
    "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

/// JavaScript that reports whether `selector` matches and the match's text.
fn text_probe_script(selector: &str) -> Result<String, BrowserError> {
    let literal = serde_json::to_string(selector)
        .map_err(|e| protocol("failed to encode selector", e))?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({literal}); \
         return JSON.stringify(el === null ? {{ found: false }} : {{ found: true, text: el.textContent || \"\" }}); }})()"
    ))
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::SessionNotInitialized)
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| protocol("navigation failed", e))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self
            .page()?
            .url()
            .await
            .map_err(|e| protocol("failed to read page URL", e))?
            .unwrap_or_default())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .page()?
            .get_title()
            .await
            .map_err(|e| protocol("failed to read page title", e))?
            .unwrap_or_default())
    }

    async fn query_text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        let script = text_probe_script(selector)?;
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| protocol(&format!("failed to query '{selector}'"), e))?;

        let raw = result
            .value()
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrowserError::Protocol("text probe returned no value".to_string()))?;
        let probe: TextProbe =
            serde_json::from_str(raw).map_err(|e| protocol("malformed text probe", e))?;

        Ok(probe.found.then_some(probe.text))
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| protocol(&format!("failed to find element '{selector}'"), e))?;
        element
            .click()
            .await
            .map_err(|e| protocol(&format!("failed to click element '{selector}'"), e))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| protocol(&format!("failed to find element '{selector}'"), e))?;
        element
            .click()
            .await
            .map_err(|e| protocol(&format!("failed to focus element '{selector}'"), e))?;
        element
            .call_js_fn(CLEAR_VALUE_JS, false)
            .await
            .map_err(|e| protocol(&format!("failed to clear element '{selector}'"), e))?;
        element
            .type_str(value)
            .await
            .map_err(|e| protocol(&format!("failed to type into element '{selector}'"), e))?;
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, BrowserError> {
        self.page()?
            .screenshot(ScreenshotParams::builder().build())
            .await
            .map_err(|e| protocol("failed to capture screenshot", e))
    }

    async fn close_page(&mut self) -> Result<(), BrowserError> {
        if let Some(page) = self.page.take() {
            page.close()
                .await
                .map_err(|e| protocol("failed to close page", e))?;
        }
        Ok(())
    }

    async fn close_browser(&mut self) -> Result<(), BrowserError> {
        if let Some(mut browser) = self.browser.take() {
            browser
                .close()
                .await
                .map_err(|e| protocol("failed to close browser", e))?;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Browser process did not exit cleanly");
            }
        }
        Ok(())
    }

    fn stop_handler(&mut self) {
        if let Some(handle) = self.handler_task.take() {
            handle.abort();
        }
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.stop_handler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_probe_script_quotes_selector() {
        let script = text_probe_script("input[name=\"user\"]").expect("script");
        assert!(script.contains(r#"document.querySelector("input[name=\"user\"]")"#));
        assert!(script.contains("JSON.stringify"));
    }

    #[test]
    fn text_probe_parses_found_and_missing() {
        let found: TextProbe =
            serde_json::from_str(r#"{"found":true,"text":"Login successful!"}"#).expect("found");
        assert!(found.found);
        assert_eq!(found.text, "Login successful!");

        let missing: TextProbe = serde_json::from_str(r#"{"found":false}"#).expect("missing");
        assert!(!missing.found);
        assert_eq!(missing.text, "");
    }

    #[test]
    fn clear_script_empties_value_and_fires_input_event() {
        assert!(CLEAR_VALUE_JS.starts_with("function()"));
        assert!(CLEAR_VALUE_JS.contains("this.value = ''"));
        assert!(CLEAR_VALUE_JS.contains("new Event('input', { bubbles: true })"));
        let clear = CLEAR_VALUE_JS.find("this.value").expect("clear");
        let dispatch = CLEAR_VALUE_JS.find("dispatchEvent").expect("dispatch");
        assert!(clear < dispatch);
    }

    #[test]
    fn engine_constructors_record_executable() {
        assert!(ChromiumEngine::new().executable.is_none());
        let engine = ChromiumEngine::with_executable("/usr/bin/chromium");
        assert_eq!(
            engine.executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
    }
}
