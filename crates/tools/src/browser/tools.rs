//! Browser operations exposed to the LLM as tools.
//!
//! Every tool folds its outcome into a status line; facade errors become
//! error results carrying the error text.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use proto::{BrowserError, ToolError, ToolResult};
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::handle::BrowserHandle;
use crate::Tool;

const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;
const MAX_WAIT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_SCREENSHOT_NAME: &str = "screenshot.png";

/// All browser tools in the order they are offered to the model.
pub fn browser_tools(browser: &BrowserHandle, screenshot_dir: &Path) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(NavigateTool::new(browser.clone())),
        Arc::new(FillInputTool::new(browser.clone())),
        Arc::new(ClickElementTool::new(browser.clone())),
        Arc::new(PageTextTool::new(browser.clone())),
        Arc::new(ElementExistsTool::new(browser.clone())),
        Arc::new(TextContainsTool::new(browser.clone())),
        Arc::new(ScreenshotTool::new(browser.clone(), screenshot_dir)),
        Arc::new(PageInfoTool::new(browser.clone())),
        Arc::new(WaitForElementTool::new(browser.clone())),
        Arc::new(CloseBrowserTool::new(browser.clone())),
    ]
}

fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))
}

fn finish(
    call_id: &str,
    tool_name: &str,
    outcome: Result<String, BrowserError>,
) -> ToolResult {
    match outcome {
        Ok(status) => ToolResult::success(call_id, tool_name, status),
        Err(e) => ToolResult::error(call_id, tool_name, e.to_string()),
    }
}

fn selector_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "selector": {
                "type": "string",
                "description": description
            }
        },
        "required": ["selector"],
        "additionalProperties": false
    })
}

fn empty_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
struct NavigateArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SelectorArgs {
    selector: String,
}

#[derive(Debug, Deserialize)]
struct FillArgs {
    selector: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct TextContainsArgs {
    selector: String,
    expected_text: String,
}

#[derive(Debug, Deserialize)]
struct ScreenshotArgs {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaitArgs {
    selector: String,
    #[serde(default)]
    timeout: Option<u64>,
}

/// Loads a URL in the shared page.
pub struct NavigateTool {
    browser: BrowserHandle,
}

impl NavigateTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for NavigateTool {
    fn name(&self) -> &str {
        "navigate_to_url"
    }

    fn description(&self) -> &str {
        "Navigate the browser to a URL and report the page title"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Absolute http or https URL to open"
                }
            },
            "required": ["url"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: NavigateArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };

        match Url::parse(&parsed.url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(_) => {
                return ToolResult::error(
                    call_id,
                    self.name(),
                    "Only http/https URLs are supported".to_string(),
                );
            }
            Err(e) => {
                return ToolResult::error(call_id, self.name(), format!("Invalid URL: {e}"));
            }
        }

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let nav = session.navigate(&parsed.url).await?;
            Ok(format!("Navigated to {}. Page title: {}", nav.url, nav.title))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Types a value into an input.
pub struct FillInputTool {
    browser: BrowserHandle,
}

impl FillInputTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for FillInputTool {
    fn name(&self) -> &str {
        "fill_input_field"
    }

    fn description(&self) -> &str {
        "Fill an input field matched by a CSS selector, replacing its current value"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "CSS selector of the input, e.g. #username"
                },
                "value": {
                    "type": "string",
                    "description": "Text to enter"
                }
            },
            "required": ["selector", "value"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: FillArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            session.fill(&parsed.selector, &parsed.value).await?;
            Ok(format!(
                "Filled '{}' with value '{}'",
                parsed.selector, parsed.value
            ))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Clicks an element.
pub struct ClickElementTool {
    browser: BrowserHandle,
}

impl ClickElementTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for ClickElementTool {
    fn name(&self) -> &str {
        "click_element"
    }

    fn description(&self) -> &str {
        "Click an element matched by a CSS selector"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        selector_schema("CSS selector of the element to click, e.g. #loginBtn")
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: SelectorArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            session.click(&parsed.selector).await?;
            Ok(format!("Clicked on element '{}'", parsed.selector))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Reads the text content of an element.
pub struct PageTextTool {
    browser: BrowserHandle,
}

impl PageTextTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for PageTextTool {
    fn name(&self) -> &str {
        "get_page_text"
    }

    fn description(&self) -> &str {
        "Get the text content of an element; empty when nothing matches"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        selector_schema("CSS selector of the element to read, e.g. #message or body")
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: SelectorArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let text = session.read_text(&parsed.selector).await?;
            Ok(format!("Text content of '{}': {}", parsed.selector, text))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Checks whether an element is present.
pub struct ElementExistsTool {
    browser: BrowserHandle,
}

impl ElementExistsTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for ElementExistsTool {
    fn name(&self) -> &str {
        "verify_element_exists"
    }

    fn description(&self) -> &str {
        "Check whether an element matching a CSS selector exists on the page"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        selector_schema("CSS selector to look for, e.g. #message.success")
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: SelectorArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let exists = session.element_exists(&parsed.selector).await?;
            Ok(if exists {
                format!("Element '{}' exists on the page", parsed.selector)
            } else {
                format!("Element '{}' does not exist on the page", parsed.selector)
            })
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Case-insensitive text assertion on an element.
pub struct TextContainsTool {
    browser: BrowserHandle,
}

impl TextContainsTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for TextContainsTool {
    fn name(&self) -> &str {
        "verify_text_contains"
    }

    fn description(&self) -> &str {
        "Check, case-insensitively, that an element's text contains the expected text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "CSS selector of the element to check"
                },
                "expected_text": {
                    "type": "string",
                    "description": "Text the element should contain"
                }
            },
            "required": ["selector", "expected_text"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: TextContainsArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let check = session
                .verify_text_contains(&parsed.selector, &parsed.expected_text)
                .await?;
            let verdict = if check.matched { "passed" } else { "failed" };
            Ok(format!(
                "Text check on '{}' {verdict}: expected '{}', found '{}'",
                check.selector, check.expected, check.actual
            ))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Saves a PNG of the current page.
pub struct ScreenshotTool {
    browser: BrowserHandle,
    screenshot_dir: PathBuf,
}

impl ScreenshotTool {
    pub fn new(browser: BrowserHandle, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            browser,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    fn resolve(&self, filename: Option<&str>) -> PathBuf {
        let name = filename
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_SCREENSHOT_NAME);
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.screenshot_dir.join(path)
        }
    }
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn name(&self) -> &str {
        "take_screenshot"
    }

    fn description(&self) -> &str {
        "Take a screenshot of the current page and save it as a PNG file"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "File name for the PNG (default: screenshot.png)"
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: ScreenshotArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };
        let path = self.resolve(parsed.filename.as_deref());

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let shot = session.screenshot(&path).await?;
            Ok(format!("Screenshot saved to {}", shot.path.display()))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Reports the current URL and title.
pub struct PageInfoTool {
    browser: BrowserHandle,
}

impl PageInfoTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for PageInfoTool {
    fn name(&self) -> &str {
        "get_current_page_info"
    }

    fn description(&self) -> &str {
        "Get the current page URL and title"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        empty_schema()
    }

    async fn execute(&self, call_id: &str, _args: serde_json::Value) -> ToolResult {
        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let info = session.page_info().await?;
            Ok(format!("Current URL: {}, Title: {}", info.url, info.title))
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Waits for an element to appear.
pub struct WaitForElementTool {
    browser: BrowserHandle,
}

impl WaitForElementTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for WaitForElementTool {
    fn name(&self) -> &str {
        "wait_for_element"
    }

    fn description(&self) -> &str {
        "Wait until an element matching a CSS selector appears on the page"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "CSS selector to wait for, e.g. #message.error"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in milliseconds (default: 5000, max: 60000)"
                }
            },
            "required": ["selector"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult {
        let parsed: WaitArgs = match parse_args(args) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(call_id, self.name(), e.to_string()),
        };
        let timeout_ms = parsed
            .timeout
            .unwrap_or(DEFAULT_WAIT_TIMEOUT_MS)
            .min(MAX_WAIT_TIMEOUT_MS);

        let outcome: Result<String, BrowserError> = async {
            let session = self.browser.ready().await?;
            let wait = session.wait_for_selector(&parsed.selector, timeout_ms).await?;
            Ok(match wait.error {
                None => format!("Element '{}' appeared on the page", wait.selector),
                Some(err) => format!("Timeout waiting for element '{}': {err}", wait.selector),
            })
        }
        .await;
        finish(call_id, self.name(), outcome)
    }
}

/// Shuts the browser down; the next browser tool launches a new one.
pub struct CloseBrowserTool {
    browser: BrowserHandle,
}

impl CloseBrowserTool {
    pub fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Tool for CloseBrowserTool {
    fn name(&self) -> &str {
        "close_browser"
    }

    fn description(&self) -> &str {
        "Close the browser and release its resources"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        empty_schema()
    }

    async fn execute(&self, call_id: &str, _args: serde_json::Value) -> ToolResult {
        self.browser.shutdown().await;
        ToolResult::success(call_id, self.name(), "Browser closed successfully".to_string())
    }
}
