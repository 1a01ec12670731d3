//! In-memory page used by unit tests in place of Chromium.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proto::BrowserError;

use super::engine::{BrowserEngine, PageDriver};

#[derive(Default)]
struct FakeDom {
    url: String,
    title: String,
    elements: HashMap<String, String>,
    /// Elements that appear after the given number of probes.
    delayed: HashMap<String, (String, usize)>,
    actions: Vec<String>,
    teardown: Vec<String>,
    navigation_error: Option<String>,
    navigation_delay: Option<Duration>,
    fail_teardown: bool,
}

/// Shared fake page; clones observe the same DOM.
#[derive(Clone, Default)]
pub(crate) struct FakePage {
    dom: Arc<Mutex<FakeDom>>,
}

impl FakePage {
    /// The sample login page with its form controls.
    pub(crate) fn login() -> Self {
        let page = Self::default();
        {
            let mut dom = page.dom.lock().unwrap();
            dom.url = "http://localhost:5000/".to_string();
            dom.title = "Login - Test Site".to_string();
            for (selector, text) in [
                ("#username", ""),
                ("#password", ""),
                ("#loginBtn", "Login"),
                ("#message", ""),
            ] {
                dom.elements.insert(selector.to_string(), text.to_string());
            }
        }
        page
    }

    pub(crate) fn set_element(&self, selector: &str, text: &str) {
        self.dom
            .lock()
            .unwrap()
            .elements
            .insert(selector.to_string(), text.to_string());
    }

    pub(crate) fn set_element_after(&self, selector: &str, text: &str, probes: usize) {
        self.dom
            .lock()
            .unwrap()
            .delayed
            .insert(selector.to_string(), (text.to_string(), probes));
    }

    pub(crate) fn fail_navigation(&self, reason: &str) {
        self.dom.lock().unwrap().navigation_error = Some(reason.to_string());
    }

    pub(crate) fn delay_navigation(&self, delay: Duration) {
        self.dom.lock().unwrap().navigation_delay = Some(delay);
    }

    pub(crate) fn fail_teardown(&self) {
        self.dom.lock().unwrap().fail_teardown = true;
    }

    /// Mutating actions performed so far, e.g. `click #loginBtn`.
    pub(crate) fn actions(&self) -> Vec<String> {
        self.dom.lock().unwrap().actions.clone()
    }

    /// Teardown steps that completed, in order.
    pub(crate) fn teardown(&self) -> Vec<String> {
        self.dom.lock().unwrap().teardown.clone()
    }

    fn submit_login(dom: &mut FakeDom) {
        let username = dom.elements.get("#username").cloned().unwrap_or_default();
        let password = dom.elements.get("#password").cloned().unwrap_or_default();
        dom.elements.remove("#message.success");
        dom.elements.remove("#message.error");
        let (class, text) = if username.is_empty() || password.is_empty() {
            ("#message.error", "Username and password are required")
        } else if username == "testuser" && password == "testpass" {
            ("#message.success", "Login successful!")
        } else {
            ("#message.error", "Invalid username or password")
        };
        dom.elements.insert("#message".to_string(), text.to_string());
        dom.elements.insert(class.to_string(), text.to_string());
    }
}

fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(2, 1));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageOutputFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let delay = self.dom.lock().unwrap().navigation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut dom = self.dom.lock().unwrap();
        if let Some(reason) = &dom.navigation_error {
            return Err(BrowserError::Protocol(reason.clone()));
        }
        dom.url = if url.matches('/').count() == 2 {
            format!("{url}/")
        } else {
            url.to_string()
        };
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.dom.lock().unwrap().url.clone())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.dom.lock().unwrap().title.clone())
    }

    async fn query_text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        if selector.contains("((") {
            return Err(BrowserError::Protocol(format!(
                "'{selector}' is not a valid selector"
            )));
        }
        let mut dom = self.dom.lock().unwrap();
        let appeared = match dom.delayed.get_mut(selector) {
            Some((text, 0)) => Some(text.clone()),
            Some((_, remaining)) => {
                *remaining -= 1;
                None
            }
            None => None,
        };
        if let Some(text) = appeared {
            dom.delayed.remove(selector);
            dom.elements.insert(selector.to_string(), text);
        }
        Ok(dom.elements.get(selector).cloned())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("click {selector}"));
        if selector == "#loginBtn" {
            Self::submit_login(&mut dom);
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("fill {selector}={value}"));
        dom.elements.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(tiny_png())
    }

    async fn close_page(&mut self) -> Result<(), BrowserError> {
        let mut dom = self.dom.lock().unwrap();
        if dom.fail_teardown {
            return Err(BrowserError::Protocol("page already detached".into()));
        }
        dom.teardown.push("page".to_string());
        Ok(())
    }

    async fn close_browser(&mut self) -> Result<(), BrowserError> {
        let mut dom = self.dom.lock().unwrap();
        if dom.fail_teardown {
            return Err(BrowserError::Protocol("browser already gone".into()));
        }
        dom.teardown.push("browser".to_string());
        Ok(())
    }

    fn stop_handler(&mut self) {
        self.dom.lock().unwrap().teardown.push("handler".to_string());
    }
}

/// Engine that hands out the same [`FakePage`] on every launch.
pub(crate) struct FakeEngine {
    page: FakePage,
    launches: Mutex<Vec<bool>>,
}

impl FakeEngine {
    pub(crate) fn new(page: FakePage) -> Self {
        Self {
            page,
            launches: Mutex::new(Vec::new()),
        }
    }

    /// `headless` flag of every launch so far.
    pub(crate) fn launches(&self) -> Vec<bool> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch(&self, headless: bool) -> Result<Box<dyn PageDriver>, BrowserError> {
        self.launches.lock().unwrap().push(headless);
        Ok(Box::new(self.page.clone()))
    }
}
