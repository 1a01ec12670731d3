//! Browser automation: session facade, engines, and the tools built on them.

pub mod chromium;
pub mod engine;
pub mod handle;
pub mod session;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use chromium::ChromiumEngine;
pub use engine::{BrowserEngine, PageDriver};
pub use handle::BrowserHandle;
pub use session::{
    ActionOutcome, BrowserSession, NavigateOutcome, PageInfo, ScreenshotOutcome, SessionOptions,
    TextCheck, WaitOutcome,
};
pub use tools::browser_tools;
