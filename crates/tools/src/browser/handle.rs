//! Shared, lazily launched browser session.

use std::sync::Arc;

use proto::BrowserError;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::session::BrowserSession;

/// Cloneable handle over the one browser session all tools share.
///
/// The first tool that needs a page launches the browser; `shutdown`
/// releases it so the next call starts fresh.
#[derive(Clone)]
pub struct BrowserHandle {
    session: Arc<Mutex<BrowserSession>>,
    headless: bool,
}

impl BrowserHandle {
    pub fn new(session: BrowserSession, headless: bool) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            headless,
        }
    }

    /// Locks the session, launching the browser first if needed.
    pub async fn ready(&self) -> Result<MutexGuard<'_, BrowserSession>, BrowserError> {
        let mut session = self.session.lock().await;
        if !session.is_initialized() {
            debug!(headless = self.headless, "Launching browser on first use");
            session.initialize(self.headless).await?;
        }
        Ok(session)
    }

    /// Whether a browser is currently running.
    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_initialized()
    }

    /// Closes the browser if one is running.
    pub async fn shutdown(&self) {
        self.session.lock().await.close().await;
    }
}
