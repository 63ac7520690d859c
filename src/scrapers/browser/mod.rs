//! Automated browser session used to render posts.
//!
//! [`BrowserSession`] abstracts the driver so the resolver can run against
//! Chromium (CDP via chromiumoxide) or a scripted double in tests.
//! [`SharedSession`] owns the one long-lived session of a process.

mod chromium;
mod config;
#[cfg(test)]
pub(crate) mod fake;
mod stealth;
mod types;

pub use chromium::{find_chrome, ChromiumLauncher};
#[cfg(feature = "browser")]
pub use chromium::ChromiumSession;
pub use config::{BrowserEngineConfig, BrowserEngineType};
pub use stealth::{launch_args, STEALTH_ARGS, STEALTH_SCRIPTS};
pub use types::{cookie_header, BrowserCookie, NetworkEvent};

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::{Result, ScrapeError};

/// Scrolls the document to its end so lazy content loads.
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Starts the first video element muted; resolves to whether one existed.
pub const START_PLAYBACK: &str = r#"(() => {
    const v = document.querySelector('video');
    if (!v) { return false; }
    v.muted = true;
    const p = v.play();
    if (p && p.catch) { p.catch(() => {}); }
    return true;
})()"#;

/// Names of every resource the page has fetched so far.
pub const RESOURCE_ENTRIES: &str =
    "performance.getEntriesByType('resource').map(e => e.name)";

/// A navigable, scriptable browser page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and clear the network log.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Rendered markup of the current document.
    async fn page_source(&mut self) -> Result<String>;

    /// Evaluate a script expression; `undefined` becomes `null`.
    async fn evaluate(&mut self, script: &str) -> Result<Value>;

    /// Drain network activity recorded since the last navigation.
    async fn network_log(&mut self) -> Vec<NetworkEvent>;

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>>;

    async fn close(&mut self) -> Result<()>;

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.evaluate(SCROLL_TO_BOTTOM).await.map(|_| ())
    }

    async fn start_playback(&mut self) -> Result<bool> {
        Ok(self.evaluate(START_PLAYBACK).await?.as_bool().unwrap_or(false))
    }

    async fn resource_entries(&mut self) -> Result<Vec<String>> {
        let value = self.evaluate(RESOURCE_ENTRIES).await?;
        Ok(string_list(&value))
    }
}

/// Creates sessions on demand.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// Exclusive access to the shared session.
///
/// Only handed out while the slot holds a live session.
pub struct SessionGuard<'a>(MutexGuard<'a, SessionSlot>);

impl Deref for SessionGuard<'_> {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        self.0
            .session
            .as_deref()
            .expect("session guard without a session")
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0
            .session
            .as_deref_mut()
            .expect("session guard without a session")
    }
}

#[derive(Default)]
struct SessionSlot {
    session: Option<Box<dyn BrowserSession>>,
    closed: bool,
}

/// Lazily launched, mutex-serialized session closed exactly once.
pub struct SharedSession {
    launcher: Box<dyn SessionLauncher>,
    slot: Mutex<SessionSlot>,
}

impl SharedSession {
    pub fn new(launcher: impl SessionLauncher + 'static) -> Self {
        Self {
            launcher: Box::new(launcher),
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    /// Lock the session, launching it first if nothing is running yet.
    ///
    /// The guard serializes all page work; drop it before handing control to
    /// anything else that acquires.
    pub async fn acquire(&self) -> Result<SessionGuard<'_>> {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return Err(ScrapeError::Setup(
                "browser session has already been shut down".to_string(),
            ));
        }
        if slot.session.is_none() {
            info!("Launching browser session");
            slot.session = Some(self.launcher.launch().await?);
        }

        Ok(SessionGuard(slot))
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.session.is_some()
    }

    /// Close the session if one was launched. Later calls do nothing.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return;
        }
        slot.closed = true;
        if let Some(mut session) = slot.session.take() {
            info!("Closing browser session");
            if let Err(e) = session.close().await {
                warn!("Browser did not close cleanly: {}", e);
            }
        }
    }
}

/// Strings from a JSON array, skipping anything else.
fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeLauncher, FakePage, FakeSession};
    use super::*;

    #[tokio::test]
    async fn test_session_launched_once_and_reused() {
        let session = FakeSession::default()
            .with_page("https://m.facebook.com/a", FakePage::html("<p>a</p>"))
            .with_page("https://m.facebook.com/b", FakePage::html("<p>b</p>"));
        let launcher = FakeLauncher::new(session);
        let launches = launcher.launches();
        let shared = SharedSession::new(launcher);

        assert!(!shared.is_running().await);
        shared.acquire().await.unwrap().navigate("https://m.facebook.com/a").await.unwrap();
        shared.acquire().await.unwrap().navigate("https://m.facebook.com/b").await.unwrap();

        assert_eq!(launches.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(shared.is_running().await);
    }

    #[tokio::test]
    async fn test_shutdown_closes_once_and_blocks_reacquire() {
        let session = FakeSession::default();
        let closes = session.closes();
        let shared = SharedSession::new(FakeLauncher::new(session));

        drop(shared.acquire().await.unwrap());
        shared.shutdown().await;
        shared.shutdown().await;

        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
        let err = shared.acquire().await.err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_shutdown_without_launch_is_noop() {
        let launcher = FakeLauncher::new(FakeSession::default());
        let launches = launcher.launches();
        let shared = SharedSession::new(launcher);
        shared.shutdown().await;
        assert_eq!(launches.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_is_setup_error() {
        let shared = SharedSession::new(FakeLauncher::failing("chrome not found"));
        let err = shared.acquire().await.err().unwrap();
        assert!(matches!(err, ScrapeError::Setup(_)));
    }

    #[tokio::test]
    async fn test_guard_reaches_the_session() {
        let session = FakeSession::default()
            .with_page("https://m.facebook.com/a", FakePage::html("<p>hello</p>"));
        let shared = SharedSession::new(FakeLauncher::new(session));

        let mut guard = shared.acquire().await.unwrap();
        guard.navigate("https://m.facebook.com/a").await.unwrap();
        assert_eq!(guard.page_source().await.unwrap(), "<p>hello</p>");
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let value = serde_json::json!(["https://a/1.mp4", 3, null, "", "https://b"]);
        assert_eq!(string_list(&value), vec!["https://a/1.mp4", "https://b"]);
        assert!(string_list(&Value::Null).is_empty());
    }
}
