//! Scripted session used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    BrowserCookie, BrowserSession, NetworkEvent, SessionLauncher, RESOURCE_ENTRIES,
    SCROLL_TO_BOTTOM, START_PLAYBACK,
};
use crate::error::{Result, ScrapeError};

/// One scripted document.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    /// Markup per scroll depth; the last stage repeats once exhausted.
    pub stages: Vec<String>,
    pub resources: Vec<String>,
    pub network: Vec<NetworkEvent>,
    pub has_video: bool,
    pub fail_navigation: bool,
}

impl FakePage {
    pub fn html(markup: &str) -> Self {
        Self {
            stages: vec![markup.to_string()],
            ..Default::default()
        }
    }

    pub fn then(mut self, markup: &str) -> Self {
        self.stages.push(markup.to_string());
        self
    }

    pub fn with_resources(mut self, resources: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| r.to_string()).collect();
        self.has_video = true;
        self
    }

    pub fn with_network(mut self, events: Vec<NetworkEvent>) -> Self {
        self.network = events;
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_navigation: true,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    current: Option<String>,
    scrolls: usize,
    visits: Vec<String>,
    cookies: Vec<BrowserCookie>,
    pending_network: Vec<NetworkEvent>,
}

impl FakeState {
    fn page(&self) -> Option<&FakePage> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }
}

#[derive(Clone, Default)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    closes: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
        self
    }

    pub fn with_cookies(self, cookies: Vec<BrowserCookie>) -> Self {
        self.state.lock().unwrap().cookies = cookies;
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.visits.push(url.to_string());
        state.scrolls = 0;
        state.pending_network.clear();

        let Some(page) = state.pages.get(url).cloned() else {
            state.current = None;
            return Err(ScrapeError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"));
        };
        if page.fail_navigation {
            state.current = None;
            return Err(ScrapeError::navigation(url, "net::ERR_CONNECTION_RESET"));
        }
        state.pending_network = page.network.clone();
        state.current = Some(url.to_string());
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        let state = self.state.lock().unwrap();
        let Some(page) = state.page() else {
            return Ok(String::new());
        };
        let stage = state.scrolls.min(page.stages.len().saturating_sub(1));
        Ok(page.stages.get(stage).cloned().unwrap_or_default())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        match script {
            SCROLL_TO_BOTTOM => {
                state.scrolls += 1;
                Ok(Value::Null)
            }
            START_PLAYBACK => Ok(json!(state.page().is_some_and(|p| p.has_video))),
            RESOURCE_ENTRIES => Ok(json!(state
                .page()
                .map(|p| p.resources.clone())
                .unwrap_or_default())),
            _ => Ok(Value::Null),
        }
    }

    async fn network_log(&mut self) -> Vec<NetworkEvent> {
        std::mem::take(&mut self.state.lock().unwrap().pending_network)
    }

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    session: Option<FakeSession>,
    error: Option<String>,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session: Some(session),
            error: None,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            session: None,
            error: Some(message.to_string()),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.launches)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match (&self.session, &self.error) {
            (Some(session), _) => Ok(Box::new(session.clone())),
            (None, Some(message)) => Err(ScrapeError::Setup(message.clone())),
            (None, None) => Err(ScrapeError::Setup("no session scripted".to_string())),
        }
    }
}
