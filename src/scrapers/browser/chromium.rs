//! Chromium session over the DevTools protocol.

use std::path::{Path, PathBuf};

#[cfg(feature = "browser")]
use std::collections::HashMap;
#[cfg(feature = "browser")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use serde_json::Value;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
use tracing::info;
#[cfg(feature = "browser")]
use tracing::{debug, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived, SetUserAgentOverrideParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

#[cfg(feature = "browser")]
use super::config::BrowserEngineType;
#[cfg(feature = "browser")]
use super::stealth::{launch_args, STEALTH_SCRIPTS};
#[cfg(feature = "browser")]
use super::types::BrowserCookie;
#[cfg(feature = "browser")]
use super::types::NetworkEvent;
use super::{BrowserEngineConfig, BrowserSession, SessionLauncher};
use crate::error::{Result, ScrapeError};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Find a Chrome/Chromium binary: configured path, known locations, `PATH`.
pub fn find_chrome(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ScrapeError::Setup(format!(
            "configured Chrome binary {} does not exist (check CHROME_BIN or browser.chrome_path)",
            path.display()
        )));
    }

    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(ScrapeError::Setup(
        "Chrome/Chromium not found. Please install it or set CHROME_BIN:\n\
         - Arch/Manjaro: sudo pacman -S chromium\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium\n\
         - Or download from: https://www.google.com/chrome/"
            .to_string(),
    ))
}

/// Launches [`ChromiumSession`]s from a [`BrowserEngineConfig`].
pub struct ChromiumLauncher {
    config: BrowserEngineConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(ChromiumSession::launch(&self.config).await?))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        // Still report a missing binary first; it is the more actionable problem.
        find_chrome(self.config.chrome_path.as_deref())?;
        info!("Browser support disabled at build time");
        Err(ScrapeError::Setup(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

/// One Chromium instance driving a single long-lived page.
#[cfg(feature = "browser")]
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    network_log: Arc<Mutex<Vec<NetworkEvent>>>,
    tasks: Vec<JoinHandle<()>>,
    navigation_timeout: Duration,
}

#[cfg(feature = "browser")]
impl ChromiumSession {
    pub async fn launch(config: &BrowserEngineConfig) -> Result<Self> {
        let chrome_path = find_chrome(config.chrome_path.as_deref())?;
        info!(
            "Launching browser {} (headless={})",
            chrome_path.display(),
            config.headless
        );

        let mut builder = BrowserConfig::builder().chrome_executable(&chrome_path);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }
        for arg in launch_args(config.proxy.as_deref(), &config.chrome_args) {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScrapeError::Setup(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            ScrapeError::Setup(format!(
                "Failed to launch {}: {} (is the binary a compatible Chrome/Chromium?)",
                chrome_path.display(),
                e
            ))
        })?;

        let mut tasks = vec![tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler: {}", e);
                }
            }
        })];

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Setup(format!("Failed to open page: {}", e)))?;

        page.execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await
            .map_err(browser_error)?;

        if config.engine == BrowserEngineType::Stealth {
            for script in STEALTH_SCRIPTS {
                if let Err(e) = page
                    .execute(AddScriptToEvaluateOnNewDocumentParams::new(*script))
                    .await
                {
                    warn!("Stealth script registration skipped: {}", e);
                }
            }
        }

        page.execute(EnableParams::default())
            .await
            .map_err(browser_error)?;

        let network_log = Arc::new(Mutex::new(Vec::new()));

        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(browser_error)?;
        let log = Arc::clone(&network_log);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                record(
                    &log,
                    NetworkEvent::Request {
                        url: event.request.url.clone(),
                        headers: header_map(event.request.headers.inner()),
                    },
                );
            }
        }));

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_error)?;
        let log = Arc::clone(&network_log);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                record(
                    &log,
                    NetworkEvent::Response {
                        url: event.response.url.clone(),
                    },
                );
            }
        }));

        Ok(Self {
            browser,
            page,
            network_log,
            tasks,
            navigation_timeout: Duration::from_secs(config.timeout),
        })
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        lock_log(&self.network_log).clear();

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::navigation(url, e)),
            Err(_) => Err(ScrapeError::navigation(
                url,
                format!("timed out after {}s", self.navigation_timeout.as_secs()),
            )),
        }
    }

    async fn page_source(&mut self) -> Result<String> {
        self.page.content().await.map_err(browser_error)
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScrapeError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn network_log(&mut self) -> Vec<NetworkEvent> {
        std::mem::take(&mut *lock_log(&self.network_log))
    }

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>> {
        let cookies = self.page.get_cookies().await.map_err(browser_error)?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect())
    }

    async fn close(&mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.browser.close().await.map_err(browser_error)?;
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        Ok(())
    }
}

#[cfg(feature = "browser")]
fn browser_error(e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Browser(e.to_string())
}

#[cfg(feature = "browser")]
fn lock_log(log: &Mutex<Vec<NetworkEvent>>) -> std::sync::MutexGuard<'_, Vec<NetworkEvent>> {
    log.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(feature = "browser")]
fn record(log: &Mutex<Vec<NetworkEvent>>, event: NetworkEvent) {
    lock_log(log).push(event);
}

/// CDP headers arrive as a JSON object of name to value.
#[cfg(feature = "browser")]
fn header_map(headers: &Value) -> HashMap<String, String> {
    headers
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(name, value)| {
                    let value = value
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| value.to_string());
                    (name.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}
