//! Configuration management for fbmedia using the prefer crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};
use crate::scrapers::browser::{BrowserEngineConfig, ChromiumLauncher, SharedSession};
use crate::scrapers::http_client::{HttpProber, ProbeConfig};
use crate::services::{PostResolver, SettleDelays};

/// Address the API server listens on when nothing else is configured.
pub const DEFAULT_BIND: &str = "0.0.0.0:8001";

/// Environment variable naming the Chrome binary.
pub const CHROME_BIN_ENV: &str = "CHROME_BIN";

/// Configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Address for `serve`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Browser launch options.
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    /// HTTP validation of video candidates.
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Waits after each browser step.
    #[serde(default)]
    pub delays: SettleDelays,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover an fbmedia config file in the standard locations.
    ///
    /// Missing or unreadable files fall back to defaults.
    pub async fn load() -> Self {
        match prefer::load("fbmedia").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load from an explicit path; the format follows the extension.
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScrapeError::Config(format!("Failed to read config file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| ScrapeError::Config(format!("Failed to parse TOML config: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| ScrapeError::Config(format!("Failed to parse YAML config: {}", e)))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| ScrapeError::Config(format!("Failed to parse JSON config: {}", e)))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, if one was loaded.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve relative paths against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        settings.browser = self.browser.clone();
        settings.browser.chrome_path = self
            .browser
            .chrome_path
            .as_ref()
            .map(|p| self.resolve_path(&p.to_string_lossy(), base_dir));
        settings.probe = self.probe.clone();
        settings.delays = self.delays.clone();
    }
}

/// Effective runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub browser: BrowserEngineConfig,
    pub probe: ProbeConfig,
    pub delays: SettleDelays,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            browser: BrowserEngineConfig::default(),
            probe: ProbeConfig::default(),
            delays: SettleDelays::default(),
        }
    }
}

impl Settings {
    /// `CHROME_BIN` wins over the configured browser path.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(chrome) = std::env::var(CHROME_BIN_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.browser.chrome_path = Some(PathBuf::from(shellexpand::tilde(&chrome).as_ref()));
        }
        self
    }

    /// Resolver over a lazily launched Chromium session and a live prober.
    pub fn create_resolver(&self) -> Result<PostResolver> {
        let session = SharedSession::new(ChromiumLauncher::new(self.browser.clone()));
        let prober = HttpProber::new(self.probe.clone())?;
        Ok(PostResolver::new(
            Arc::new(session),
            Arc::new(prober),
            self.delays.clone(),
        ))
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Resolve settings from an explicit file, a discovered file, or defaults,
/// then apply environment overrides.
pub async fn load_settings(options: LoadOptions) -> Result<(Settings, Config)> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);

    Ok((settings.with_env_overrides(), config))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::scrapers::browser::BrowserEngineType;

    fn write_config(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_load_toml() {
        let (_dir, path) = write_config(
            "fbmedia.toml",
            r#"
bind = "127.0.0.1:9000"

[browser]
engine = "standard"
headless = false

[delays]
scroll_ms = 500
"#,
        );

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.bind.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.browser.engine, BrowserEngineType::Standard);
        assert!(!config.browser.headless);
        assert_eq!(config.delays.scroll_ms, 500);
        assert_eq!(config.delays.navigation_ms, 3000);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let (_dir, path) = write_config("fbmedia.yaml", "probe:\n  timeout: 3\n");
        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.probe.timeout, 3);
        assert_eq!(config.probe.range_end, 200_000);

        let (_dir, path) = write_config("fbmedia.json", r#"{"delays": {"playback_ms": 0}}"#);
        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.delays.playback_ms, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_an_error() {
        let (_dir, path) = write_config("fbmedia.toml", "bind = [");
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));

        let missing = Config::load_from_path(Path::new("/nonexistent/fbmedia.toml")).await;
        assert!(missing.is_err());
    }

    #[test]
    fn test_relative_chrome_path_resolves_against_config_dir() {
        let config = Config {
            browser: BrowserEngineConfig {
                chrome_path: Some(PathBuf::from("bin/chrome")),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/fbmedia"));
        assert_eq!(
            settings.browser.chrome_path,
            Some(PathBuf::from("/etc/fbmedia/bin/chrome"))
        );
        assert_eq!(settings.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_resolve_path_keeps_absolute() {
        let config = Config::default();
        assert_eq!(
            config.resolve_path("/usr/bin/chromium", Path::new("/tmp")),
            PathBuf::from("/usr/bin/chromium")
        );
    }
}
