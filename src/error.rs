//! Error types for the scraping pipeline.

use thiserror::Error;

/// Errors raised inside the pipeline.
///
/// Only [`ScrapeError::Setup`] ever crosses the public resolver boundary;
/// every other variant is folded into a `success = false` result.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser could not be provisioned (binary missing, launch failed,
    /// session already shut down).
    #[error("Browser setup failed: {0}")]
    Setup(String),
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("Page script failed: {0}")]
    Script(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn navigation(url: &str, message: impl ToString) -> Self {
        Self::Navigation {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error must abort the caller instead of becoming a result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_))
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
