//! HTTP response wrappers.

use std::collections::HashMap;

use reqwest::{Response, StatusCode};

/// Status and headers of a probe response (body handled separately).
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
}

impl ProbeResponse {
    pub fn from_response(response: &Response) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }
        Self {
            status: response.status(),
            headers,
        }
    }

    /// Full body (200) or the requested slice (206).
    pub fn is_media_status(&self) -> bool {
        matches!(self.status, StatusCode::OK | StatusCode::PARTIAL_CONTENT)
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// Get the Content-Length header.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|s| s.trim().parse().ok())
    }

    /// Total object size from `Content-Range: bytes 0-199/12345`.
    pub fn content_range_total(&self) -> Option<u64> {
        self.headers
            .get("content-range")
            .and_then(|h| parse_content_range_total(h))
    }

    /// Best size signal: the full object size when the server reports one.
    pub fn declared_size(&self) -> Option<u64> {
        self.content_range_total().or_else(|| self.content_length())
    }
}

/// Parse the complete-length part of a Content-Range header.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}
