//! HTTP probes that confirm a candidate address serves real media.

#[cfg(test)]
pub(crate) mod fake;
mod response;
pub mod user_agent;

pub use response::{parse_content_range_total, ProbeResponse};
pub use user_agent::{resolve_user_agent, DEFAULT_USER_AGENT};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, RANGE, REFERER};
use reqwest::{redirect, Client, Method, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::models::ProbeResult;

/// Headers a replayed browser request must not carry over.
const SKIPPED_HEADERS: &[&str] = &["host", "content-length", "connection", "range"];

/// Probe tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Timeout for the existence check and range fallback, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Timeout for the ranker's sizing requests, in seconds.
    #[serde(default = "default_sizing_timeout")]
    pub sizing_timeout: u64,

    /// Last byte requested by the range fallback.
    #[serde(default = "default_range_end")]
    pub range_end: u64,

    /// Responses at or below this size are treated as error pages.
    #[serde(default = "default_min_media_bytes")]
    pub min_media_bytes: u64,

    /// None for the default desktop agent, "impersonate", or a custom string.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            sizing_timeout: default_sizing_timeout(),
            range_end: default_range_end(),
            min_media_bytes: default_min_media_bytes(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    8
}

fn default_sizing_timeout() -> u64 {
    5
}

fn default_range_end() -> u64 {
    200_000
}

fn default_min_media_bytes() -> u64 {
    16_000
}

/// Request context shared by every probe of one resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeRequest<'a> {
    pub referer: Option<&'a str>,
    /// Pre-joined `Cookie` header value.
    pub cookie_header: Option<&'a str>,
    /// Headers the browser sent when it fetched this address.
    pub extra_headers: Option<&'a HashMap<String, String>>,
}

impl<'a> ProbeRequest<'a> {
    pub fn with_referer(mut self, referer: &'a str) -> Self {
        self.referer = Some(referer);
        self
    }

    pub fn with_extra_headers(mut self, headers: Option<&'a HashMap<String, String>>) -> Self {
        self.extra_headers = headers;
        self
    }
}

/// Network validation used by the ranker and resolver.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Existence check, then bounded range fetch. Never fails; transport
    /// errors are recorded in the result.
    async fn probe(&self, address: &str, request: &ProbeRequest<'_>) -> ProbeResult;

    /// Declared size from a lightweight existence check, if any.
    async fn content_length(&self, address: &str, request: &ProbeRequest<'_>) -> Option<u64>;

    /// Size floor below which a successful probe is not trusted as media.
    fn min_media_bytes(&self) -> u64 {
        default_min_media_bytes()
    }
}

/// [`MediaProbe`] over a `reqwest` client.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let user_agent = resolve_user_agent(config.user_agent.as_deref());
        let client = Client::builder()
            .user_agent(&user_agent)
            .redirect(redirect::Policy::limited(10))
            .gzip(false)
            .brotli(false)
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    async fn send(
        &self,
        method: Method,
        address: &str,
        request: &ProbeRequest<'_>,
        range: Option<&str>,
        timeout: Duration,
    ) -> std::result::Result<Response, reqwest::Error> {
        self.client
            .request(method, address)
            .headers(probe_headers(request, range))
            .timeout(timeout)
            .send()
            .await
    }
}

#[async_trait]
impl MediaProbe for HttpProber {
    async fn probe(&self, address: &str, request: &ProbeRequest<'_>) -> ProbeResult {
        let timeout = Duration::from_secs(self.config.timeout);
        let mut result = ProbeResult::new(request.referer);

        match self.send(Method::HEAD, address, request, None, timeout).await {
            Ok(response) => {
                let head = ProbeResponse::from_response(&response);
                record(&mut result, &head);
                if head.is_media_status() {
                    result.ok = true;
                    debug!("HEAD {} -> {}", address, head.status);
                    return result;
                }
            }
            Err(e) => result.error = Some(format!("HEAD failed: {}", e)),
        }

        let range = format!("bytes=0-{}", self.config.range_end);
        match self
            .send(Method::GET, address, request, Some(&range), timeout)
            .await
        {
            Ok(mut response) => {
                let head = ProbeResponse::from_response(&response);
                record(&mut result, &head);
                result.ok = head.is_media_status();

                match read_bounded(&mut response, self.config.range_end + 1).await {
                    Ok(read) => result.bytes_read = Some(read),
                    Err(e) => {
                        result.error.get_or_insert_with(|| format!("range body failed: {}", e));
                    }
                }
                debug!(
                    "GET {} ({}) -> {} ok={}",
                    address, range, head.status, result.ok
                );
            }
            Err(e) => {
                let message = format!("range GET failed: {}", e);
                result.error = Some(match result.error.take() {
                    Some(previous) => format!("{}; {}", previous, message),
                    None => message,
                });
            }
        }

        result
    }

    async fn content_length(&self, address: &str, request: &ProbeRequest<'_>) -> Option<u64> {
        let timeout = Duration::from_secs(self.config.sizing_timeout);
        match self.send(Method::HEAD, address, request, None, timeout).await {
            Ok(response) if response.status().is_success() => {
                ProbeResponse::from_response(&response).declared_size()
            }
            Ok(response) => {
                debug!("sizing HEAD {} -> {}", address, response.status());
                None
            }
            Err(e) => {
                debug!("sizing HEAD {} failed: {}", address, e);
                None
            }
        }
    }

    fn min_media_bytes(&self) -> u64 {
        self.config.min_media_bytes
    }
}

fn record(result: &mut ProbeResult, response: &ProbeResponse) {
    result.status = Some(response.status.as_u16());
    result.content_type = response.content_type().map(str::to_string);
    result.content_length = response.content_length();
}

/// Count body bytes without buffering more than `limit`.
async fn read_bounded(response: &mut Response, limit: u64) -> std::result::Result<u64, reqwest::Error> {
    let mut total = 0u64;
    while let Some(chunk) = response.chunk().await? {
        total += chunk.len() as u64;
        if total >= limit {
            break;
        }
    }
    Ok(total)
}

/// Referer and cookies first, replayed browser headers next, Range last.
fn probe_headers(request: &ProbeRequest<'_>, range: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(referer) = request.referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(REFERER, referer);
    }
    if let Some(cookie) = request
        .cookie_header
        .filter(|c| !c.is_empty())
        .and_then(|c| HeaderValue::from_str(c).ok())
    {
        headers.insert(COOKIE, cookie);
    }

    if let Some(extra) = request.extra_headers {
        for (name, value) in extra {
            let lower = name.to_ascii_lowercase();
            if lower.starts_with(':') || SKIPPED_HEADERS.contains(&lower.as_str()) {
                continue;
            }
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(lower.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                continue;
            };
            headers.insert(name, value);
        }
    }

    if let Some(range) = range.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(RANGE, range);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_headers_order_of_precedence() {
        let mut extra = HashMap::new();
        extra.insert("Referer".to_string(), "https://m.facebook.com/".to_string());
        extra.insert(":authority".to_string(), "video.xx.fbcdn.net".to_string());
        extra.insert("Range".to_string(), "bytes=500-".to_string());
        extra.insert("Origin".to_string(), "https://m.facebook.com".to_string());

        let request = ProbeRequest::default()
            .with_referer("https://www.facebook.com/pagex/posts/123")
            .with_extra_headers(Some(&extra));
        let headers = probe_headers(&request, Some("bytes=0-200000"));

        assert_eq!(headers[REFERER], "https://m.facebook.com/");
        assert_eq!(headers[RANGE], "bytes=0-200000");
        assert_eq!(headers["origin"], "https://m.facebook.com");
        assert_eq!(headers.get_all(RANGE).iter().count(), 1);
        assert!(headers.keys().all(|k| !k.as_str().starts_with(':')));
    }

    #[test]
    fn test_probe_headers_skip_empty_cookie() {
        let request = ProbeRequest {
            cookie_header: Some(""),
            ..Default::default()
        };
        assert!(probe_headers(&request, None).is_empty());

        let request = ProbeRequest {
            cookie_header: Some("c_user=1; xs=2"),
            ..Default::default()
        };
        assert_eq!(probe_headers(&request, None)[COOKIE], "c_user=1; xs=2");
    }

    #[test]
    fn test_record_reports_header_length_for_partial_content() {
        let response = ProbeResponse {
            status: reqwest::StatusCode::PARTIAL_CONTENT,
            headers: [
                ("content-length", "200001"),
                ("content-range", "bytes 0-200000/5000000"),
                ("content-type", "video/mp4"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        };
        let mut result = ProbeResult::new(None);
        record(&mut result, &response);

        assert_eq!(result.status, Some(206));
        assert_eq!(result.content_length, Some(200_001));
        assert_eq!(result.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(response.declared_size(), Some(5_000_000));
    }

    #[test]
    fn test_probe_config_defaults() {
        let config: ProbeConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout, 8);
        assert_eq!(config.sizing_timeout, 5);
        assert_eq!(config.range_end, 200_000);
        assert_eq!(config.min_media_bytes, 16_000);
    }
}
