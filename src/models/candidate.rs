//! Media candidate and probe models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where a candidate address was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateOrigin {
    /// `og:video` style meta tag.
    MarkupMeta,
    /// A `<video>` element's own source or its nested `<source>`.
    MarkupVideoTag,
    /// JSON field inside an inline script blob.
    InlineScript,
    /// Hyperlink pointing at a video playback page or CDN object.
    MarkupAnchor,
    /// Last-resort CDN URL shape found anywhere in the markup.
    RawCdn,
    /// Performance resource-timing entry recorded during playback.
    ResourceTiming,
    /// Request or response seen in the network-activity log.
    NetworkLog,
}

impl CandidateOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkupMeta => "markup-meta",
            Self::MarkupVideoTag => "markup-video-tag",
            Self::InlineScript => "inline-script",
            Self::MarkupAnchor => "markup-anchor",
            Self::RawCdn => "raw-cdn",
            Self::ResourceTiming => "resource-timing",
            Self::NetworkLog => "network-log",
        }
    }

    /// Origins that come from the rendered markup rather than live traffic.
    pub fn is_markup(&self) -> bool {
        !matches!(self, Self::ResourceTiming | Self::NetworkLog)
    }
}

impl std::fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered, potentially fetchable media address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub url: String,
    pub origin: CandidateOrigin,
    /// Headers the browser sent when it requested this address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_headers: Option<HashMap<String, String>>,
}

impl MediaCandidate {
    pub fn new(url: impl Into<String>, origin: CandidateOrigin) -> Self {
        Self {
            url: url.into(),
            origin,
            observed_headers: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        if !headers.is_empty() {
            self.observed_headers = Some(headers);
        }
        self
    }
}

/// Candidate with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: MediaCandidate,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn url(&self) -> &str {
        &self.candidate.url
    }
}

/// Outcome of validating one candidate over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub ok: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub used_referer: Option<String>,
    pub error: Option<String>,
    /// Body bytes actually received by the range fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_read: Option<u64>,
}

impl ProbeResult {
    pub fn new(referer: Option<&str>) -> Self {
        Self {
            used_referer: referer.map(str::to_string),
            ..Default::default()
        }
    }

    /// Largest size signal seen, declared or fetched.
    pub fn observed_size(&self) -> Option<u64> {
        match (self.content_length, self.bytes_read) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// A successful probe whose size, when known, exceeds `min_bytes`.
    ///
    /// Tiny 200 responses are usually HTML error or consent pages.
    pub fn is_plausible_media(&self, min_bytes: u64) -> bool {
        self.ok && self.observed_size().map_or(true, |size| size > min_bytes)
    }
}
