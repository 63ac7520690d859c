//! Video candidate collection.
//!
//! Markup strategies run first and stop at the first usable hit. Live
//! observations (resource timing, network log) are pooled in afterwards so
//! the ranker always sees every independent signal.

mod strategies;

pub use strategies::{unescape_script_value, Markup, MarkupStrategy, MARKUP_STRATEGIES};

use tracing::debug;

use super::browser::NetworkEvent;
use super::url::{is_in_memory_address, strip_byte_range_params};
use crate::models::{CandidateOrigin, MediaCandidate};

/// Address fragments that identify a media resource in live traffic.
const MEDIA_MARKERS: &[&str] = &[".mp4", ".m3u8", "video.fsci"];

/// Whether a live-observed address looks like a media resource.
pub fn is_media_address(address: &str) -> bool {
    if is_in_memory_address(address) {
        return false;
    }
    let lower = address.to_ascii_lowercase();
    MEDIA_MARKERS.iter().any(|m| lower.contains(m))
}

/// Run the markup strategies in order and return the first fetchable hit.
///
/// In-memory (`blob:`) hits are skipped and the chain continues.
pub fn scan_markup(html: &str) -> Option<MediaCandidate> {
    let markup = Markup::parse(html);
    for strategy in MARKUP_STRATEGIES {
        let Some(found) = (strategy.find)(&markup) else {
            continue;
        };
        if is_in_memory_address(&found) {
            debug!("{} found in-memory address {}, skipping", strategy.name, found);
            continue;
        }
        debug!("{} matched {}", strategy.name, found);
        return Some(MediaCandidate::new(found, strategy.origin));
    }
    None
}

/// Ordered, address-unique candidate list.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<MediaCandidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate plus its byte-range-stripped variant when that differs.
    /// In-memory addresses are dropped.
    pub fn insert(&mut self, candidate: MediaCandidate) {
        if is_in_memory_address(&candidate.url) {
            return;
        }
        let stripped = strip_byte_range_params(&candidate.url);
        let variant = (stripped != candidate.url).then(|| MediaCandidate {
            url: stripped,
            origin: candidate.origin,
            observed_headers: candidate.observed_headers.clone(),
        });

        self.push_unique(candidate);
        if let Some(variant) = variant {
            self.push_unique(variant);
        }
    }

    /// First occurrence wins; headers seen later fill an empty slot.
    fn push_unique(&mut self, candidate: MediaCandidate) {
        match self.items.iter_mut().find(|c| c.url == candidate.url) {
            Some(existing) => {
                if existing.observed_headers.is_none() {
                    existing.observed_headers = candidate.observed_headers;
                }
            }
            None => self.items.push(candidate),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaCandidate> {
        self.items.iter()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.items.iter().map(|c| c.url.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<MediaCandidate> {
        self.items
    }
}

/// Accumulates candidates for one rendered post.
#[derive(Debug, Default)]
pub struct CandidateCollector {
    set: CandidateSet,
    markup_hit: Option<MediaCandidate>,
}

impl CandidateCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan rendered markup. Returns the markup hit, if any.
    pub fn add_markup(&mut self, html: &str) -> Option<&MediaCandidate> {
        if let Some(hit) = scan_markup(html) {
            self.set.insert(hit.clone());
            self.markup_hit = Some(hit);
        }
        self.markup_hit.as_ref()
    }

    /// Resource-timing entries recorded while the page played.
    pub fn add_resource_entries<S: AsRef<str>>(&mut self, entries: &[S]) {
        for entry in entries.iter().map(AsRef::as_ref) {
            if is_media_address(entry) {
                self.set
                    .insert(MediaCandidate::new(entry, CandidateOrigin::ResourceTiming));
            }
        }
    }

    /// Replay the network log, attaching request headers to their address.
    pub fn add_network_log(&mut self, events: &[NetworkEvent]) {
        for event in events {
            if !is_media_address(event.url()) {
                continue;
            }
            let mut candidate = MediaCandidate::new(event.url(), CandidateOrigin::NetworkLog);
            if let Some(headers) = event.request_headers() {
                candidate = candidate.with_headers(headers.clone());
            }
            self.set.insert(candidate);
        }
    }

    /// The network log is only consulted when markup gave nothing.
    pub fn needs_network_log(&self) -> bool {
        self.markup_hit.is_none()
    }

    pub fn markup_hit(&self) -> Option<&MediaCandidate> {
        self.markup_hit.as_ref()
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.set
    }

    pub fn finish(self) -> CandidateSet {
        self.set
    }
}
