//! Scripted prober used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MediaProbe, ProbeRequest};
use crate::models::ProbeResult;

#[derive(Default)]
pub struct FakeProber {
    lengths: HashMap<String, u64>,
    /// Status and declared length per address; unknown addresses get 404.
    probes: HashMap<String, (u16, Option<u64>)>,
    referers: Mutex<Vec<Option<String>>>,
    cookies: Mutex<Vec<Option<String>>>,
    headers: Mutex<Vec<Option<HashMap<String, String>>>>,
    probed: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn with_length(mut self, url: &str, length: u64) -> Self {
        self.lengths.insert(url.to_string(), length);
        self
    }

    pub fn with_probe(mut self, url: &str, status: u16, length: Option<u64>) -> Self {
        self.probes.insert(url.to_string(), (status, length));
        self
    }

    /// Referer of every sizing and validation request, in order.
    pub fn referers(&self) -> Vec<Option<String>> {
        self.referers.lock().unwrap().clone()
    }

    /// Cookie header of every sizing and validation request, in order.
    pub fn cookies(&self) -> Vec<Option<String>> {
        self.cookies.lock().unwrap().clone()
    }

    /// Replayed browser headers of every sizing and validation request.
    pub fn headers(&self) -> Vec<Option<HashMap<String, String>>> {
        self.headers.lock().unwrap().clone()
    }

    /// Addresses passed to `probe`, in order.
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    fn note(&self, request: &ProbeRequest<'_>) {
        self.referers
            .lock()
            .unwrap()
            .push(request.referer.map(str::to_string));
        self.cookies
            .lock()
            .unwrap()
            .push(request.cookie_header.map(str::to_string));
        self.headers
            .lock()
            .unwrap()
            .push(request.extra_headers.cloned());
    }
}

#[async_trait]
impl MediaProbe for FakeProber {
    async fn probe(&self, address: &str, request: &ProbeRequest<'_>) -> ProbeResult {
        self.note(request);
        self.probed.lock().unwrap().push(address.to_string());

        let (status, length) = self.probes.get(address).copied().unwrap_or((404, None));
        ProbeResult {
            ok: matches!(status, 200 | 206),
            status: Some(status),
            content_length: length,
            ..ProbeResult::new(request.referer)
        }
    }

    async fn content_length(&self, address: &str, request: &ProbeRequest<'_>) -> Option<u64> {
        self.note(request);
        self.lengths.get(address).copied()
    }
}
