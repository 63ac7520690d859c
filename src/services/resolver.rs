//! Single-post resolution.
//!
//! Each call walks `Init → Navigate → ExtractStatic | CollectVideoCandidates
//! → RankAndValidate → Done`. Any step may end in `Failed`, which becomes a
//! `success = false` result; only setup failures escape as errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{PageCrawlResult, PostPayload, PostResult};
use crate::scrapers::browser::{cookie_header, BrowserCookie, BrowserSession, SharedSession};
use crate::scrapers::extract::{extract_static, StaticContent};
use crate::scrapers::http_client::{MediaProbe, ProbeRequest};
use crate::scrapers::rank::CandidateRanker;
use crate::scrapers::url::{parse_address_info, to_navigation_target};
use crate::scrapers::video::{CandidateCollector, CandidateSet};

use super::crawler::PageCrawler;

/// Fixed waits after each browser step, in milliseconds.
///
/// Rendering exposes no ready signal, so every step waits a fixed time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleDelays {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_scroll_ms")]
    pub scroll_ms: u64,
    #[serde(default = "default_playback_ms")]
    pub playback_ms: u64,
    #[serde(default = "default_between_posts_ms")]
    pub between_posts_ms: u64,
}

fn default_navigation_ms() -> u64 {
    3000
}

fn default_scroll_ms() -> u64 {
    2000
}

fn default_playback_ms() -> u64 {
    3000
}

fn default_between_posts_ms() -> u64 {
    2000
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            scroll_ms: default_scroll_ms(),
            playback_ms: default_playback_ms(),
            between_posts_ms: default_between_posts_ms(),
        }
    }
}

impl SettleDelays {
    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            navigation_ms: 0,
            scroll_ms: 0,
            playback_ms: 0,
            between_posts_ms: 0,
        }
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn scroll(&self) -> Duration {
        Duration::from_millis(self.scroll_ms)
    }

    pub fn playback(&self) -> Duration {
        Duration::from_millis(self.playback_ms)
    }

    pub fn between_posts(&self) -> Duration {
        Duration::from_millis(self.between_posts_ms)
    }
}

pub(crate) async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Where a resolution currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    Init,
    Navigate,
    ExtractStatic,
    CollectVideoCandidates,
    RankAndValidate,
    Done,
}

impl fmt::Display for ResolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Navigate => "navigate",
            Self::ExtractStatic => "extract-static",
            Self::CollectVideoCandidates => "collect-video-candidates",
            Self::RankAndValidate => "rank-and-validate",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the browser yielded for a video post.
struct ObservedVideo {
    candidates: CandidateSet,
    cookies: Vec<BrowserCookie>,
}

/// Resolves posts against the shared browser session.
pub struct PostResolver {
    session: Arc<SharedSession>,
    prober: Arc<dyn MediaProbe>,
    delays: SettleDelays,
}

impl PostResolver {
    pub fn new(
        session: Arc<SharedSession>,
        prober: Arc<dyn MediaProbe>,
        delays: SettleDelays,
    ) -> Self {
        Self {
            session,
            prober,
            delays,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn delays(&self) -> &SettleDelays {
        &self.delays
    }

    /// Images and text of one post.
    pub async fn resolve_post_media(&self, address: &str) -> Result<PostResult> {
        let target = to_navigation_target(address);
        let mut stage = ResolveStage::Init;

        match self.render_static(&target, &mut stage).await {
            Ok(content) => {
                let parsed = parse_address_info(address);
                info!(
                    "Found {} images for {}",
                    content.images.len(),
                    address
                );
                let payload = PostPayload::new(content.text, content.images, &parsed);
                Ok(PostResult::post(address, target, parsed, payload))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Post {} failed during {}: {}", address, stage, e);
                Ok(PostResult::post_failed(address, e))
            }
        }
    }

    /// Best fetchable video address of one post.
    pub async fn resolve_post_video(&self, address: &str) -> Result<PostResult> {
        let target = to_navigation_target(address);
        let mut stage = ResolveStage::Init;

        let observed = match self.observe_video(&target, &mut stage).await {
            Ok(observed) => observed,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Video {} failed during {}: {}", address, stage, e);
                return Ok(PostResult::video_failed(address, Some(target), e));
            }
        };

        if observed.candidates.is_empty() {
            info!("No video candidates for {}", address);
            return Ok(PostResult::video_not_found(address, target));
        }

        stage = ResolveStage::RankAndValidate;
        debug!(
            "{}: ranking {} candidates",
            stage,
            observed.candidates.len()
        );
        let cookies = cookie_header(&observed.cookies);
        let request = ProbeRequest {
            referer: Some(address),
            cookie_header: cookies.as_deref(),
            extra_headers: None,
        };
        let outcome = CandidateRanker::new(self.prober.as_ref())
            .rank(observed.candidates.into_vec(), &request)
            .await;

        let Some(selected) = outcome.selected else {
            return Ok(PostResult::video_not_found(address, target));
        };

        let probe_mobile = if outcome.probe.as_ref().is_some_and(|p| p.ok) {
            None
        } else {
            let mobile = request
                .with_referer(&target)
                .with_extra_headers(selected.candidate.observed_headers.as_ref());
            Some(self.prober.probe(selected.url(), &mobile).await)
        };

        stage = ResolveStage::Done;
        info!(
            "{}: video for {} is {} (validated={})",
            stage,
            address,
            selected.url(),
            outcome.validated
        );
        let parsed = parse_address_info(address);
        Ok(PostResult::video(
            address,
            target,
            parsed,
            selected.candidate.url,
            outcome.probe,
            probe_mobile,
        ))
    }

    /// Posts linked from a page listing.
    pub async fn resolve_page_listing(&self, page: &str, count: usize) -> Result<PageCrawlResult> {
        PageCrawler::new(self).crawl(page, count).await
    }

    /// Navigate, settle, scroll to the end and settle again.
    pub(crate) async fn load(&self, session: &mut dyn BrowserSession, target: &str) -> Result<()> {
        info!("Navigating to {}", target);
        session.navigate(target).await?;
        settle(self.delays.navigation()).await;
        session.scroll_to_bottom().await?;
        settle(self.delays.scroll()).await;
        Ok(())
    }

    async fn render_static(
        &self,
        target: &str,
        stage: &mut ResolveStage,
    ) -> Result<StaticContent> {
        let mut session = self.session.acquire().await?;

        *stage = ResolveStage::Navigate;
        self.load(&mut *session, target).await?;

        *stage = ResolveStage::ExtractStatic;
        let html = session.page_source().await?;
        Ok(extract_static(&html))
    }

    async fn observe_video(
        &self,
        target: &str,
        stage: &mut ResolveStage,
    ) -> Result<ObservedVideo> {
        let mut session = self.session.acquire().await?;

        *stage = ResolveStage::Navigate;
        self.load(&mut *session, target).await?;

        *stage = ResolveStage::CollectVideoCandidates;
        let mut collector = CandidateCollector::new();
        let html = session.page_source().await?;
        if let Some(hit) = collector.add_markup(&html) {
            info!("Markup candidate ({}): {}", hit.origin, hit.url);
        }

        match session.start_playback().await {
            Ok(started) => debug!("Playback started: {}", started),
            Err(e) => debug!("Playback script failed: {}", e),
        }
        settle(self.delays.playback()).await;

        match session.resource_entries().await {
            Ok(entries) => collector.add_resource_entries(&entries),
            Err(e) => warn!("Resource timing unavailable for {}: {}", target, e),
        }

        if collector.needs_network_log() {
            let events = session.network_log().await;
            debug!("Replaying {} network events", events.len());
            collector.add_network_log(&events);
        }

        let cookies = session.cookies().await.unwrap_or_else(|e| {
            debug!("Cookies unavailable: {}", e);
            Vec::new()
        });

        Ok(ObservedVideo {
            candidates: collector.finish(),
            cookies,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::{UrlType, VIDEO_NOT_FOUND};
    use crate::scrapers::browser::fake::{FakeLauncher, FakePage, FakeSession};
    use crate::scrapers::browser::{BrowserCookie, NetworkEvent};
    use crate::scrapers::http_client::fake::FakeProber;

    const POST: &str = "https://www.facebook.com/pagex/posts/123";
    const MOBILE: &str = "https://m.facebook.com/pagex/posts/123";

    fn resolver(session: FakeSession, prober: FakeProber) -> (PostResolver, Arc<FakeProber>) {
        let prober = Arc::new(prober);
        let resolver = PostResolver::new(
            Arc::new(SharedSession::new(FakeLauncher::new(session))),
            prober.clone(),
            SettleDelays::none(),
        );
        (resolver, prober)
    }

    #[tokio::test]
    async fn test_media_mode_extracts_payload() {
        let html = r#"<html><body>
            <div data-ft="1">An announcement long enough to be the story text</div>
            <img src="https://scontent.xx.fbcdn.net/v/p1.jpg">
        </body></html>"#;
        let session = FakeSession::default().with_page(MOBILE, FakePage::html(html));
        let (resolver, _) = resolver(session.clone(), FakeProber::default());

        let result = resolver.resolve_post_media(POST).await.unwrap();
        assert!(result.success);
        assert_eq!(result.mobile_url.as_deref(), Some(MOBILE));
        assert_eq!(result.parsed.as_ref().unwrap().url_type, UrlType::Post);
        let payload = result.post_payload().unwrap();
        assert_eq!(payload.total_images, 1);
        assert_eq!(payload.post_id.as_deref(), Some("123"));
        assert_eq!(session.visits(), vec![MOBILE]);
        assert_eq!(session.scrolls(), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_is_a_failed_result() {
        let session = FakeSession::default().with_page(MOBILE, FakePage::failing());
        let (resolver, _) = resolver(session, FakeProber::default());

        let result = resolver.resolve_post_media(POST).await.unwrap();
        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("ERR_CONNECTION_RESET"));
        assert!(result.post_payload().is_none());

        let video = resolver.resolve_post_video(POST).await.unwrap();
        assert!(!video.success);
        assert_eq!(video.mobile_url.as_deref(), Some(MOBILE));
    }

    #[tokio::test]
    async fn test_setup_failure_propagates() {
        let resolver = PostResolver::new(
            Arc::new(SharedSession::new(FakeLauncher::failing("Chrome not found"))),
            Arc::new(FakeProber::default()),
            SettleDelays::none(),
        );
        assert!(resolver.resolve_post_media(POST).await.unwrap_err().is_fatal());
        assert!(resolver.resolve_post_video(POST).await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_video_not_found() {
        let session = FakeSession::default()
            .with_page(MOBILE, FakePage::html("<html><body><p>text only</p></body></html>"));
        let (resolver, prober) = resolver(session, FakeProber::default());

        let result = resolver.resolve_post_video(POST).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(VIDEO_NOT_FOUND));
        assert_eq!(result.video_url(), None);
        assert!(prober.probed().is_empty());
    }

    #[tokio::test]
    async fn test_markup_hit_skips_network_log_but_pools_resources() {
        let html = r#"<script>{"playable_url":"https://video.xx.fbcdn.net/v/a.mp4?oh=1"}</script>"#;
        let page = FakePage::html(html)
            .with_resources(&["https://video.xx.fbcdn.net/v/b.mp4?bytestart=0&byteend=99"])
            .with_network(vec![NetworkEvent::Request {
                url: "https://video.xx.fbcdn.net/v/netlog.mp4".to_string(),
                headers: HashMap::new(),
            }]);
        let session = FakeSession::default().with_page(MOBILE, page);
        let prober = FakeProber::default()
            .with_probe("https://video.xx.fbcdn.net/v/b.mp4", 206, Some(1_000_000));
        let (resolver, prober) = resolver(session, prober);

        let result = resolver.resolve_post_video(POST).await.unwrap();
        assert!(result.success);
        assert_eq!(result.video_url(), Some("https://video.xx.fbcdn.net/v/b.mp4"));
        assert!(result.probe().unwrap().ok);
        assert!(result.probe_mobile().is_none());
        assert!(!prober.probed().iter().any(|u| u.contains("netlog")));
    }

    #[tokio::test]
    async fn test_network_log_used_without_markup_hit() {
        let mut headers = HashMap::new();
        headers.insert("Origin".to_string(), "https://m.facebook.com".to_string());
        let page = FakePage::html(r#"<video src="blob:https://m.facebook.com/9a"></video>"#)
            .with_network(vec![NetworkEvent::Request {
                url: "https://video.xx.fbcdn.net/v/netlog.mp4".to_string(),
                headers,
            }]);
        let session = FakeSession::default().with_page(MOBILE, page);
        let (resolver, prober) = resolver(session, FakeProber::default());

        let result = resolver.resolve_post_video(POST).await.unwrap();
        assert!(result.success);
        assert_eq!(result.video_url(), Some("https://video.xx.fbcdn.net/v/netlog.mp4"));
        assert!(!result.probe().unwrap().ok);
        let mobile = result.probe_mobile().unwrap();
        assert_eq!(mobile.used_referer.as_deref(), Some(MOBILE));
        assert_eq!(prober.referers().last().cloned().flatten().as_deref(), Some(MOBILE));
    }

    #[tokio::test]
    async fn test_cookies_and_observed_headers_reach_sizing_and_validation() {
        let mut headers = HashMap::new();
        headers.insert("Origin".to_string(), "https://m.facebook.com".to_string());
        let page = FakePage::html(r#"<video src="blob:https://m.facebook.com/9a"></video>"#)
            .with_network(vec![NetworkEvent::Request {
                url: "https://video.xx.fbcdn.net/v/netlog.mp4".to_string(),
                headers: headers.clone(),
            }]);
        let session = FakeSession::default()
            .with_page(MOBILE, page)
            .with_cookies(vec![
                BrowserCookie::new("datr", "x"),
                BrowserCookie::new("empty", ""),
            ]);
        let prober = FakeProber::default()
            .with_length("https://video.xx.fbcdn.net/v/netlog.mp4", 2_000_000)
            .with_probe("https://video.xx.fbcdn.net/v/netlog.mp4", 206, Some(200_001));
        let (resolver, prober) = resolver(session, prober);

        let result = resolver.resolve_post_video(POST).await.unwrap();
        assert!(result.probe().unwrap().ok);

        let cookies = prober.cookies();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.as_deref() == Some("datr=x")));
        let replayed = prober.headers();
        assert_eq!(replayed.len(), 2);
        assert!(replayed.iter().all(|h| h.as_ref() == Some(&headers)));
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_resolver_futures_are_send() {
        let (resolver, _) = resolver(FakeSession::default(), FakeProber::default());
        assert_send(resolver.resolve_post_media(POST));
        assert_send(resolver.resolve_post_video(POST));
        assert_send(resolver.resolve_page_listing("nasa", 3));
    }

    #[test]
    fn test_settle_delays_defaults() {
        let delays: SettleDelays = toml::from_str("scroll_ms = 10").unwrap();
        assert_eq!(delays.scroll(), Duration::from_millis(10));
        assert_eq!(delays.navigation(), Duration::from_secs(3));
        assert_eq!(delays.playback(), Duration::from_secs(3));
        assert_eq!(delays.between_posts(), Duration::from_secs(2));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(
            ResolveStage::CollectVideoCandidates.to_string(),
            "collect-video-candidates"
        );
    }
}
