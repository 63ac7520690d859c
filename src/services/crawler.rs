//! Page listing crawler.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::resolver::{settle, PostResolver};
use crate::error::Result;
use crate::models::PageCrawlResult;
use crate::scrapers::url::{
    is_target_domain, listing_target, resolve_mobile_link, strip_query, to_navigation_target,
};

/// Path fragments that mark a link as a post.
const POST_LINK_MARKERS: &[&str] = &["/posts/", "/photo"];

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Scroll attempts allowed while looking for `count` posts.
pub fn max_scroll_attempts(count: usize) -> usize {
    count / 2 + 2
}

/// Post links on a rendered listing, normalized and deduplicated in order.
pub fn harvest_post_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !POST_LINK_MARKERS.iter().any(|m| href.contains(m)) {
            continue;
        }
        let absolute = resolve_mobile_link(href);
        if !is_target_domain(&absolute) {
            continue;
        }
        let link = strip_query(&to_navigation_target(&absolute)).to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

/// Scroll-and-harvest over a listing, then resolve each post in order.
pub struct PageCrawler<'a> {
    resolver: &'a PostResolver,
}

impl<'a> PageCrawler<'a> {
    pub fn new(resolver: &'a PostResolver) -> Self {
        Self { resolver }
    }

    /// Crawl up to `count` posts from `page` (a page name or listing URL).
    pub async fn crawl(&self, page: &str, count: usize) -> Result<PageCrawlResult> {
        let listing = listing_target(page);

        let links = match self.harvest(&listing, count).await {
            Ok(links) => links,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Listing {} failed: {}", listing, e);
                return Ok(PageCrawlResult::failed(page, e));
            }
        };
        info!("Found {} post links on {}", links.len(), listing);

        let mut posts = Vec::new();
        for (index, link) in links.iter().take(count).enumerate() {
            if index > 0 {
                settle(self.resolver.delays().between_posts()).await;
            }
            let result = self.resolver.resolve_post_media(link).await?;
            if result.success {
                posts.extend(result.into_post_payload());
            } else {
                warn!(
                    "Skipping {}: {}",
                    link,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        Ok(PageCrawlResult::completed(page, posts))
    }

    /// Collect post links until `count` are known or scrolling gives up.
    async fn harvest(&self, listing: &str, count: usize) -> Result<Vec<String>> {
        let mut links: Vec<String> = Vec::new();
        if count == 0 {
            return Ok(links);
        }

        // Released before any post is resolved; the session lock is not reentrant.
        let mut session = self.resolver.session().acquire().await?;
        info!("Crawling {} for {} posts", listing, count);
        session.navigate(listing).await?;
        settle(self.resolver.delays().navigation()).await;

        let max_attempts = max_scroll_attempts(count);
        for attempt in 1..=max_attempts {
            session.scroll_to_bottom().await?;
            settle(self.resolver.delays().scroll()).await;

            let html = session.page_source().await?;
            for link in harvest_post_links(&html) {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
            debug!(
                "Scroll {}/{}: {} unique links",
                attempt,
                max_attempts,
                links.len()
            );
            if links.len() >= count {
                break;
            }
        }

        Ok(links)
    }
}
