//! Ordered markup strategies for locating a post's video.
//!
//! Each strategy is a pure function of the rendered markup. The collector
//! walks them in order and keeps the first usable hit.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::CandidateOrigin;
use crate::scrapers::url::resolve_mobile_link;

/// Rendered markup in raw and parsed form.
pub struct Markup<'a> {
    pub raw: &'a str,
    pub document: Html,
}

impl<'a> Markup<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            document: Html::parse_document(raw),
        }
    }
}

/// A named extraction step.
pub struct MarkupStrategy {
    pub name: &'static str,
    pub origin: CandidateOrigin,
    pub find: fn(&Markup<'_>) -> Option<String>,
}

/// Strategies in priority order.
pub static MARKUP_STRATEGIES: &[MarkupStrategy] = &[
    MarkupStrategy {
        name: "og-video-meta",
        origin: CandidateOrigin::MarkupMeta,
        find: og_video_meta,
    },
    MarkupStrategy {
        name: "video-element-src",
        origin: CandidateOrigin::MarkupVideoTag,
        find: video_element_src,
    },
    MarkupStrategy {
        name: "video-source-child",
        origin: CandidateOrigin::MarkupVideoTag,
        find: video_source_child,
    },
    MarkupStrategy {
        name: "inline-script",
        origin: CandidateOrigin::InlineScript,
        find: inline_script,
    },
    MarkupStrategy {
        name: "video-anchor",
        origin: CandidateOrigin::MarkupAnchor,
        find: video_anchor,
    },
    MarkupStrategy {
        name: "raw-cdn",
        origin: CandidateOrigin::RawCdn,
        find: raw_cdn,
    },
];

const OG_VIDEO_PROPERTIES: &[&str] = &["og:video", "og:video:url", "og:video:secure_url"];

static META_PROPERTY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property][content]").unwrap());
static VIDEO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("video").unwrap());
static SOURCE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("source[src]").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Historical JSON fields carrying a playable address, most specific first.
static SCRIPT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r#""playable_url":"(https:[^"]+)""#).unwrap(),
            "playable_url",
        ),
        (
            Regex::new(r#""playable_url_quality_hd":"(https:[^"]+)""#).unwrap(),
            "playable_url_quality_hd",
        ),
        (
            Regex::new(r#""playable_url_quality_sd":"(https:[^"]+)""#).unwrap(),
            "playable_url_quality_sd",
        ),
        (
            Regex::new(r#""hd_src":"(https:[^"]+)""#).unwrap(),
            "hd_src",
        ),
        (
            Regex::new(r#""sd_src":"(https:[^"]+)""#).unwrap(),
            "sd_src",
        ),
        (
            Regex::new(r#""sd_src_no_ratelimit":"(https:[^"]+)""#).unwrap(),
            "sd_src_no_ratelimit",
        ),
        (
            Regex::new(r#""hd_src_no_ratelimit":"(https:[^"]+)""#).unwrap(),
            "hd_src_no_ratelimit",
        ),
        (
            Regex::new(r#""fallback_playable_url":"(https:[^"]+)""#).unwrap(),
            "fallback_playable_url",
        ),
        // "src" inside a JSON blob embedded as an escaped string
        (
            Regex::new(r#"src\\?":\\?"(https:\\?/\\?/video[^"]+?)\\?""#).unwrap(),
            "escaped_src",
        ),
    ]
});

static RAW_CDN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https://[a-z0-9.\-]*fbcdn\.net[^"'>\s]+)"#).unwrap());

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn og_video_meta(markup: &Markup<'_>) -> Option<String> {
    OG_VIDEO_PROPERTIES.iter().find_map(|property| {
        markup
            .document
            .select(&META_PROPERTY)
            .filter(|meta| meta.value().attr("property") == Some(*property))
            .find_map(|meta| meta.value().attr("content").and_then(non_empty))
    })
}

fn video_element_src(markup: &Markup<'_>) -> Option<String> {
    let video = markup.document.select(&VIDEO).next()?;
    ["src", "data-src"]
        .iter()
        .find_map(|attr| video.value().attr(attr).and_then(non_empty))
}

fn video_source_child(markup: &Markup<'_>) -> Option<String> {
    let video = markup.document.select(&VIDEO).next()?;
    let source = video.select(&SOURCE).next()?;
    source.value().attr("src").and_then(non_empty)
}

fn inline_script(markup: &Markup<'_>) -> Option<String> {
    SCRIPT_PATTERNS.iter().find_map(|(pattern, _)| {
        pattern
            .captures(markup.raw)
            .and_then(|caps| caps.get(1))
            .map(|m| unescape_script_value(m.as_str()))
    })
}

fn video_anchor(markup: &Markup<'_>) -> Option<String> {
    markup.document.select(&ANCHOR).find_map(|a| {
        let href = a.value().attr("href")?;
        let is_video_link =
            href.contains("video.php") || (href.contains("play") && href.contains("fbcdn"));
        is_video_link.then(|| resolve_mobile_link(href))
    })
}

fn raw_cdn(markup: &Markup<'_>) -> Option<String> {
    RAW_CDN
        .captures(markup.raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

/// Decode a JSON string body as found inside inline scripts.
///
/// Handles `\/`, `\uXXXX` (including the `%` percent escape) and doubly
/// escaped fragments.
pub fn unescape_script_value(raw: &str) -> String {
    let mut value = raw.to_string();
    // Escaped-in-escaped blobs need two passes.
    for _ in 0..2 {
        if !value.contains('\\') {
            break;
        }
        match serde_json::from_str::<String>(&format!("\"{}\"", value)) {
            Ok(decoded) => value = decoded,
            Err(_) => {
                value = value
                    .replace("\\/", "/")
                    .replace("\\u0025", "%")
                    .replace("\\u0026", "&");
                break;
            }
        }
    }
    value
}
