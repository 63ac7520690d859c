//! Static image and text extraction from rendered post markup.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Host marker of the content CDN that serves post photos.
const CONTENT_CDN_MARKER: &str = "scontent";

/// Asset paths on the content CDN that are never post photos.
const EXCLUDED_IMAGE_MARKERS: &[&str] = &["emoji", "static", "safe_image", "rsrc.php"];

/// Posts longer than this are truncated.
pub const MAX_TEXT_CHARS: usize = 500;

const MIN_BLOCK_TEXT: usize = 20;
const MIN_LINE_TEXT: usize = 30;

static IMG_SRC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static IMG_DATA_SRC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[data-src]").unwrap());
static STORY_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[data-ft]").unwrap());

/// Images and text of one post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticContent {
    pub images: Vec<String>,
    pub text: String,
}

/// Extract post photos and text. Missing pieces come back empty.
pub fn extract_static(html: &str) -> StaticContent {
    let document = Html::parse_document(html);
    StaticContent {
        images: extract_images(&document),
        text: extract_text(&document),
    }
}

fn is_post_photo(src: &str) -> bool {
    src.contains(CONTENT_CDN_MARKER) && !EXCLUDED_IMAGE_MARKERS.iter().any(|m| src.contains(m))
}

/// `img[src]` photos first, then lazily loaded `img[data-src]`, deduplicated
/// in discovery order.
fn extract_images(document: &Html) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();

    for img in document.select(&IMG_SRC) {
        if let Some(src) = img.value().attr("src") {
            if is_post_photo(src) && !images.iter().any(|i| i == src) {
                images.push(src.to_string());
            }
        }
    }

    for img in document.select(&IMG_DATA_SRC) {
        if let Some(src) = img.value().attr("data-src") {
            if src.contains(CONTENT_CDN_MARKER) && !images.iter().any(|i| i == src) {
                images.push(src.to_string());
            }
        }
    }

    images
}

/// Longest story block over 20 characters, else the first rendered line over
/// 30 characters.
fn extract_text(document: &Html) -> String {
    let mut best = String::new();
    for block in document.select(&STORY_BLOCK) {
        let text = joined_text(block);
        if text.chars().count() > MIN_BLOCK_TEXT && text.chars().count() > best.chars().count() {
            best = text;
        }
    }

    if best.is_empty() {
        best = visible_text(document.root_element())
            .lines()
            .map(str::trim)
            .find(|line| line.chars().count() > MIN_LINE_TEXT)
            .unwrap_or_default()
            .to_string();
    }

    truncate_chars(&best, MAX_TEXT_CHARS)
}

/// Trimmed text fragments of an element joined by single spaces.
fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Document text with script and style bodies left out.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
        if !hidden {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_filter_and_dedup() {
        let html = r#"<html><body>
            <img src="https://scontent.xx.fbcdn.net/v/photo1.jpg">
            <img src="https://scontent.xx.fbcdn.net/v/photo1.jpg">
            <img src="https://scontent.xx.fbcdn.net/emoji/smile.png">
            <img src="https://static.xx.fbcdn.net/rsrc.php/v3/logo.png">
            <img src="https://scontent.xx.fbcdn.net/safe_image.php?d=1">
            <img src="https://other.cdn/photo.jpg">
            <img data-src="https://scontent.xx.fbcdn.net/v/photo2.jpg">
            <img data-src="https://scontent.xx.fbcdn.net/v/photo1.jpg">
        </body></html>"#;
        let content = extract_static(html);
        assert_eq!(
            content.images,
            vec![
                "https://scontent.xx.fbcdn.net/v/photo1.jpg",
                "https://scontent.xx.fbcdn.net/v/photo2.jpg",
            ]
        );
    }

    #[test]
    fn test_text_prefers_longest_story_block() {
        let html = r#"<html><body>
            <div data-ft="1">short</div>
            <div data-ft="2">A reasonably long story body for the post</div>
            <div data-ft="3">Medium sized text block here!!</div>
        </body></html>"#;
        assert_eq!(
            extract_static(html).text,
            "A reasonably long story body for the post"
        );
    }

    #[test]
    fn test_text_falls_back_to_first_long_line() {
        let html = "<html><head><script>var x = 'a script line that is clearly longer than thirty';</script></head>\
                    <body><p>tiny</p>\n<p>This rendered line is comfortably over thirty characters</p></body></html>";
        assert_eq!(
            extract_static(html).text,
            "This rendered line is comfortably over thirty characters"
        );
    }

    #[test]
    fn test_text_truncated_to_limit() {
        let long = "é".repeat(800);
        let html = format!("<html><body><div data-ft=\"x\">{}</div></body></html>", long);
        assert_eq!(extract_static(&html).text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_empty_markup_yields_empty_content() {
        assert_eq!(extract_static("<html></html>"), StaticContent::default());
    }
}
