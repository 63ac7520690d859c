//! Post and page-crawl result models.

use serde::{Deserialize, Serialize};

/// Message reported when the video pipeline ends with no candidates.
pub const VIDEO_NOT_FOUND: &str = "Video not found";

/// Kind of post address, derived from its path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    Post,
    Photo,
    #[default]
    Unknown,
}

/// Page name and post id pulled out of a post address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddressInfo {
    pub page_name: Option<String>,
    pub post_id: Option<String>,
    pub url_type: UrlType,
}

/// Image reference inside a post payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

/// Text and images extracted from one rendered post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub text: String,
    pub images: Vec<ImageRef>,
    pub total_images: usize,
    pub page_name: Option<String>,
    pub post_id: Option<String>,
}

impl PostPayload {
    pub fn new(text: String, images: Vec<String>, parsed: &ParsedAddressInfo) -> Self {
        let images: Vec<ImageRef> = images.into_iter().map(|url| ImageRef { url }).collect();
        Self {
            text,
            total_images: images.len(),
            images,
            page_name: parsed.page_name.clone(),
            post_id: parsed.post_id.clone(),
        }
    }

    pub fn image_urls(&self) -> Vec<String> {
        self.images.iter().map(|i| i.url.clone()).collect()
    }
}

/// Mode-specific part of a [`PostResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PostMedia {
    Post {
        post: Option<PostPayload>,
    },
    Video {
        video_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        probe: Option<super::ProbeResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        probe_mobile: Option<super::ProbeResult>,
    },
}

/// Terminal artifact returned for a single post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostResult {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedAddressInfo>,
    #[serde(flatten)]
    pub media: PostMedia,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostResult {
    /// Successful images/text resolution.
    pub fn post(
        url: &str,
        mobile_url: String,
        parsed: ParsedAddressInfo,
        payload: PostPayload,
    ) -> Self {
        Self {
            success: true,
            url: url.to_string(),
            mobile_url: Some(mobile_url),
            parsed: Some(parsed),
            media: PostMedia::Post {
                post: Some(payload),
            },
            error: None,
        }
    }

    /// Failed images/text resolution.
    pub fn post_failed(url: &str, error: impl ToString) -> Self {
        Self {
            success: false,
            url: url.to_string(),
            mobile_url: None,
            parsed: None,
            media: PostMedia::Post { post: None },
            error: Some(error.to_string()),
        }
    }

    /// Successful video resolution.
    pub fn video(
        url: &str,
        mobile_url: String,
        parsed: ParsedAddressInfo,
        video_url: String,
        probe: Option<super::ProbeResult>,
        probe_mobile: Option<super::ProbeResult>,
    ) -> Self {
        Self {
            success: true,
            url: url.to_string(),
            mobile_url: Some(mobile_url),
            parsed: Some(parsed),
            media: PostMedia::Video {
                video_url: Some(video_url),
                probe,
                probe_mobile,
            },
            error: None,
        }
    }

    /// Failed video resolution.
    pub fn video_failed(url: &str, mobile_url: Option<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            url: url.to_string(),
            mobile_url,
            parsed: None,
            media: PostMedia::Video {
                video_url: None,
                probe: None,
                probe_mobile: None,
            },
            error: Some(error.to_string()),
        }
    }

    /// Video pipeline finished with an empty candidate set.
    pub fn video_not_found(url: &str, mobile_url: String) -> Self {
        Self::video_failed(url, Some(mobile_url), VIDEO_NOT_FOUND)
    }

    pub fn post_payload(&self) -> Option<&PostPayload> {
        match &self.media {
            PostMedia::Post { post } => post.as_ref(),
            PostMedia::Video { .. } => None,
        }
    }

    pub fn into_post_payload(self) -> Option<PostPayload> {
        match self.media {
            PostMedia::Post { post } => post,
            PostMedia::Video { .. } => None,
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match &self.media {
            PostMedia::Video { video_url, .. } => video_url.as_deref(),
            PostMedia::Post { .. } => None,
        }
    }

    pub fn probe(&self) -> Option<&super::ProbeResult> {
        match &self.media {
            PostMedia::Video { probe, .. } => probe.as_ref(),
            PostMedia::Post { .. } => None,
        }
    }

    pub fn probe_mobile(&self) -> Option<&super::ProbeResult> {
        match &self.media {
            PostMedia::Video { probe_mobile, .. } => probe_mobile.as_ref(),
            PostMedia::Post { .. } => None,
        }
    }
}

/// Terminal artifact for a page listing crawl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCrawlResult {
    pub success: bool,
    pub page_url: String,
    pub total_posts: usize,
    pub posts: Vec<PostPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageCrawlResult {
    pub fn completed(page_url: &str, posts: Vec<PostPayload>) -> Self {
        Self {
            success: true,
            page_url: page_url.to_string(),
            total_posts: posts.len(),
            posts,
            error: None,
        }
    }

    pub fn failed(page_url: &str, error: impl ToString) -> Self {
        Self {
            success: false,
            page_url: page_url.to_string(),
            total_posts: 0,
            posts: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
