//! Values read back out of a browser session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cookie extracted from browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl BrowserCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
        }
    }
}

/// Join cookies into a single `Cookie` header value.
pub fn cookie_header(cookies: &[BrowserCookie]) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| !c.name.is_empty() && !c.value.is_empty())
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Entry of the network-activity log captured while a page renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Outbound request with the headers the browser sent.
    Request {
        url: String,
        headers: HashMap<String, String>,
    },
    Response {
        url: String,
    },
}

impl NetworkEvent {
    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. } | Self::Response { url } => url,
        }
    }

    pub fn request_headers(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Request { headers, .. } => Some(headers),
            Self::Response { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header() {
        let cookies = vec![
            BrowserCookie::new("c_user", "1"),
            BrowserCookie::new("", "skipped"),
            BrowserCookie::new("xs", "a%3Ab"),
        ];
        assert_eq!(cookie_header(&cookies).as_deref(), Some("c_user=1; xs=a%3Ab"));
        assert_eq!(cookie_header(&[]), None);
    }

    #[test]
    fn test_cookie_header_drops_empty_values() {
        let cookies = vec![
            BrowserCookie::new("datr", "x"),
            BrowserCookie::new("empty", ""),
        ];
        assert_eq!(cookie_header(&cookies).as_deref(), Some("datr=x"));
        assert_eq!(cookie_header(&[BrowserCookie::new("empty", "")]), None);
    }
}
