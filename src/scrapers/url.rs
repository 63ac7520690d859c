//! Post address normalization.
//!
//! Every navigation goes through the mobile site, which renders far less
//! script than the desktop one and exposes plain `<a>`/`<img>` markup.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::{ParsedAddressInfo, UrlType};

/// Domain every accepted post address must reference.
pub const TARGET_DOMAIN: &str = "facebook.com";

/// Origin relative links on the mobile site resolve against.
pub const MOBILE_ORIGIN: &str = "https://m.facebook.com";

/// Query parameters that split one media object into byte-range fragments.
pub const BYTE_RANGE_PARAMS: [&str; 2] = ["bytestart", "byteend"];

static POST_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/]+)/posts/([^/?]+)").unwrap());
static PHOTO_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/]+)/photos/[^/]+/([^/?]+)").unwrap());

fn has_scheme(address: &str) -> bool {
    let lower = address.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn with_secure_scheme(address: &str) -> String {
    let address = address.trim();
    if has_scheme(address) {
        address.to_string()
    } else {
        format!("https://{}", address.trim_start_matches('/'))
    }
}

/// Whether the address points at the target domain or one of its subdomains.
///
/// Scheme-less input such as `www.facebook.com/x` is accepted.
pub fn is_target_domain(address: &str) -> bool {
    let Ok(url) = Url::parse(&with_secure_scheme(address)) else {
        return false;
    };
    url.host_str().is_some_and(|host| {
        let host = host.trim_end_matches('.');
        host == TARGET_DOMAIN
            || host
                .strip_suffix(TARGET_DOMAIN)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// `blob:` handles only exist inside the page that created them.
pub fn is_in_memory_address(address: &str) -> bool {
    address.trim_start().to_ascii_lowercase().starts_with("blob:")
}

/// Rewrite a post address into the mobile form the browser should visit.
///
/// Adds `https://` when no scheme is present, upgrades `http`, lower-cases the
/// host, drops a leading `www.` and prefixes `m.` when missing. Unparseable
/// input is returned with only the scheme fix applied.
pub fn to_navigation_target(address: &str) -> String {
    let with_scheme = with_secure_scheme(address);
    let Ok(mut url) = Url::parse(&with_scheme) else {
        return with_scheme;
    };

    if url.scheme() == "http" && url.set_scheme("https").is_err() {
        return with_scheme;
    }

    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return url.to_string();
    };
    let bare = host.strip_prefix("www.").unwrap_or(&host);
    let mobile = if bare.starts_with("m.") {
        bare.to_string()
    } else {
        format!("m.{}", bare)
    };

    if url.set_host(Some(&mobile)).is_err() {
        return with_scheme;
    }
    url.to_string()
}

/// Remove `bytestart`/`byteend` so fragments of one media object collapse.
///
/// All other parameters keep their original bytes and order. Addresses with
/// nothing to strip are returned untouched.
pub fn strip_byte_range_params(address: &str) -> String {
    let Ok(mut url) = Url::parse(address) else {
        return address.to_string();
    };

    let rebuilt = {
        let Some(query) = url.query() else {
            return address.to_string();
        };
        let pairs: Vec<&str> = query.split('&').collect();
        let kept: Vec<&str> = pairs
            .iter()
            .copied()
            .filter(|pair| {
                let key = pair.split('=').next().unwrap_or_default();
                !BYTE_RANGE_PARAMS.contains(&key)
            })
            .collect();
        if kept.len() == pairs.len() {
            return address.to_string();
        }
        kept.join("&")
    };

    url.set_query(if rebuilt.is_empty() {
        None
    } else {
        Some(&rebuilt)
    });
    url.to_string()
}

/// Pull page name and post id out of `/{page}/posts/{id}` or
/// `/{page}/photos/.../{id}`. Anything else yields an all-empty result.
pub fn parse_address_info(address: &str) -> ParsedAddressInfo {
    let Ok(url) = Url::parse(&with_secure_scheme(address)) else {
        return ParsedAddressInfo::default();
    };
    let path = url.path();

    if let Some(caps) = POST_PATH.captures(path) {
        return ParsedAddressInfo {
            page_name: Some(caps[1].to_string()),
            post_id: Some(caps[2].to_string()),
            url_type: UrlType::Post,
        };
    }

    if let Some(caps) = PHOTO_PATH.captures(path) {
        return ParsedAddressInfo {
            page_name: Some(caps[1].to_string()),
            post_id: Some(caps[2].to_string()),
            url_type: UrlType::Photo,
        };
    }

    ParsedAddressInfo::default()
}

/// Resolve a link found on a mobile page to an absolute address.
pub fn resolve_mobile_link(href: &str) -> String {
    if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("{}{}", MOBILE_ORIGIN, href)
    } else {
        href.to_string()
    }
}

/// Listing addresses may be a bare page name (`"nasa"`) or a full URL.
pub fn listing_target(page: &str) -> String {
    let page = page.trim();
    if has_scheme(page) || is_target_domain(page) {
        to_navigation_target(page)
    } else {
        format!("{}/{}", MOBILE_ORIGIN, page.trim_matches('/'))
    }
}

/// Drop query string and fragment.
pub fn strip_query(address: &str) -> &str {
    let end = address.find(['?', '#']).unwrap_or(address.len());
    &address[..end]
}
