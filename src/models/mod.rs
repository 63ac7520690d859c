//! Data models for post resolution.

mod candidate;
mod post;

pub use candidate::{CandidateOrigin, MediaCandidate, ProbeResult, ScoredCandidate};
pub use post::{
    ImageRef, PageCrawlResult, ParsedAddressInfo, PostMedia, PostPayload, PostResult, UrlType,
    VIDEO_NOT_FOUND,
};
