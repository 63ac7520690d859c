//! Browser-driven extraction of post media.

pub mod browser;
pub mod extract;
pub mod http_client;
pub mod rank;
pub mod url;
pub mod video;

pub use browser::{
    BrowserEngineConfig, BrowserEngineType, BrowserSession, ChromiumLauncher, SessionLauncher,
    SharedSession,
};
pub use extract::{extract_static, StaticContent};
pub use http_client::{HttpProber, MediaProbe, ProbeConfig, ProbeRequest};
pub use rank::{CandidateRanker, RankOutcome};
pub use video::{CandidateCollector, CandidateSet};
