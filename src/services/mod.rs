//! Service layer for post resolution.
//!
//! Services are shared by the CLI and the HTTP API.

pub mod crawler;
pub mod resolver;

pub use crawler::{harvest_post_links, max_scroll_attempts, PageCrawler};
pub use resolver::{PostResolver, ResolveStage, SettleDelays};
