//! fbmedia - public post media extraction.
//!
//! Resolves images, text and playable video addresses from public
//! social-media posts by rendering them in an automated browser session,
//! then confirming candidate media with real HTTP probes.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod server;
pub mod services;

pub use error::{Result, ScrapeError};
pub use models::{PageCrawlResult, PostResult};
pub use services::{PostResolver, SettleDelays};
