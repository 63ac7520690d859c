//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod scrape;
mod serve;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "fbmedia")]
#[command(about = "Extract images, text and video addresses from public posts")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind (port, host, or host:port)
        bind: Option<String>,
    },

    /// Images and text of one post
    Post {
        /// Post address
        url: String,
    },

    /// Best playable video address of one post
    Video {
        /// Post address
        url: String,
    },

    /// Posts from a page listing
    Page {
        /// Page name or listing address
        page: String,
        /// Number of posts to resolve
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (settings, _config) = load_settings(options)
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Post { url } => scrape::cmd_post(&settings, &url).await,
        Commands::Video { url } => scrape::cmd_video(&settings, &url).await,
        Commands::Page { page, count } => scrape::cmd_page(&settings, &page, count).await,
    }
}
