//! One-shot resolution commands.

use anyhow::Context;
use console::style;
use serde::Serialize;

use crate::config::Settings;
use crate::scrapers::url::is_target_domain;
use crate::services::PostResolver;

/// Images and text of one post.
pub async fn cmd_post(settings: &Settings, url: &str) -> anyhow::Result<()> {
    require_target_domain(url)?;
    eprintln!("{} Resolving post {}", style("→").cyan(), url);

    let resolver = create_resolver(settings)?;
    let outcome = resolver.resolve_post_media(url).await;
    resolver.session().shutdown().await;

    let result = outcome?;
    print_json(&result)?;
    finish(result.success, result.error.as_deref())
}

/// Best playable video address of one post.
pub async fn cmd_video(settings: &Settings, url: &str) -> anyhow::Result<()> {
    require_target_domain(url)?;
    eprintln!("{} Resolving video {}", style("→").cyan(), url);

    let resolver = create_resolver(settings)?;
    let outcome = resolver.resolve_post_video(url).await;
    resolver.session().shutdown().await;

    let result = outcome?;
    print_json(&result)?;
    finish(result.success, result.error.as_deref())
}

/// Posts from a page listing.
pub async fn cmd_page(settings: &Settings, page: &str, count: usize) -> anyhow::Result<()> {
    eprintln!(
        "{} Crawling {} for {} posts",
        style("→").cyan(),
        page,
        count
    );

    let resolver = create_resolver(settings)?;
    let outcome = resolver.resolve_page_listing(page, count).await;
    resolver.session().shutdown().await;

    let result = outcome?;
    print_json(&result)?;
    finish(result.success, result.error.as_deref())
}

fn create_resolver(settings: &Settings) -> anyhow::Result<PostResolver> {
    settings
        .create_resolver()
        .context("Failed to create resolver")
}

fn require_target_domain(url: &str) -> anyhow::Result<()> {
    if !is_target_domain(url) {
        anyhow::bail!("{} is not a facebook.com address", url);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn finish(success: bool, error: Option<&str>) -> anyhow::Result<()> {
    if success {
        eprintln!("  {} Done", style("✓").green());
        Ok(())
    } else {
        eprintln!(
            "  {} {}",
            style("✗").red(),
            error.unwrap_or("resolution failed")
        );
        anyhow::bail!("resolution failed")
    }
}
