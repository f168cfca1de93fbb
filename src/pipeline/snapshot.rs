// src/pipeline/snapshot.rs

//! Channel snapshot assembly.
//!
//! Runs the Videos, Streams and Shorts sources of one channel in order and
//! collects their items and summaries into a [`ChannelSnapshot`].

use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    ChannelMeta, ChannelRef, ChannelSnapshot, CrawlerConfig, Cursor, Limits, SourceKind,
    StopReason, Tab,
};
use crate::pipeline::paginate::{Pager, SourceLimits, SourceRun, paginate};
use crate::platform::Platform;
use crate::services::channel::{about_continuation_token, apply_about, parse_channel_meta};
use crate::services::{INITIAL_DATA, NormalizedPage, extract_embedded_json, normalize_tab, selected_tab};

/// Crawl one channel.
///
/// Fetch and extraction errors on the Videos tab are returned, since the
/// channel metadata comes from that page. Failures in later sources are
/// recorded in their summaries.
pub async fn build_channel_snapshot(
    platform: &dyn Platform,
    config: &CrawlerConfig,
    channel: &ChannelRef,
    limits: &Limits,
) -> Result<ChannelSnapshot> {
    let delay = Duration::from_millis(config.request_delay_ms);
    let videos_url = channel.tab_url(&config.base_url, Tab::Videos);

    log::info!("Crawling {}", channel);
    let page = platform.fetch_page(&videos_url).await?;
    let data = extract_embedded_json(&page, INITIAL_DATA)?;
    let mut meta = parse_channel_meta(&data, &channel.url(&config.base_url))?;

    let videos = run_from_document(
        platform,
        SourceKind::Videos,
        &data,
        &videos_url,
        SourceLimits::for_source(SourceKind::Videos, limits, limits.count_limit),
        delay,
    )
    .await;
    let mut runs = vec![videos];

    let videos_hit_count = runs[0].summary.stop_reason == Some(StopReason::CountLimit);
    if limits.max_age_days.is_some() && !videos_hit_count {
        let remaining = limits
            .count_limit
            .map(|limit| limit.saturating_sub(runs[0].items.len()));
        let source_limits = SourceLimits::for_source(SourceKind::Streams, limits, remaining);
        runs.push(run_source(platform, config, channel, SourceKind::Streams, source_limits, delay).await);
    }

    if limits.shorts_limit > 0 {
        let source_limits = SourceLimits::for_source(SourceKind::Shorts, limits, None);
        runs.push(run_source(platform, config, channel, SourceKind::Shorts, source_limits, delay).await);
    }

    if let Err(e) = fetch_about(platform, config, channel, &mut meta).await {
        log::warn!("About panel for {} unavailable: {}", channel, e);
    }

    let mut snapshot = ChannelSnapshot {
        channel: meta,
        fetched_at: Utc::now(),
        sources: Vec::with_capacity(runs.len()),
        videos: Vec::new(),
    };
    for run in runs {
        log::info!(
            "{} {}: {} accepted, {} skipped, {} pages ({})",
            channel,
            run.summary.source,
            run.summary.accepted,
            run.summary.skipped,
            run.summary.pages,
            run.summary
                .stop_reason
                .map(|r| format!("{r:?}"))
                .or_else(|| run.summary.error.clone())
                .unwrap_or_default()
        );
        snapshot.videos.extend(run.items);
        snapshot.sources.push(run.summary);
    }

    Ok(snapshot)
}

/// Crawl many channels with bounded concurrency, keeping input order.
/// Channels that fail are logged and left out.
pub async fn build_snapshots(
    platform: &dyn Platform,
    config: &CrawlerConfig,
    refs: &[ChannelRef],
    limits: &Limits,
) -> Vec<ChannelSnapshot> {
    let concurrency = config.max_concurrent.max(1);

    stream::iter(refs)
        .map(|channel| async move {
            let result = build_channel_snapshot(platform, config, channel, limits).await;
            (channel, result)
        })
        .buffered(concurrency)
        .filter_map(|(channel, result)| async move {
            match result {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    log::error!("Skipping {}: {}", channel, e);
                    None
                }
            }
        })
        .collect()
        .await
}

/// Fetch a source's tab and page through it. Any failure ends up in the
/// run's summary.
async fn run_source(
    platform: &dyn Platform,
    config: &CrawlerConfig,
    channel: &ChannelRef,
    source: SourceKind,
    limits: SourceLimits,
    delay: Duration,
) -> SourceRun {
    let url = channel.tab_url(&config.base_url, source.tab());

    let data = match platform.fetch_page(&url).await.and_then(|page| {
        extract_embedded_json(&page, INITIAL_DATA)
    }) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("{} {} tab failed: {}", channel, source, e);
            return Pager::new(source, limits).finish(Some(e.to_string()));
        }
    };

    run_from_document(platform, source, &data, &url, limits, delay).await
}

async fn run_from_document(
    platform: &dyn Platform,
    source: SourceKind,
    data: &Value,
    url: &str,
    limits: SourceLimits,
    delay: Duration,
) -> SourceRun {
    let mut pager = Pager::new(source, limits);
    match first_page(data, source, url) {
        Some(page) => paginate(platform, pager, page, delay).await,
        None => {
            pager.stop_early(StopReason::EmptyPage);
            pager.finish(None)
        }
    }
}

/// Normalize the selected tab, or `None` when the platform served a
/// different tab (channels without the tab are redirected to Home).
fn first_page(data: &Value, source: SourceKind, url: &str) -> Option<NormalizedPage> {
    let Some(tab) = selected_tab(data) else {
        log::warn!("No selected tab on {} page {}", source, url);
        return None;
    };
    if !tab.is_tab(source.tab().as_path()) {
        log::info!(
            "{} tab not available, platform served '{}'",
            source,
            tab.title.as_deref().unwrap_or("unknown")
        );
        return None;
    }
    Some(normalize_tab(tab.content, source, url))
}

/// Merge the about panel into `meta`, following the deferred-panel
/// continuation when the page does not inline it.
async fn fetch_about(
    platform: &dyn Platform,
    config: &CrawlerConfig,
    channel: &ChannelRef,
    meta: &mut ChannelMeta,
) -> Result<()> {
    let url = channel.tab_url(&config.base_url, Tab::About);
    let page = platform.fetch_page(&url).await?;
    let data = extract_embedded_json(&page, INITIAL_DATA)?;
    if apply_about(meta, &data) {
        return Ok(());
    }

    let Some(token) = about_continuation_token(&data) else {
        log::debug!("No about panel on {}", url);
        return Ok(());
    };
    let response = platform.fetch_continuation(&Cursor::new(token, url)).await?;
    if !apply_about(meta, &response) {
        log::debug!("About continuation for {} carried no panel", channel);
    }
    Ok(())
}
