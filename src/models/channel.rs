// src/models/channel.rs

//! Channel reference, metadata and snapshot structures.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ContentItem, ContentKind};

/// A channel page tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Videos,
    Streams,
    Shorts,
    About,
}

impl Tab {
    /// Last path segment of the tab URL.
    pub fn as_path(&self) -> &'static str {
        match self {
            Tab::Videos => "videos",
            Tab::Streams => "streams",
            Tab::Shorts => "shorts",
            Tab::About => "about",
        }
    }
}

/// One of the three paginated content sources of a channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Videos,
    Streams,
    Shorts,
}

impl SourceKind {
    pub fn tab(&self) -> Tab {
        match self {
            SourceKind::Videos => Tab::Videos,
            SourceKind::Streams => Tab::Streams,
            SourceKind::Shorts => Tab::Shorts,
        }
    }

    /// Kind assigned to items of this source unless they classify as Shorts.
    pub fn default_kind(&self) -> ContentKind {
        match self {
            SourceKind::Videos => ContentKind::Video,
            SourceKind::Streams => ContentKind::Stream,
            SourceKind::Shorts => ContentKind::Short,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Videos => "videos",
            SourceKind::Streams => "streams",
            SourceKind::Shorts => "shorts",
        };
        f.write_str(name)
    }
}

/// Why a source run stopped paging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    CountLimit,
    AgeLimit,
    NoMorePages,
    EmptyPage,
}

/// Outcome of one source run, kept with the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSummary {
    pub source: SourceKind,
    pub accepted: usize,
    pub skipped: usize,
    pub pages: usize,
    /// Set when the run reached a stop condition
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    /// Set when the run was cut short by a fetch or extraction failure
    #[serde(default)]
    pub error: Option<String>,
}

impl SourceSummary {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.stop_reason.is_some()
    }
}

/// Reference to a channel, normalized to its URL path (`/@handle`,
/// `/channel/UC…`, `/c/name` or `/user/name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    path: String,
}

impl ChannelRef {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Channel root URL on the given platform origin.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }

    /// URL of one tab of the channel.
    pub fn tab_url(&self, base_url: &str, tab: Tab) -> String {
        format!("{}/{}", self.url(base_url), tab.as_path())
    }

    fn from_segments<'a>(input: &str, mut segments: impl Iterator<Item = &'a str>) -> Result<Self> {
        let first = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::channel_ref(input, "URL has no channel path"))?;

        let path = if first.starts_with('@') && first.len() > 1 {
            format!("/{first}")
        } else if matches!(first, "channel" | "c" | "user") {
            let name = segments
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| AppError::channel_ref(input, "missing channel name"))?;
            format!("/{first}/{name}")
        } else {
            return Err(AppError::channel_ref(
                input,
                format!("unsupported channel path '/{first}'"),
            ));
        };

        Ok(Self { path })
    }
}

impl FromStr for ChannelRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();

        if input.starts_with('@') {
            return Self::from_segments(input, std::iter::once(input));
        }
        if is_channel_id(input) {
            return Ok(Self {
                path: format!("/channel/{input}"),
            });
        }

        let looks_like_url = input.starts_with("http://")
            || input.starts_with("https://")
            || input.contains("youtube.com/");
        if !looks_like_url {
            return Err(AppError::channel_ref(
                input,
                "expected @handle, channel id or channel URL",
            ));
        }

        let absolute = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{input}")
        };
        let url = url::Url::parse(&absolute)?;
        let segments = url
            .path_segments()
            .ok_or_else(|| AppError::channel_ref(input, "URL has no path"))?;
        Self::from_segments(input, segments)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

fn is_channel_id(s: &str) -> bool {
    s.len() == 24
        && s.starts_with("UC")
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// An external link listed on the channel's about panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelLink {
    pub title: String,
    pub url: String,
}

/// Channel-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChannelMeta {
    /// Platform channel id (`UC…`)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub subscriber_count_text: Option<String>,
    #[serde(default)]
    pub video_count_text: Option<String>,
    #[serde(default)]
    pub view_count_text: Option<String>,
    #[serde(default)]
    pub joined_date_text: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub links: Vec<ChannelLink>,
}

impl ChannelMeta {
    /// Stable identity: the channel id, or the URL when the id is unknown.
    pub fn key(&self) -> &str {
        if self.id.is_empty() { &self.url } else { &self.id }
    }
}

/// Channel metadata plus its items for one crawl.
///
/// `videos` holds the Videos block, then Streams, then Shorts, each block in
/// fetch order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelSnapshot {
    pub channel: ChannelMeta,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<SourceSummary>,
    #[serde(default)]
    pub videos: Vec<ContentItem>,
}

impl ChannelSnapshot {
    /// Every attempted source ran to a stop condition without error.
    pub fn is_complete(&self) -> bool {
        self.sources.iter().all(SourceSummary::is_complete)
    }

    /// Items still waiting for detail backfill.
    pub fn pending_enrichment(&self) -> usize {
        self.videos.iter().filter(|v| v.needs_enrichment()).count()
    }
}
