// src/services/channel.rs

//! Channel metadata parsing.
//!
//! Reads the channel-level fields out of a tab page's data document (metadata
//! renderer plus page header) and, when available, the about panel view model.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ChannelLink, ChannelMeta};
use crate::utils::text::json_text;

/// Build channel metadata from a channel tab document.
///
/// `page_url` is used when the document carries no canonical channel URL.
pub fn parse_channel_meta(data: &Value, page_url: &str) -> Result<ChannelMeta> {
    let renderer = data.pointer("/metadata/channelMetadataRenderer");
    let header = data.get("header");

    let title = renderer
        .and_then(|r| r.get("title"))
        .and_then(json_text)
        .or_else(|| header.and_then(header_title))
        .ok_or_else(|| AppError::extraction("channel page has no title metadata"))?;

    let str_field = |key: &str| {
        renderer
            .and_then(|r| r.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let vanity_url = str_field("vanityChannelUrl");
    let mut meta = ChannelMeta {
        id: str_field("externalId").unwrap_or_default(),
        title,
        handle: vanity_url.as_deref().and_then(handle_from_url),
        description: str_field("description").unwrap_or_default(),
        url: str_field("channelUrl")
            .or(vanity_url)
            .unwrap_or_else(|| page_url.to_string()),
        ..ChannelMeta::default()
    };

    if let Some(header) = header {
        apply_header(&mut meta, header);
    }
    Ok(meta)
}

fn header_title(header: &Value) -> Option<String> {
    header
        .pointer("/c4TabbedHeaderRenderer/title")
        .and_then(json_text)
        .or_else(|| {
            header
                .pointer("/pageHeaderRenderer/pageTitle")
                .and_then(json_text)
        })
}

/// Handle and count texts from either header generation.
fn apply_header(meta: &mut ChannelMeta, header: &Value) {
    if let Some(c4) = header.get("c4TabbedHeaderRenderer") {
        if meta.handle.is_none() {
            meta.handle = c4.get("channelHandleText").and_then(json_text);
        }
        meta.subscriber_count_text = c4.get("subscriberCountText").and_then(json_text);
        meta.video_count_text = c4.get("videosCountText").and_then(json_text);
        return;
    }

    let rows = header
        .pointer("/pageHeaderRenderer/content/pageHeaderViewModel/metadata/contentMetadataViewModel/metadataRows")
        .and_then(Value::as_array);

    for part in rows
        .into_iter()
        .flatten()
        .filter_map(|row| row.get("metadataParts").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| part.get("text").and_then(json_text))
    {
        let lower = part.to_lowercase();
        if part.starts_with('@') {
            if meta.handle.is_none() {
                meta.handle = Some(part);
            }
        } else if lower.contains("subscriber") {
            meta.subscriber_count_text = Some(part);
        } else if lower.contains("video") {
            meta.video_count_text = Some(part);
        }
    }
}

/// `@handle` from a vanity URL such as `http://www.youtube.com/@creator`.
fn handle_from_url(url: &str) -> Option<String> {
    url.rsplit('/')
        .next()
        .filter(|segment| segment.starts_with('@') && segment.len() > 1)
        .map(str::to_string)
}

/// Merge the about panel into `meta`. Returns false when `data` holds no
/// `aboutChannelViewModel`.
pub fn apply_about(meta: &mut ChannelMeta, data: &Value) -> bool {
    let Some(about) = find_key(data, "aboutChannelViewModel") else {
        return false;
    };

    let text = |key: &str| about.get(key).and_then(json_text);

    if let Some(description) = text("description") {
        meta.description = description;
    }
    if let Some(id) = text("channelId").filter(|_| meta.id.is_empty()) {
        meta.id = id;
    }
    meta.subscriber_count_text = text("subscriberCountText").or(meta.subscriber_count_text.take());
    meta.video_count_text = text("videoCountText").or(meta.video_count_text.take());
    meta.view_count_text = text("viewCountText").or(meta.view_count_text.take());
    meta.joined_date_text = text("joinedDateText").or(meta.joined_date_text.take());
    meta.country = text("country").or(meta.country.take());

    let links: Vec<ChannelLink> = about
        .get("links")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|l| l.get("channelExternalLinkViewModel"))
        .filter_map(|l| {
            Some(ChannelLink {
                title: l.get("title").and_then(json_text)?,
                url: l.get("link").and_then(json_text)?,
            })
        })
        .collect();
    if !links.is_empty() {
        meta.links = links;
    }
    true
}

/// Continuation token that loads the about panel, if the page defers it.
pub fn about_continuation_token(data: &Value) -> Option<String> {
    find_key(data, "aboutChannelRenderer")
        .or_else(|| find_key(data, "engagementPanelSectionListRenderer"))
        .and_then(|panel| find_key(panel, "continuationCommand"))
        .and_then(|command| command.get("token"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Depth-first search for the first value stored under `key`.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}
