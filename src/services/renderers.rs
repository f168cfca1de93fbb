// src/services/renderers.rs

//! Renderer normalization.
//!
//! Converts a tab's data subtree, or a continuation response, into canonical
//! [`ContentItem`]s. Content lists come in several shapes; they are matched
//! in a fixed priority order and anything else is reported as
//! [`TabContents::Unrecognized`] so format drift shows up in the logs instead
//! of silently yielding nothing.

use serde_json::Value;

use crate::models::{ContentItem, ContentKind, Cursor, SourceKind};
use crate::utils::text::{accessibility_label, json_text};

const MEMBERS_ONLY_BADGE: &str = "BADGE_STYLE_TYPE_MEMBERS_ONLY";
const MEMBERS_ONLY_ICON: &str = "SPONSORSHIP_STAR";
const SHORTS_PATH_SEGMENT: &str = "/shorts/";
const SHORTS_MARKER: &str = "SHORTS";

/// Known content-list shapes of a channel tab, in match priority order.
#[derive(Debug)]
pub enum TabContents<'a> {
    /// `richGridRenderer.contents` (current Videos/Streams/Shorts tabs)
    RichGrid(&'a [Value]),
    /// `sectionListRenderer → itemSectionRenderer → gridRenderer.items`
    Grid(&'a [Value]),
    /// Home-style `sectionListRenderer` of shelves, flattened in order
    ShelfList(Vec<&'a Value>),
    /// `reelShelfRenderer.items`
    ReelShelf(&'a [Value]),
    /// None of the above; carries the subtree's top-level keys
    Unrecognized(Vec<String>),
}

/// One entry of a content list.
#[derive(Debug)]
pub enum ContentNode<'a> {
    /// `videoRenderer` / `gridVideoRenderer`
    Video(&'a Value),
    /// `reelItemRenderer`
    Reel(&'a Value),
    /// `shortsLockupViewModel`
    ShortsLockup(&'a Value),
    /// `continuationItemRenderer`
    Continuation(&'a Value),
    /// Known layout-only node (section headers, messages)
    Layout,
    Unrecognized,
}

/// Items and continuation extracted from one page or response.
#[derive(Debug, Default)]
pub struct NormalizedPage {
    pub items: Vec<ContentItem>,
    pub cursor: Option<Cursor>,
    pub members_only_dropped: usize,
    pub unrecognized: usize,
}

/// The selected tab of a channel page.
#[derive(Debug)]
pub struct SelectedTab<'a> {
    pub title: Option<String>,
    /// Tab URL path, e.g. `/@creator/videos`
    pub url: Option<&'a str>,
    pub content: &'a Value,
}

impl SelectedTab<'_> {
    /// Whether this tab is the requested one (URL ends with `/{segment}`).
    pub fn is_tab(&self, segment: &str) -> bool {
        self.url
            .map(|url| url.trim_end_matches('/').ends_with(&format!("/{segment}")))
            .unwrap_or(false)
    }
}

/// Find the tab marked as selected in a channel page document.
pub fn selected_tab(data: &Value) -> Option<SelectedTab<'_>> {
    let tabs = data
        .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
        .or_else(|| data.pointer("/contents/singleColumnBrowseResultsRenderer/tabs"))?
        .as_array()?;

    tabs.iter()
        .filter_map(|tab| {
            tab.get("tabRenderer")
                .or_else(|| tab.get("expandableTabRenderer"))
        })
        .find(|renderer| renderer.get("selected").and_then(Value::as_bool) == Some(true))
        .and_then(|renderer| {
            Some(SelectedTab {
                title: renderer.get("title").and_then(json_text),
                url: renderer
                    .pointer("/endpoint/commandMetadata/webCommandMetadata/url")
                    .and_then(Value::as_str),
                content: renderer.get("content")?,
            })
        })
}

/// Match a tab subtree against the known shapes.
pub fn classify_tab(content: &Value) -> TabContents<'_> {
    if let Some(items) = content
        .pointer("/richGridRenderer/contents")
        .and_then(Value::as_array)
    {
        return TabContents::RichGrid(items);
    }

    let sections = section_items(content);

    if let Some(items) = sections.iter().find_map(|node| {
        node.pointer("/gridRenderer/items")
            .and_then(Value::as_array)
    }) {
        return TabContents::Grid(items);
    }

    let shelf_items: Vec<&Value> = sections
        .iter()
        .filter_map(|node| node.pointer("/shelfRenderer/content"))
        .filter_map(|shelf| {
            shelf
                .pointer("/horizontalListRenderer/items")
                .or_else(|| shelf.pointer("/expandedShelfContentsRenderer/items"))
                .or_else(|| shelf.pointer("/gridRenderer/items"))
                .and_then(Value::as_array)
        })
        .flatten()
        .collect();
    if !shelf_items.is_empty() {
        return TabContents::ShelfList(shelf_items);
    }

    if let Some(items) = content
        .pointer("/reelShelfRenderer/items")
        .and_then(Value::as_array)
        .or_else(|| {
            sections.iter().find_map(|node| {
                node.pointer("/reelShelfRenderer/items")
                    .and_then(Value::as_array)
            })
        })
    {
        return TabContents::ReelShelf(items);
    }

    let keys = content
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    TabContents::Unrecognized(keys)
}

/// Entries of `sectionListRenderer → itemSectionRenderer` contents, in order.
fn section_items(content: &Value) -> Vec<&Value> {
    content
        .pointer("/sectionListRenderer/contents")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|section| {
            section
                .pointer("/itemSectionRenderer/contents")
                .and_then(Value::as_array)
        })
        .flatten()
        .collect()
}

/// Classify a single content-list entry.
pub fn classify_node(node: &Value) -> ContentNode<'_> {
    let node = node.pointer("/richItemRenderer/content").unwrap_or(node);

    if let Some(r) = node
        .get("videoRenderer")
        .or_else(|| node.get("gridVideoRenderer"))
    {
        ContentNode::Video(r)
    } else if let Some(r) = node.get("reelItemRenderer") {
        ContentNode::Reel(r)
    } else if let Some(r) = node.get("shortsLockupViewModel") {
        ContentNode::ShortsLockup(r)
    } else if let Some(r) = node.get("continuationItemRenderer") {
        ContentNode::Continuation(r)
    } else if node.get("richSectionRenderer").is_some() || node.get("messageRenderer").is_some() {
        ContentNode::Layout
    } else {
        ContentNode::Unrecognized
    }
}

/// Normalize the content of a tab.
pub fn normalize_tab(content: &Value, source: SourceKind, context_url: &str) -> NormalizedPage {
    let nodes: Vec<&Value> = match classify_tab(content) {
        TabContents::RichGrid(items) | TabContents::Grid(items) | TabContents::ReelShelf(items) => {
            items.iter().collect()
        }
        TabContents::ShelfList(items) => items,
        TabContents::Unrecognized(keys) => {
            log::warn!(
                "Unrecognized {} tab shape (keys: {})",
                source,
                keys.join(", ")
            );
            return NormalizedPage::default();
        }
    };
    normalize_nodes(nodes, source, context_url)
}

/// Normalize a continuation response.
pub fn normalize_continuation(
    response: &Value,
    source: SourceKind,
    context_url: &str,
) -> NormalizedPage {
    let nodes: Vec<&Value> = ["onResponseReceivedActions", "onResponseReceivedEndpoints"]
        .iter()
        .filter_map(|key| response.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|action| {
            action
                .pointer("/appendContinuationItemsAction/continuationItems")
                .or_else(|| action.pointer("/reloadContinuationItemsCommand/continuationItems"))
                .and_then(Value::as_array)
        })
        .flatten()
        .collect();

    if nodes.is_empty() {
        log::debug!("Continuation response for {} carried no items", source);
    }
    normalize_nodes(nodes, source, context_url)
}

/// Map content-list entries to items, in source order.
pub fn normalize_nodes<'a>(
    nodes: impl IntoIterator<Item = &'a Value>,
    source: SourceKind,
    context_url: &str,
) -> NormalizedPage {
    let mut page = NormalizedPage::default();

    for node in nodes {
        match classify_node(node) {
            ContentNode::Video(r) => {
                if is_members_only(r) {
                    page.members_only_dropped += 1;
                } else if let Some(item) = video_item(r, source) {
                    page.items.push(item);
                }
            }
            ContentNode::Reel(r) => page.items.extend(reel_item(r)),
            ContentNode::ShortsLockup(r) => page.items.extend(shorts_lockup_item(r)),
            ContentNode::Continuation(r) => {
                if let Some(token) = continuation_token(r) {
                    page.cursor = Some(Cursor::new(token, context_url));
                }
            }
            ContentNode::Layout => {}
            ContentNode::Unrecognized => page.unrecognized += 1,
        }
    }

    if page.unrecognized > 0 {
        log::debug!(
            "Skipped {} unrecognized {} nodes",
            page.unrecognized,
            source
        );
    }
    page
}

fn video_item(r: &Value, source: SourceKind) -> Option<ContentItem> {
    let id = r.get("videoId")?.as_str()?;
    let mut item = ContentItem::new(
        id,
        r.get("title").and_then(json_text).unwrap_or_default(),
        classify_kind(r, source),
    );

    item.view_count_text = r
        .get("viewCountText")
        .or_else(|| r.get("shortViewCountText"))
        .and_then(json_text)
        .unwrap_or_default();
    item.relative_published_time_text = r
        .get("publishedTimeText")
        .and_then(json_text)
        .or_else(|| upcoming_text(r))
        .unwrap_or_default();
    item.duration_text = duration_text(r).unwrap_or_default();

    Some(item)
}

fn reel_item(r: &Value) -> Option<ContentItem> {
    let id = r.get("videoId")?.as_str()?;
    let mut item = ContentItem::new(
        id,
        r.get("headline").and_then(json_text).unwrap_or_default(),
        ContentKind::Short,
    );
    item.view_count_text = r
        .get("viewCountText")
        .and_then(json_text)
        .unwrap_or_default();
    Some(item)
}

fn shorts_lockup_item(r: &Value) -> Option<ContentItem> {
    let id = r
        .pointer("/onTap/innertubeCommand/reelWatchEndpoint/videoId")
        .and_then(Value::as_str)
        .or_else(|| {
            r.get("entityId")
                .and_then(Value::as_str)
                .and_then(|e| e.strip_prefix("shorts-shelf-item-"))
        })?;

    let mut item = ContentItem::new(
        id,
        r.pointer("/overlayMetadata/primaryText")
            .and_then(json_text)
            .unwrap_or_default(),
        ContentKind::Short,
    );
    item.view_count_text = r
        .pointer("/overlayMetadata/secondaryText")
        .and_then(json_text)
        .unwrap_or_default();
    Some(item)
}

/// Short detection first (navigation path, then overlay marker), then live
/// markers; otherwise the source's default kind.
fn classify_kind(r: &Value, source: SourceKind) -> ContentKind {
    let nav_url = r
        .pointer("/navigationEndpoint/commandMetadata/webCommandMetadata/url")
        .and_then(Value::as_str)
        .unwrap_or("");
    if nav_url.contains(SHORTS_PATH_SEGMENT)
        || r.pointer("/navigationEndpoint/reelWatchEndpoint").is_some()
    {
        return ContentKind::Short;
    }

    if time_status_overlays(r).any(|o| {
        o.get("style").and_then(Value::as_str) == Some(SHORTS_MARKER)
            || o.pointer("/icon/iconType").and_then(Value::as_str) == Some(SHORTS_MARKER)
    }) {
        return ContentKind::Short;
    }

    let live = r.get("upcomingEventData").is_some()
        || time_status_overlays(r).any(|o| {
            matches!(
                o.get("style").and_then(Value::as_str),
                Some("LIVE") | Some("UPCOMING")
            )
        });
    if live {
        ContentKind::Stream
    } else {
        source.default_kind()
    }
}

fn is_members_only(r: &Value) -> bool {
    r.get("badges")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|b| b.get("metadataBadgeRenderer"))
        .any(|badge| {
            badge.get("style").and_then(Value::as_str) == Some(MEMBERS_ONLY_BADGE)
                || badge.pointer("/icon/iconType").and_then(Value::as_str)
                    == Some(MEMBERS_ONLY_ICON)
        })
}

fn time_status_overlays(r: &Value) -> impl Iterator<Item = &Value> {
    r.get("thumbnailOverlays")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|o| o.get("thumbnailOverlayTimeStatusRenderer"))
}

/// Explicit length text first, then the default-style overlay text, then the
/// accessibility label of either.
fn duration_text(r: &Value) -> Option<String> {
    let length = r.get("lengthText");
    let overlay_text = time_status_overlays(r)
        .find(|o| o.get("style").and_then(Value::as_str).unwrap_or("DEFAULT") == "DEFAULT")
        .and_then(|o| o.get("text"));

    length
        .and_then(json_text)
        .or_else(|| overlay_text.and_then(json_text))
        .or_else(|| length.and_then(accessibility_label))
        .or_else(|| overlay_text.and_then(accessibility_label))
}

/// Relative-time stand-in for streams that have not started.
fn upcoming_text(r: &Value) -> Option<String> {
    if let Some(event) = r.get("upcomingEventData") {
        return Some(
            event
                .get("upcomingEventText")
                .and_then(json_text)
                .map(|t| t.replace("DATE_PLACEHOLDER", "").trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Scheduled".to_string()),
        );
    }
    time_status_overlays(r)
        .any(|o| o.get("style").and_then(Value::as_str) == Some("UPCOMING"))
        .then(|| "Upcoming".to_string())
}

fn continuation_token(r: &Value) -> Option<String> {
    let endpoint = r
        .get("continuationEndpoint")
        .or_else(|| r.pointer("/button/buttonRenderer/command"))?;

    endpoint
        .pointer("/continuationCommand/token")
        .and_then(Value::as_str)
        .or_else(|| {
            endpoint
                .pointer("/commandExecutorCommand/commands")
                .and_then(Value::as_array)?
                .iter()
                .find_map(|c| c.pointer("/continuationCommand/token").and_then(Value::as_str))
        })
        .map(str::to_string)
}
