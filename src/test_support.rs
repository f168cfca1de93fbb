//! Scripted collaborators and page fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{Cursor, Library};
use crate::platform::Platform;
use crate::services::ItemDetail;
use crate::storage::SnapshotStore;

/// Scripted answer to a detail request.
#[derive(Debug, Clone)]
pub enum DetailReply {
    Detail(ItemDetail),
    RateLimited,
    Fail,
}

/// [`Platform`] answering from fixed tables. Unknown pages and tokens fail
/// with 404; unknown detail ids answer with a full detail. Rate-limit
/// replies come back without the detail delay.
#[derive(Default)]
pub struct MockPlatform {
    pages: HashMap<String, String>,
    continuations: HashMap<String, Value>,
    details: HashMap<String, DetailReply>,
    detail_delay: Duration,
    continuation_calls: AtomicUsize,
    detail_calls: Mutex<Vec<String>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn with_continuation(mut self, token: impl Into<String>, response: Value) -> Self {
        self.continuations.insert(token.into(), response);
        self
    }

    pub fn with_detail(mut self, id: impl Into<String>, reply: DetailReply) -> Self {
        self.details.insert(id.into(), reply);
        self
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }

    pub fn continuation_calls(&self) -> usize {
        self.continuation_calls.load(Ordering::SeqCst)
    }

    /// Detail ids requested so far, in request order.
    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub fn full_detail(id: &str) -> ItemDetail {
        ItemDetail {
            publish_date: Some("2024-01-01".into()),
            description: Some(format!("Description of {id}")),
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or_else(|| AppError::Fetch {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn fetch_continuation(&self, cursor: &Cursor) -> Result<Value> {
        self.continuation_calls.fetch_add(1, Ordering::SeqCst);
        self.continuations
            .get(&cursor.token)
            .cloned()
            .ok_or_else(|| AppError::Fetch {
                url: format!("browse:{}", cursor.token),
                status: 404,
            })
    }

    async fn fetch_item_detail(&self, item_id: &str) -> Result<ItemDetail> {
        self.detail_calls.lock().unwrap().push(item_id.to_string());
        let url = format!("watch:{item_id}");
        let reply = self.details.get(item_id);
        if let Some(DetailReply::RateLimited) = reply {
            return Err(AppError::RateLimited { url });
        }
        if !self.detail_delay.is_zero() {
            tokio::time::sleep(self.detail_delay).await;
        }
        match reply {
            Some(DetailReply::Detail(detail)) => Ok(detail.clone()),
            Some(DetailReply::RateLimited) => Err(AppError::RateLimited { url }),
            Some(DetailReply::Fail) => Err(AppError::Fetch { url, status: 500 }),
            None => Ok(Self::full_detail(item_id)),
        }
    }
}

/// In-memory [`SnapshotStore`] recording every save and when it happened.
#[derive(Default)]
pub struct MemoryStore {
    library: Mutex<Library>,
    saves: Mutex<Vec<(Instant, Library)>>,
    fail_load: bool,
}

impl MemoryStore {
    pub fn new(library: Library) -> Self {
        Self {
            library: Mutex::new(library),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<Library> {
        self.saves.lock().unwrap().iter().map(|(_, l)| l.clone()).collect()
    }

    /// Clock readings of every save, in order.
    pub fn save_times(&self) -> Vec<Instant> {
        self.saves.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn current(&self) -> Library {
        self.library.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Library> {
        if self.fail_load {
            return Err(AppError::Io(std::io::Error::other("store offline")));
        }
        Ok(self.current())
    }

    async fn save(&self, library: &Library) -> Result<()> {
        *self.library.lock().unwrap() = library.clone();
        self.saves
            .lock()
            .unwrap()
            .push((Instant::now(), library.clone()));
        Ok(())
    }
}

/// Page documents in the shapes the platform serves.
pub mod fixtures {
    use chrono::Utc;
    use serde_json::{Value, json};

    use crate::models::{ChannelMeta, ChannelSnapshot, ContentItem, ContentKind, Library};

    pub const CHANNEL_ID: &str = "UCabcdefghijklmnopqrstuv";
    pub const BASE_URL: &str = "https://www.youtube.com";

    pub fn video(id: &str, age: &str, length: &str) -> Value {
        json!({ "richItemRenderer": { "content": { "videoRenderer": {
            "videoId": id,
            "title": { "runs": [{ "text": format!("Video {id}") }] },
            "viewCountText": { "simpleText": "1,234 views" },
            "publishedTimeText": { "simpleText": age },
            "lengthText": { "simpleText": length },
            "navigationEndpoint": { "commandMetadata": { "webCommandMetadata": {
                "url": format!("/watch?v={id}")
            }}}
        }}}})
    }

    pub fn members_only_video(id: &str) -> Value {
        let mut node = video(id, "1 day ago", "10:00");
        node["richItemRenderer"]["content"]["videoRenderer"]["badges"] = json!([
            { "metadataBadgeRenderer": {
                "style": "BADGE_STYLE_TYPE_MEMBERS_ONLY",
                "label": "Members only"
            }}
        ]);
        node
    }

    pub fn short(id: &str) -> Value {
        json!({ "richItemRenderer": { "content": { "shortsLockupViewModel": {
            "entityId": format!("shorts-shelf-item-{id}"),
            "onTap": { "innertubeCommand": { "reelWatchEndpoint": { "videoId": id } } },
            "overlayMetadata": {
                "primaryText": { "content": format!("Short {id}") },
                "secondaryText": { "content": "10K views" }
            }
        }}}})
    }

    pub fn continuation(token: &str) -> Value {
        json!({ "continuationItemRenderer": { "continuationEndpoint": {
            "continuationCommand": { "token": token, "request": "CONTINUATION_REQUEST_TYPE_BROWSE" }
        }}})
    }

    pub fn rich_grid(nodes: Vec<Value>) -> Value {
        json!({ "richGridRenderer": { "contents": nodes } })
    }

    pub fn continuation_response(nodes: Vec<Value>) -> Value {
        json!({ "onResponseReceivedActions": [{ "appendContinuationItemsAction": {
            "continuationItems": nodes
        }}]})
    }

    /// Channel document with `selected` as the selected tab carrying `content`.
    pub fn channel_page(selected: &str, content: Value) -> Value {
        let tabs: Vec<Value> = [
            ("featured", "Home"),
            ("videos", "Videos"),
            ("streams", "Streams"),
            ("shorts", "Shorts"),
        ]
        .iter()
        .map(|(segment, title)| {
            let mut tab = json!({
                "title": title,
                "selected": *segment == selected,
                "endpoint": { "commandMetadata": { "webCommandMetadata": {
                    "url": format!("/@creator/{segment}")
                }}}
            });
            if *segment == selected {
                tab["content"] = content.clone();
            }
            json!({ "tabRenderer": tab })
        })
        .collect();

        json!({
            "metadata": { "channelMetadataRenderer": {
                "title": "Creator",
                "externalId": CHANNEL_ID,
                "description": "Channel description",
                "vanityChannelUrl": "http://www.youtube.com/@creator",
                "channelUrl": format!("{BASE_URL}/channel/{CHANNEL_ID}")
            }},
            "header": { "pageHeaderRenderer": {
                "pageTitle": "Creator",
                "content": { "pageHeaderViewModel": { "metadata": {
                    "contentMetadataViewModel": { "metadataRows": [
                        { "metadataParts": [{ "text": { "content": "@creator" } }] },
                        { "metadataParts": [
                            { "text": { "content": "1.2M subscribers" } },
                            { "text": { "content": "345 videos" } }
                        ]}
                    ]}
                }}}
            }},
            "contents": { "twoColumnBrowseResultsRenderer": { "tabs": tabs } }
        })
    }

    pub fn page_html(data: &Value) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>Creator</title></head><body>\
             <script nonce=\"x\">var ytInitialData = {data};</script></body></html>"
        )
    }

    /// Tab URL of the fixture channel.
    pub fn tab_url(segment: &str) -> String {
        format!("{BASE_URL}/@creator/{segment}")
    }

    pub fn snapshot(channel_id: &str, items: Vec<ContentItem>) -> ChannelSnapshot {
        ChannelSnapshot {
            channel: ChannelMeta {
                id: channel_id.into(),
                title: format!("Channel {channel_id}"),
                ..ChannelMeta::default()
            },
            fetched_at: Utc::now(),
            sources: Vec::new(),
            videos: items,
        }
    }

    /// `count` plain videos with ids `{prefix}0..`.
    pub fn videos(prefix: &str, count: usize) -> Vec<ContentItem> {
        (0..count)
            .map(|i| ContentItem::new(format!("{prefix}{i}"), format!("Video {i}"), ContentKind::Video))
            .collect()
    }

    pub fn library(collection: &str, snapshots: Vec<ChannelSnapshot>) -> Library {
        let mut library = Library::default();
        for snapshot in snapshots {
            library.upsert_snapshot(collection, snapshot);
        }
        library
    }
}
