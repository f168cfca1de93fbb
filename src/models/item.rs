//! Content item data structures.

use serde::{Deserialize, Serialize};

/// Classification of a catalog entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Video,
    Stream,
    Short,
}

/// Detail backfilled after discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Enrichment {
    /// Exact publish date as reported by the watch page (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,

    /// Full description text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Enrichment {
    /// Neither field has been filled yet.
    pub fn is_empty(&self) -> bool {
        self.publish_date.is_none() && self.description.is_none()
    }
}

/// One normalized video, stream or short.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    /// Platform video id
    pub id: String,

    pub title: String,

    /// Display text such as "12K views"
    #[serde(default)]
    pub view_count_text: String,

    /// Display text such as "3 weeks ago"
    #[serde(default)]
    pub relative_published_time_text: String,

    /// Display text such as "12:34"
    #[serde(default)]
    pub duration_text: String,

    pub kind: ContentKind,

    #[serde(default)]
    pub enrichment: Enrichment,
}

impl ContentItem {
    /// Create an item with empty display texts.
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            view_count_text: String::new(),
            relative_published_time_text: String::new(),
            duration_text: String::new(),
            kind,
            enrichment: Enrichment::default(),
        }
    }

    /// Whether the enrichment scheduler should fetch detail for this item.
    ///
    /// Shorts are never enriched; anything with at least one enrichment
    /// field already present is left alone.
    pub fn needs_enrichment(&self) -> bool {
        self.kind != ContentKind::Short && self.enrichment.is_empty()
    }
}
