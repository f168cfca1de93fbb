//! Durable store document.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChannelSnapshot, Enrichment};

/// Everything the store persists: named collections of channel snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Library {
    #[serde(default)]
    pub collections: BTreeMap<String, Collection>,
}

impl Library {
    /// Insert a snapshot into a collection, creating the collection if needed.
    pub fn upsert_snapshot(&mut self, collection: &str, snapshot: ChannelSnapshot) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .upsert(snapshot);
    }
}

/// A named group of channel snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Collection {
    #[serde(default)]
    pub channels: Vec<ChannelSnapshot>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Collection {
    /// Replace the channel's previous snapshot, keeping enrichment of items
    /// that are still present.
    pub fn upsert(&mut self, mut snapshot: ChannelSnapshot) {
        let key = snapshot.channel.key();
        let existing = self.channels.iter().position(|c| c.channel.key() == key);

        match existing {
            Some(idx) => {
                let previous: HashMap<&str, &Enrichment> = self.channels[idx]
                    .videos
                    .iter()
                    .filter(|v| !v.enrichment.is_empty())
                    .map(|v| (v.id.as_str(), &v.enrichment))
                    .collect();

                for item in &mut snapshot.videos {
                    if item.enrichment.is_empty() {
                        if let Some(enrichment) = previous.get(item.id.as_str()) {
                            item.enrichment = (*enrichment).clone();
                        }
                    }
                }
                self.channels[idx] = snapshot;
            }
            None => self.channels.push(snapshot),
        }
        self.updated_at = Some(Utc::now());
    }

    pub fn item_count(&self) -> usize {
        self.channels.iter().map(|c| c.videos.len()).sum()
    }

    pub fn pending_enrichment(&self) -> usize {
        self.channels.iter().map(|c| c.pending_enrichment()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelMeta, ContentItem, ContentKind};

    fn snapshot(ids: &[&str]) -> ChannelSnapshot {
        ChannelSnapshot {
            channel: ChannelMeta {
                id: "UC123".into(),
                title: "Creator".into(),
                url: "https://www.youtube.com/@creator".into(),
                ..ChannelMeta::default()
            },
            fetched_at: Utc::now(),
            sources: Vec::new(),
            videos: ids
                .iter()
                .map(|id| ContentItem::new(*id, format!("Video {id}"), ContentKind::Video))
                .collect(),
        }
    }

    #[test]
    fn test_upsert_keeps_enrichment_of_surviving_items() {
        let mut library = Library::default();
        let mut first = snapshot(&["a", "b"]);
        first.videos[0].enrichment.publish_date = Some("2024-01-02".into());
        first.videos[1].enrichment.description = Some("gone soon".into());
        library.upsert_snapshot("music", first);

        library.upsert_snapshot("music", snapshot(&["c", "a"]));

        let collection = &library.collections["music"];
        assert_eq!(collection.channels.len(), 1);
        let videos = &collection.channels[0].videos;
        assert_eq!(videos[0].id, "c");
        assert!(videos[0].enrichment.is_empty());
        assert_eq!(videos[1].enrichment.publish_date.as_deref(), Some("2024-01-02"));
        assert_eq!(collection.pending_enrichment(), 1);
    }

    #[test]
    fn test_upsert_appends_new_channels() {
        let mut collection = Collection::default();
        collection.upsert(snapshot(&["a"]));

        let mut other = snapshot(&["x", "y"]);
        other.channel.id = "UC999".into();
        collection.upsert(other);

        assert_eq!(collection.channels.len(), 2);
        assert_eq!(collection.item_count(), 3);
    }
}
