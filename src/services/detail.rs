// src/services/detail.rs

//! Watch-page detail parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Enrichment;
use crate::utils::text::json_text;

/// Per-item detail fetched from a watch page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub publish_date: Option<String>,
    pub description: Option<String>,
}

impl ItemDetail {
    pub fn is_empty(&self) -> bool {
        self.publish_date.is_none() && self.description.is_none()
    }

    pub fn into_enrichment(self) -> Enrichment {
        Enrichment {
            publish_date: self.publish_date,
            description: self.description,
        }
    }
}

/// Read detail out of a watch page's player response.
pub fn parse_item_detail(player_response: &Value) -> ItemDetail {
    let microformat = player_response.pointer("/microformat/playerMicroformatRenderer");

    let publish_date = microformat
        .and_then(|m| m.get("publishDate").or_else(|| m.get("uploadDate")))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let description = player_response
        .pointer("/videoDetails/shortDescription")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            microformat
                .and_then(|m| m.get("description"))
                .and_then(json_text)
        });

    ItemDetail {
        publish_date,
        description,
    }
}
